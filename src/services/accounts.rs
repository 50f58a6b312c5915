//! Registration, login and profiles.

use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{buyer, farmer, user, user::Role};
use crate::error::ApiError;
use crate::principal::{BuyerId, FarmerId, Principal};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Missing required field: first_name"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Missing required field: last_name"))]
    pub last_name: String,
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FarmDetails {
    #[validate(length(min = 1, message = "Missing required field: farm_name"))]
    pub farm_name: String,
    #[validate(range(min = 0.0))]
    pub farm_size: Option<f64>,
    pub farm_address: Option<String>,
    pub farm_description: Option<String>,
    pub crops_grown: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct DeliveryPreferences {
    #[validate(length(min = 1))]
    pub default_delivery_address: Option<String>,
    #[validate(length(min = 1))]
    pub preferred_payment_method: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileChanges {
    #[validate(length(min = 1, max = 50))]
    pub username: Option<String>,
    #[validate(length(min = 1))]
    pub first_name: Option<String>,
    #[validate(length(min = 1))]
    pub last_name: Option<String>,
    #[validate(length(max = 20))]
    pub phone_number: Option<String>,
    #[validate(url)]
    pub profile_picture_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct FarmChanges {
    #[validate(length(min = 1))]
    pub farm_name: Option<String>,
    #[validate(range(min = 0.0))]
    pub farm_size: Option<f64>,
    pub farm_address: Option<String>,
    pub farm_description: Option<String>,
    pub crops_grown: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub user_id: i32,
    pub email: String,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub profile_picture_url: Option<String>,
    pub role: Role,
}

impl From<user::Model> for PublicUser {
    fn from(value: user::Model) -> Self {
        PublicUser {
            user_id: value.id,
            email: value.email,
            username: value.username,
            first_name: value.first_name,
            last_name: value.last_name,
            phone_number: value.phone_number,
            profile_picture_url: value.profile_picture_url,
            role: value.role,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RoleProfile {
    Farmer(farmer::Model),
    Buyer(buyer::Model),
}

#[derive(Debug, Serialize)]
pub struct Profile {
    pub user: PublicUser,
    #[serde(flatten)]
    pub details: Option<RoleProfile>,
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApiError::Storage(format!("Failed to hash password: {err}")))
}

async fn ensure_unique(
    txn: &DatabaseTransaction,
    email: Option<&str>,
    username: Option<&str>,
    except: Option<i32>,
) -> Result<(), ApiError> {
    if let Some(email) = email {
        let mut query = user::Entity::find().filter(user::Column::Email.eq(email));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(txn).await?.is_some() {
            return Err(ApiError::Conflict("Email is already registered".into()));
        }
    }
    if let Some(username) = username {
        let mut query = user::Entity::find().filter(user::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(user::Column::Id.ne(id));
        }
        if query.one(txn).await?.is_some() {
            return Err(ApiError::Conflict("Username is already taken".into()));
        }
    }
    Ok(())
}

async fn insert_user(
    txn: &DatabaseTransaction,
    new_user: NewUser,
    role: Role,
) -> Result<user::Model, ApiError> {
    ensure_unique(
        txn,
        Some(&new_user.email),
        new_user.username.as_deref(),
        None,
    )
    .await?;

    let user = user::ActiveModel {
        email: Set(new_user.email),
        username: Set(new_user.username),
        password_hash: Set(hash_password(&new_user.password)?),
        first_name: Set(new_user.first_name),
        last_name: Set(new_user.last_name),
        phone_number: Set(new_user.phone_number),
        profile_picture_url: Set(None),
        role: Set(role),
        date_joined: Set(Utc::now()),
        is_active: Set(true),
        is_verified: Set(false),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(user)
}

pub async fn register_farmer(
    txn: &DatabaseTransaction,
    new_user: NewUser,
    farm: FarmDetails,
) -> Result<user::Model, ApiError> {
    let user = insert_user(txn, new_user, Role::Farmer).await?;
    farmer::ActiveModel {
        user_id: Set(user.id),
        farm_name: Set(farm.farm_name),
        farm_size: Set(farm.farm_size),
        farm_address: Set(farm.farm_address),
        farm_description: Set(farm.farm_description),
        crops_grown: Set(farm.crops_grown),
    }
    .insert(txn)
    .await?;
    Ok(user)
}

pub async fn register_buyer(
    txn: &DatabaseTransaction,
    new_user: NewUser,
    preferences: DeliveryPreferences,
) -> Result<user::Model, ApiError> {
    let user = insert_user(txn, new_user, Role::Buyer).await?;
    buyer::ActiveModel {
        user_id: Set(user.id),
        default_delivery_address: Set(preferences.default_delivery_address),
        preferred_payment_method: Set(preferences.preferred_payment_method),
    }
    .insert(txn)
    .await?;
    Ok(user)
}

/// Looks the user up by email or username and checks the password.
pub async fn login(
    txn: &DatabaseTransaction,
    email_or_username: &str,
    password: &str,
) -> Result<user::Model, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());

    let user = user::Entity::find()
        .filter(
            Condition::any()
                .add(user::Column::Email.eq(email_or_username))
                .add(user::Column::Username.eq(email_or_username)),
        )
        .one(txn)
        .await?
        .ok_or_else(invalid)?;

    user.check_hash(password).map_err(|_| invalid())?;

    if !user.is_active {
        return Err(ApiError::Forbidden("Account is inactive".into()));
    }
    Ok(user)
}

pub async fn buyer_profile(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
) -> Result<buyer::Model, ApiError> {
    buyer::Entity::find_by_id(buyer.0)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Buyer profile not found".into()))
}

pub async fn farmer_profile(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
) -> Result<farmer::Model, ApiError> {
    farmer::Entity::find_by_id(farmer.0)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Farmer profile not found".into()))
}

async fn find_user(txn: &DatabaseTransaction, user_id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(user_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub async fn profile(txn: &DatabaseTransaction, principal: Principal) -> Result<Profile, ApiError> {
    let user = find_user(txn, principal.user_id()).await?;
    let details = match principal {
        Principal::Farmer(id) => farmer::Entity::find_by_id(id.0)
            .one(txn)
            .await?
            .map(RoleProfile::Farmer),
        Principal::Buyer(id) => buyer::Entity::find_by_id(id.0)
            .one(txn)
            .await?
            .map(RoleProfile::Buyer),
    };
    Ok(Profile {
        user: user.into(),
        details,
    })
}

pub async fn update_profile(
    txn: &DatabaseTransaction,
    principal: Principal,
    changes: ProfileChanges,
) -> Result<user::Model, ApiError> {
    let user = find_user(txn, principal.user_id()).await?;
    ensure_unique(txn, None, changes.username.as_deref(), Some(user.id)).await?;

    let mut user: user::ActiveModel = user.into();
    if let Some(username) = changes.username {
        user.username = Set(Some(username));
    }
    if let Some(first_name) = changes.first_name {
        user.first_name = Set(first_name);
    }
    if let Some(last_name) = changes.last_name {
        user.last_name = Set(last_name);
    }
    if let Some(phone_number) = changes.phone_number {
        user.phone_number = Set(Some(phone_number));
    }
    if let Some(url) = changes.profile_picture_url {
        user.profile_picture_url = Set(Some(url));
    }
    Ok(user.update(txn).await?)
}

pub async fn update_farm(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    changes: FarmChanges,
) -> Result<farmer::Model, ApiError> {
    let mut profile: farmer::ActiveModel = farmer_profile(txn, farmer).await?.into();
    if let Some(farm_name) = changes.farm_name {
        profile.farm_name = Set(farm_name);
    }
    if let Some(farm_size) = changes.farm_size {
        profile.farm_size = Set(Some(farm_size));
    }
    if let Some(farm_address) = changes.farm_address {
        profile.farm_address = Set(Some(farm_address));
    }
    if let Some(description) = changes.farm_description {
        profile.farm_description = Set(Some(description));
    }
    if let Some(crops) = changes.crops_grown {
        profile.crops_grown = Set(Some(crops));
    }
    Ok(profile.update(txn).await?)
}

pub async fn update_delivery_preferences(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    changes: DeliveryPreferences,
) -> Result<buyer::Model, ApiError> {
    let mut profile: buyer::ActiveModel = buyer_profile(txn, buyer).await?.into();
    if let Some(address) = changes.default_delivery_address {
        profile.default_delivery_address = Set(Some(address));
    }
    if let Some(method) = changes.preferred_payment_method {
        profile.preferred_payment_method = Set(Some(method));
    }
    Ok(profile.update(txn).await?)
}
