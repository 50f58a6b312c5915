//! Fixtures for service tests: an in-memory database and a few rows.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::path::Path;

use crate::entities::{buyer, farmer, product, setup_schema, user, user::Role};
use crate::principal::{BuyerId, FarmerId};

pub async fn database() -> DatabaseConnection {
    let db = crate::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");
    setup_schema(&db).await.expect("Failed to create schema");
    db
}

/// A database file under `dir` behind a pool of `max_connections`, for
/// tests where transactions really run side by side.
pub async fn file_database(dir: &Path, max_connections: u32) -> DatabaseConnection {
    let url = format!("sqlite://{}?mode=rwc", dir.join("market.db").display());
    let db = crate::connect(&url, max_connections)
        .await
        .expect("Failed to open database file");
    setup_schema(&db).await.expect("Failed to create schema");
    db
}

async fn user(db: &DatabaseConnection, name: &str, role: Role) -> user::Model {
    user::ActiveModel {
        email: Set(format!("{name}@market.test")),
        username: Set(Some(name.to_owned())),
        password_hash: Set("not-a-hash".to_owned()),
        first_name: Set(name.to_owned()),
        last_name: Set("Tester".to_owned()),
        phone_number: Set(None),
        profile_picture_url: Set(None),
        role: Set(role),
        date_joined: Set(Utc::now()),
        is_active: Set(true),
        is_verified: Set(false),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn farmer(db: &DatabaseConnection, name: &str) -> FarmerId {
    let user = user(db, name, Role::Farmer).await;
    farmer::ActiveModel {
        user_id: Set(user.id),
        farm_name: Set(format!("{name}'s farm")),
        farm_size: Set(None),
        farm_address: Set(None),
        farm_description: Set(None),
        crops_grown: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to insert farmer profile");
    FarmerId(user.id)
}

pub async fn buyer(db: &DatabaseConnection, name: &str) -> BuyerId {
    let user = user(db, name, Role::Buyer).await;
    buyer::ActiveModel {
        user_id: Set(user.id),
        default_delivery_address: Set(Some("1 Market Street".to_owned())),
        preferred_payment_method: Set(Some("cash".to_owned())),
    }
    .insert(db)
    .await
    .expect("Failed to insert buyer profile");
    BuyerId(user.id)
}

pub async fn product(
    db: &DatabaseConnection,
    farmer: FarmerId,
    name: &str,
    price_cents: i64,
    quantity: i32,
) -> product::Model {
    product::ActiveModel {
        farmer_id: Set(farmer.0),
        name: Set(name.to_owned()),
        category_id: Set(None),
        description: Set(None),
        price_cents: Set(price_cents),
        quantity_available: Set(quantity),
        quantity_unit: Set("kg".to_owned()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to insert product")
}

pub fn product_model(quantity: i32, is_active: bool) -> product::Model {
    product::Model {
        id: 1,
        farmer_id: 1,
        name: "Carrots".to_owned(),
        category_id: None,
        description: None,
        price_cents: 300,
        quantity_available: quantity,
        quantity_unit: "kg".to_owned(),
        is_active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn reload(db: &DatabaseConnection, product_id: i32) -> product::Model {
    product::Entity::find_by_id(product_id)
        .one(db)
        .await
        .expect("Failed to load product")
        .expect("Product disappeared")
}

pub async fn set_stock(db: &DatabaseConnection, product_id: i32, quantity: i32, is_active: bool) {
    let mut product: product::ActiveModel = reload(db, product_id).await.into();
    product.quantity_available = Set(quantity);
    product.is_active = Set(is_active);
    product.update(db).await.expect("Failed to update product");
}
