use argon2::{password_hash::PasswordVerifier, Argon2, PasswordHash};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub email: String,
    #[sea_orm(unique, nullable)]
    pub username: Option<String>,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(nullable)]
    pub phone_number: Option<String>,
    #[sea_orm(nullable)]
    pub profile_picture_url: Option<String>,
    pub role: Role,
    pub date_joined: DateTimeUtc,
    pub is_active: bool,
    pub is_verified: bool,
}

impl Model {
    pub fn check_hash(&self, password: &str) -> Result<(), String> {
        let parsed_hash = PasswordHash::new(&self.password_hash).map_err(|e| e.to_string())?;

        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| "Password verification failed".to_string())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Clone, Copy, PartialEq, Eq, Hash, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "role_enum",
    db_type = "String(StringLen::N(20))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "buyer")]
    Buyer,
    #[sea_orm(string_value = "farmer")]
    Farmer,
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "farmer" => Ok(Self::Farmer),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Farmer => write!(f, "farmer"),
        }
    }
}
