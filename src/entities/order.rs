use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub buyer_id: i32,
    pub total_amount_cents: i64,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub delivery_address: String,
    pub status: Status,
    #[sea_orm(unique, nullable)]
    pub offer_id: Option<i32>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::buyer::Entity",
        from = "Column::BuyerId",
        to = "crate::entities::buyer::Column::UserId"
    )]
    Buyer,
    #[sea_orm(
        belongs_to = "crate::entities::offer::Entity",
        from = "Column::OfferId",
        to = "crate::entities::offer::Column::Id"
    )]
    Offer,
    #[sea_orm(has_many = "crate::entities::order_item::Entity")]
    Items,
}

impl Related<crate::entities::buyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl Related<crate::entities::offer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Offer.def()
    }
}

impl Related<crate::entities::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "order_status_enum",
    db_type = "String(StringLen::N(20))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[sea_orm(string_value = "placed")]
    Placed,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "dispatched")]
    Dispatched,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "placed" => Ok(Self::Placed),
            "confirmed" => Ok(Self::Confirmed),
            "dispatched" => Ok(Self::Dispatched),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid status: {}", s)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Placed => "placed",
            Self::Confirmed => "confirmed",
            Self::Dispatched => "dispatched",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(value)
    }
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "payment_status_enum",
    db_type = "String(StringLen::N(20))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}
