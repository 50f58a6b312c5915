use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "offers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub product_id: i32,
    #[sea_orm(indexed)]
    pub buyer_id: i32,
    pub offer_price_cents: i64,
    pub status: OfferStatus,
    pub last_actor: Party,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::product::Entity",
        from = "Column::ProductId",
        to = "crate::entities::product::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Product,
    #[sea_orm(
        belongs_to = "crate::entities::buyer::Entity",
        from = "Column::BuyerId",
        to = "crate::entities::buyer::Column::UserId",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Buyer,
}

impl Related<crate::entities::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<crate::entities::buyer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "offer_status_enum",
    db_type = "String(StringLen::N(20))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum OfferStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "accepted")]
    Accepted,
    #[sea_orm(string_value = "rejected")]
    Rejected,
    #[sea_orm(string_value = "countered")]
    Countered,
}

impl OfferStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::Rejected)
    }
}

impl fmt::Display for OfferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Countered => "countered",
        };
        f.write_str(value)
    }
}

/// Which side of the negotiation moved last.
#[derive(
    Clone, Copy, PartialEq, Eq, Debug, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "party_enum",
    db_type = "String(StringLen::N(20))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    #[sea_orm(string_value = "buyer")]
    Buyer,
    #[sea_orm(string_value = "farmer")]
    Farmer,
}
