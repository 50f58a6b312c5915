use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set, Unchanged};
use serde::Serialize;

use crate::entities::category::Entity as Category;
use crate::entities::farmer::Entity as Farmer;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub farmer_id: i32,
    pub name: String,
    #[sea_orm(nullable)]
    pub category_id: Option<i32>,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Unit price in cents.
    pub price_cents: i64,
    pub quantity_available: i32,
    pub quantity_unit: String,
    pub is_active: bool,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Farmer",
        from = "crate::entities::product::Column::FarmerId",
        to = "crate::entities::farmer::Column::UserId",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Farmer,
    #[sea_orm(
        belongs_to = "Category",
        from = "crate::entities::product::Column::CategoryId",
        to = "crate::entities::category::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Category,
    #[sea_orm(has_many = "crate::entities::product_image::Entity")]
    Images,
}

impl Related<crate::entities::farmer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Farmer.def()
    }
}

impl Related<crate::entities::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<crate::entities::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

// Every save through an ActiveModel re-applies the ledger rule:
// quantity never negative, zero stock is never active.
#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let quantity = match self.quantity_available {
            Set(quantity) | Unchanged(quantity) => Some(quantity),
            NotSet => None,
        };

        if let Some(quantity) = quantity {
            if quantity < 0 {
                return Err(DbErr::Custom(
                    "quantity_available must not be negative".to_owned(),
                ));
            }
            if quantity == 0 {
                self.is_active = Set(false);
            }
        }

        let now = chrono::Utc::now();
        if insert {
            self.created_at = Set(now);
        }
        self.updated_at = Set(now);

        Ok(self)
    }
}
