use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(indexed)]
    pub sender_id: i32,
    #[sea_orm(indexed)]
    pub recipient_id: i32,
    #[sea_orm(column_type = "Text")]
    pub message_text: String,
    pub sent_at: DateTimeUtc,
    #[sea_orm(nullable)]
    pub seen_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "crate::entities::user::Entity",
        from = "Column::SenderId",
        to = "crate::entities::user::Column::Id",
        on_delete = "Cascade"
    )]
    Sender,
    #[sea_orm(
        belongs_to = "crate::entities::user::Entity",
        from = "Column::RecipientId",
        to = "crate::entities::user::Column::Id",
        on_delete = "Cascade"
    )]
    Recipient,
}

impl ActiveModelBehavior for ActiveModel {}
