//! Direct messages between users.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{message, user};
use crate::error::ApiError;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewMessage {
    pub recipient_id: i32,
    #[validate(length(min = 1, max = 5000, message = "Message text must not be empty"))]
    pub message_text: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Counterpart {
    pub user_id: i32,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub profile_picture_url: Option<String>,
}

impl From<user::Model> for Counterpart {
    fn from(user: user::Model) -> Self {
        Counterpart {
            user_id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            profile_picture_url: user.profile_picture_url,
        }
    }
}

async fn find_user(txn: &DatabaseTransaction, user_id: i32) -> Result<user::Model, ApiError> {
    user::Entity::find_by_id(user_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

pub async fn send(
    txn: &DatabaseTransaction,
    sender_id: i32,
    new_message: NewMessage,
) -> Result<message::Model, ApiError> {
    if new_message.message_text.trim().is_empty() {
        return Err(ApiError::Validation("Message text must not be empty".into()));
    }
    if new_message.recipient_id == sender_id {
        return Err(ApiError::Validation("You cannot message yourself".into()));
    }
    user::Entity::find_by_id(new_message.recipient_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Recipient not found".into()))?;

    let message = message::ActiveModel {
        sender_id: Set(sender_id),
        recipient_id: Set(new_message.recipient_id),
        message_text: Set(new_message.message_text),
        sent_at: Set(Utc::now()),
        seen_at: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(message)
}

/// Everyone `user_id` has exchanged messages with, most recent first.
pub async fn conversations(
    txn: &DatabaseTransaction,
    user_id: i32,
) -> Result<Vec<Counterpart>, ApiError> {
    let messages = message::Entity::find()
        .filter(
            Condition::any()
                .add(message::Column::SenderId.eq(user_id))
                .add(message::Column::RecipientId.eq(user_id)),
        )
        .order_by_desc(message::Column::SentAt)
        .order_by_desc(message::Column::Id)
        .all(txn)
        .await?;

    let mut order = Vec::new();
    for message in messages {
        let other = if message.sender_id == user_id {
            message.recipient_id
        } else {
            message.sender_id
        };
        if !order.contains(&other) {
            order.push(other);
        }
    }

    if order.is_empty() {
        return Ok(Vec::new());
    }
    let mut users: HashMap<i32, user::Model> = user::Entity::find()
        .filter(user::Column::Id.is_in(order.clone()))
        .all(txn)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect();

    Ok(order
        .into_iter()
        .filter_map(|id| users.remove(&id))
        .map(Counterpart::from)
        .collect())
}

/// The messages between two users in the order they were sent. Messages
/// sent to `user_id` are marked seen.
pub async fn thread(
    txn: &DatabaseTransaction,
    user_id: i32,
    other_user_id: i32,
) -> Result<Vec<message::Model>, ApiError> {
    find_user(txn, other_user_id).await?;

    message::Entity::update_many()
        .col_expr(message::Column::SeenAt, Expr::value(Utc::now()))
        .filter(message::Column::SenderId.eq(other_user_id))
        .filter(message::Column::RecipientId.eq(user_id))
        .filter(message::Column::SeenAt.is_null())
        .exec(txn)
        .await?;

    Ok(message::Entity::find()
        .filter(
            Condition::any()
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(user_id))
                        .add(message::Column::RecipientId.eq(other_user_id)),
                )
                .add(
                    Condition::all()
                        .add(message::Column::SenderId.eq(other_user_id))
                        .add(message::Column::RecipientId.eq(user_id)),
                ),
        )
        .order_by_asc(message::Column::SentAt)
        .order_by_asc(message::Column::Id)
        .all(txn)
        .await?)
}
