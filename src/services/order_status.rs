//! Order reads and the order status workflow.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use sea_orm::sea_query::JoinType;
use serde::Serialize;
use tracing::info;

use crate::entities::order::{self, PaymentStatus, Status};
use crate::entities::user::Role;
use crate::entities::{order_item, product};
use crate::error::ApiError;
use crate::money;
use crate::principal::Principal;
use crate::services::accounts;

/// Checks that `role` may move an order from `from` to `to`.
///
/// | from       | to         | who    |
/// |------------|------------|--------|
/// | placed     | confirmed  | farmer |
/// | confirmed  | dispatched | farmer |
/// | dispatched | delivered  | farmer |
/// | placed     | cancelled  | buyer  |
/// | confirmed  | cancelled  | buyer  |
pub fn check_transition(role: Role, from: Status, to: Status) -> Result<(), ApiError> {
    match (role, to) {
        (Role::Buyer, Status::Cancelled) => {}
        (Role::Buyer, _) => {
            return Err(ApiError::Forbidden("Buyers can only cancel orders".into()))
        }
        (Role::Farmer, Status::Cancelled | Status::Placed) => {
            return Err(ApiError::Forbidden(format!(
                "Farmers cannot set an order to {to}"
            )))
        }
        (Role::Farmer, _) => {}
    }

    let allowed = matches!(
        (from, to),
        (Status::Placed, Status::Confirmed)
            | (Status::Confirmed, Status::Dispatched)
            | (Status::Dispatched, Status::Delivered)
            | (Status::Placed, Status::Cancelled)
            | (Status::Confirmed, Status::Cancelled)
    );
    if !allowed {
        return Err(ApiError::InvalidTransition(format!(
            "Cannot change order status from {from} to {to}"
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct OrderSummary {
    pub order_id: i32,
    pub buyer_id: i32,
    pub total_amount: Decimal,
    pub status: Status,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub delivery_address: String,
    pub offer_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<order::Model> for OrderSummary {
    fn from(order: order::Model) -> Self {
        OrderSummary {
            order_id: order.id,
            buyer_id: order.buyer_id,
            total_amount: money::from_cents(order.total_amount_cents),
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            delivery_address: order.delivery_address,
            offer_id: order.offer_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderLine {
    pub order_item_id: i32,
    pub product_id: i32,
    pub product_name: Option<String>,
    pub farmer_id: i32,
    pub quantity: i32,
    pub price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: OrderSummary,
    pub items: Vec<OrderLine>,
}

async fn find_order(txn: &DatabaseTransaction, order_id: i32) -> Result<order::Model, ApiError> {
    order::Entity::find_by_id(order_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Order not found".into()))
}

/// Buyers may see their own orders, farmers the orders holding at least
/// one of their items.
async fn authorize(
    txn: &DatabaseTransaction,
    principal: Principal,
    order: &order::Model,
) -> Result<(), ApiError> {
    let allowed = match principal {
        Principal::Buyer(buyer) => order.buyer_id == buyer.0,
        Principal::Farmer(farmer) => {
            order_item::Entity::find()
                .filter(order_item::Column::OrderId.eq(order.id))
                .filter(order_item::Column::FarmerId.eq(farmer.0))
                .count(txn)
                .await?
                > 0
        }
    };
    if !allowed {
        return Err(ApiError::Forbidden(
            "You are not authorized to access this order".into(),
        ));
    }
    Ok(())
}

pub async fn list_orders(
    txn: &DatabaseTransaction,
    principal: Principal,
) -> Result<Vec<OrderSummary>, ApiError> {
    let query = match principal {
        Principal::Buyer(buyer) => {
            accounts::buyer_profile(txn, buyer).await?;
            order::Entity::find().filter(order::Column::BuyerId.eq(buyer.0))
        }
        Principal::Farmer(farmer) => {
            accounts::farmer_profile(txn, farmer).await?;
            order::Entity::find()
                .join(JoinType::InnerJoin, order::Relation::Items.def())
                .filter(order_item::Column::FarmerId.eq(farmer.0))
                .distinct()
        }
    };

    let orders = query
        .order_by_desc(order::Column::CreatedAt)
        .order_by_desc(order::Column::Id)
        .all(txn)
        .await?;
    Ok(orders.into_iter().map(OrderSummary::from).collect())
}

pub async fn order_detail(
    txn: &DatabaseTransaction,
    principal: Principal,
    order_id: i32,
) -> Result<OrderDetail, ApiError> {
    let order = find_order(txn, order_id).await?;
    authorize(txn, principal, &order).await?;

    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order.id))
        .find_also_related(product::Entity)
        .order_by_asc(order_item::Column::Id)
        .all(txn)
        .await?;

    let items = rows
        .into_iter()
        .map(|(item, product)| OrderLine {
            order_item_id: item.id,
            product_id: item.product_id,
            product_name: product.map(|product| product.name),
            farmer_id: item.farmer_id,
            quantity: item.quantity,
            price: money::from_cents(item.price_cents),
            subtotal: money::from_cents(item.subtotal_cents),
        })
        .collect();

    Ok(OrderDetail {
        order: order.into(),
        items,
    })
}

/// Moves an order to `status`. Only `status` and `updated_at` change;
/// cancelling does not put stock back.
pub async fn update_status(
    txn: &DatabaseTransaction,
    principal: Principal,
    order_id: i32,
    status: &str,
) -> Result<order::Model, ApiError> {
    let order = find_order(txn, order_id).await?;
    authorize(txn, principal, &order).await?;

    let target: Status = status.parse().map_err(ApiError::InvalidTransition)?;
    check_transition(principal.role(), order.status, target)?;

    let from = order.status;
    let mut order: order::ActiveModel = order.into();
    order.status = Set(target);
    order.updated_at = Set(Utc::now());
    let order = order.update(txn).await?;

    info!(
        order_id = order.id,
        user_id = principal.user_id(),
        %from,
        to = %target,
        "Order status changed"
    );
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::checkout::{place_order, CheckoutRequest};
    use crate::services::{cart, testing};
    use sea_orm::TransactionTrait;

    #[test]
    fn farmers_walk_the_fulfilment_path() {
        assert!(check_transition(Role::Farmer, Status::Placed, Status::Confirmed).is_ok());
        assert!(check_transition(Role::Farmer, Status::Confirmed, Status::Dispatched).is_ok());
        assert!(check_transition(Role::Farmer, Status::Dispatched, Status::Delivered).is_ok());
        assert!(matches!(
            check_transition(Role::Farmer, Status::Placed, Status::Delivered),
            Err(ApiError::InvalidTransition(_))
        ));
    }

    #[test]
    fn delivered_orders_cannot_go_back() {
        assert!(matches!(
            check_transition(Role::Farmer, Status::Delivered, Status::Confirmed),
            Err(ApiError::InvalidTransition(_))
        ));
    }

    #[test]
    fn each_role_keeps_to_its_own_targets() {
        assert!(matches!(
            check_transition(Role::Buyer, Status::Placed, Status::Confirmed),
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            check_transition(Role::Farmer, Status::Placed, Status::Cancelled),
            Err(ApiError::Forbidden(_))
        ));
        assert!(check_transition(Role::Buyer, Status::Confirmed, Status::Cancelled).is_ok());
        assert!(matches!(
            check_transition(Role::Buyer, Status::Dispatched, Status::Cancelled),
            Err(ApiError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn status_changes_are_scoped_to_the_parties_of_the_order() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let stranger = testing::farmer(&db, "stranger").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let product = testing::product(&db, farmer, "Squash", 275, 6).await;

        let txn = db.begin().await.unwrap();
        cart::add_item(&txn, buyer, product.id, 2).await.unwrap();
        let order = place_order(&txn, buyer, CheckoutRequest::default())
            .await
            .unwrap();

        assert!(matches!(
            update_status(&txn, Principal::Farmer(stranger), order.id, "confirmed").await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            update_status(&txn, Principal::Farmer(farmer), order.id, "shipped").await,
            Err(ApiError::InvalidTransition(_))
        ));

        for status in ["confirmed", "dispatched", "delivered"] {
            let updated = update_status(&txn, Principal::Farmer(farmer), order.id, status)
                .await
                .unwrap();
            assert_eq!(updated.status.to_string(), status);
        }

        assert!(matches!(
            update_status(&txn, Principal::Farmer(farmer), order.id, "confirmed").await,
            Err(ApiError::InvalidTransition(_))
        ));
        let detail = order_detail(&txn, Principal::Buyer(buyer), order.id)
            .await
            .unwrap();
        assert_eq!(detail.order.status, Status::Delivered);
        assert_eq!(detail.items.len(), 1);
        assert_eq!(detail.items[0].product_name.as_deref(), Some("Squash"));
    }

    #[tokio::test]
    async fn cancelling_does_not_restock() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let product = testing::product(&db, farmer, "Melon", 450, 3).await;

        let txn = db.begin().await.unwrap();
        cart::add_item(&txn, buyer, product.id, 2).await.unwrap();
        let order = place_order(&txn, buyer, CheckoutRequest::default())
            .await
            .unwrap();
        let cancelled = update_status(&txn, Principal::Buyer(buyer), order.id, "cancelled")
            .await
            .unwrap();
        txn.commit().await.unwrap();

        assert_eq!(cancelled.status, Status::Cancelled);
        assert_eq!(testing::reload(&db, product.id).await.quantity_available, 1);
    }

    #[tokio::test]
    async fn farmers_list_only_orders_holding_their_items() {
        let db = testing::database().await;
        let farmer = testing::farmer(&db, "grower").await;
        let other = testing::farmer(&db, "rival").await;
        let buyer = testing::buyer(&db, "shopper").await;
        let corn = testing::product(&db, farmer, "Corn", 120, 10).await;
        let rye = testing::product(&db, farmer, "Rye", 220, 10).await;

        let txn = db.begin().await.unwrap();
        cart::add_item(&txn, buyer, corn.id, 1).await.unwrap();
        cart::add_item(&txn, buyer, rye.id, 1).await.unwrap();
        let order = place_order(&txn, buyer, CheckoutRequest::default())
            .await
            .unwrap();

        let mine = list_orders(&txn, Principal::Farmer(farmer)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].order_id, order.id);
        assert!(list_orders(&txn, Principal::Farmer(other))
            .await
            .unwrap()
            .is_empty());
        assert!(matches!(
            order_detail(&txn, Principal::Farmer(other), order.id).await,
            Err(ApiError::Forbidden(_))
        ));
    }
}
