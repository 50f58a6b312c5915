//! Turns an accepted offer or the buyer's cart into an order.
//!
//! Everything happens inside the caller's transaction: order rows, item
//! rows, stock decrements and clearing the cart either all commit or none
//! do.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Deserialize;
use tracing::{error, info};
use validator::Validate;

use crate::entities::offer::{self, OfferStatus};
use crate::entities::order::{self, PaymentStatus, Status};
use crate::entities::{cart_item, order_item, product};
use crate::error::ApiError;
use crate::money;
use crate::principal::BuyerId;
use crate::services::{accounts, cart, inventory};

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub offer_id: Option<i32>,
    pub quantity: Option<i32>,
    #[validate(length(min = 1, message = "Delivery address must not be empty"))]
    pub delivery_address: Option<String>,
    #[validate(length(min = 1, message = "Payment method must not be empty"))]
    pub payment_method: Option<String>,
}

struct Line {
    product: product::Model,
    quantity: i32,
    price_cents: i64,
}

/// Storage failures during checkout are reported as a failed placement;
/// business errors pass through unchanged.
pub fn placement_failed(err: ApiError) -> ApiError {
    match err {
        ApiError::Storage(detail) => {
            error!(%detail, "Order placement failed");
            ApiError::OrderPlacementFailed
        }
        other => other,
    }
}

async fn offer_line(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    offer_id: i32,
    quantity: Option<i32>,
) -> Result<Line, ApiError> {
    let offer = offer::Entity::find_by_id(offer_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Offer not found".into()))?;

    if offer.buyer_id != buyer.0 {
        return Err(ApiError::Forbidden(
            "You are not authorized to use this offer".into(),
        ));
    }
    if offer.status != OfferStatus::Accepted {
        return Err(ApiError::InvalidState("Invalid or unaccepted offer".into()));
    }
    let used = order::Entity::find()
        .filter(order::Column::OfferId.eq(offer.id))
        .count(txn)
        .await?;
    if used > 0 {
        return Err(ApiError::InvalidState(
            "Offer has already been used for an order".into(),
        ));
    }

    let quantity = quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(ApiError::InvalidQuantity);
    }

    let product = product::Entity::find_by_id(offer.product_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    inventory::ensure_can_fulfil(&product, quantity)?;

    Ok(Line {
        product,
        quantity,
        price_cents: offer.offer_price_cents,
    })
}

async fn cart_lines(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
) -> Result<(i32, Vec<Line>), ApiError> {
    let empty = || ApiError::Validation("Your cart is empty".into());
    let cart = cart::find_cart(txn, buyer).await?.ok_or_else(empty)?;

    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(product::Entity)
        .order_by_asc(cart_item::Column::Id)
        .all(txn)
        .await?;
    if rows.is_empty() {
        return Err(empty());
    }

    // Validate every line before anything is written.
    let mut lines = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let product = product.ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
        inventory::ensure_can_fulfil(&product, item.quantity)?;
        lines.push(Line {
            price_cents: product.price_cents,
            product,
            quantity: item.quantity,
        });
    }
    Ok((cart.id, lines))
}

/// Places an order for `buyer`. With `offer_id` the order holds the offered
/// product at the agreed price; otherwise it holds the whole cart, which is
/// emptied.
pub async fn place_order(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    request: CheckoutRequest,
) -> Result<order::Model, ApiError> {
    let profile = accounts::buyer_profile(txn, buyer).await?;

    let (cart_id, lines) = match request.offer_id {
        Some(offer_id) => (
            None,
            vec![offer_line(txn, buyer, offer_id, request.quantity).await?],
        ),
        None => {
            let (cart_id, lines) = cart_lines(txn, buyer).await?;
            (Some(cart_id), lines)
        }
    };

    let delivery_address = request
        .delivery_address
        .or(profile.default_delivery_address)
        .ok_or_else(|| ApiError::Validation("Delivery address is required".into()))?;
    let payment_method = request
        .payment_method
        .or(profile.preferred_payment_method)
        .ok_or_else(|| ApiError::Validation("Payment method is required".into()))?;

    let mut total_cents = 0i64;
    let mut subtotals = Vec::with_capacity(lines.len());
    for line in &lines {
        let subtotal = money::line_total(line.price_cents, line.quantity)?;
        total_cents = total_cents
            .checked_add(subtotal)
            .ok_or_else(|| ApiError::Validation("Order total is too large".into()))?;
        subtotals.push(subtotal);
    }

    let now = Utc::now();
    let order = order::ActiveModel {
        buyer_id: Set(buyer.0),
        total_amount_cents: Set(total_cents),
        payment_status: Set(PaymentStatus::Pending),
        payment_method: Set(payment_method),
        delivery_address: Set(delivery_address),
        status: Set(Status::Placed),
        offer_id: Set(request.offer_id),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    for (line, subtotal_cents) in lines.iter().zip(subtotals) {
        order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product.id),
            farmer_id: Set(line.product.farmer_id),
            quantity: Set(line.quantity),
            price_cents: Set(line.price_cents),
            subtotal_cents: Set(subtotal_cents),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        inventory::decrement(txn, line.product.id, line.quantity)
            .await
            .map_err(|err| match err {
                ApiError::InsufficientStock(_) => ApiError::InsufficientStock(format!(
                    "Insufficient quantity for product {}",
                    line.product.name
                )),
                other => other,
            })?;
    }

    if let Some(cart_id) = cart_id {
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(txn)
            .await?;
    }

    info!(
        order_id = order.id,
        buyer_id = buyer.0,
        lines = lines.len(),
        total_cents,
        "Order placed"
    );
    Ok(order)
}
