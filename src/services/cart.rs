//! The cart aggregator: one cart per buyer, one line per product.
//!
//! Nothing here touches inventory; stock is re-checked at checkout.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::Serialize;

use crate::entities::{cart, cart_item, product};
use crate::error::ApiError;
use crate::money;
use crate::principal::BuyerId;
use crate::services::accounts;

#[derive(Debug, Serialize)]
pub struct CartLine {
    pub cart_item_id: i32,
    pub product_id: i32,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub quantity_unit: String,
    pub subtotal: Decimal,
    pub farmer_id: i32,
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<i32>,
    pub items: Vec<CartLine>,
    pub total: Decimal,
}

pub async fn find_cart(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
) -> Result<Option<cart::Model>, ApiError> {
    Ok(cart::Entity::find()
        .filter(cart::Column::BuyerId.eq(buyer.0))
        .one(txn)
        .await?)
}

async fn get_or_create_cart(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
) -> Result<cart::Model, ApiError> {
    if let Some(cart) = find_cart(txn, buyer).await? {
        return Ok(cart);
    }
    let cart = cart::ActiveModel {
        buyer_id: Set(buyer.0),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    Ok(cart)
}

/// Adds `quantity` of a product, merging into an existing line.
///
/// Only the added quantity is checked against stock; the merged total is
/// checked when the cart is checked out.
pub async fn add_item(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    product_id: i32,
    quantity: i32,
) -> Result<cart_item::Model, ApiError> {
    accounts::buyer_profile(txn, buyer).await?;

    let product = product::Entity::find_by_id(product_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No product with {product_id} id was found")))?;

    if !product.is_active {
        return Err(ApiError::Unavailable(format!(
            "Product {} is not available",
            product.name
        )));
    }
    if quantity <= 0 {
        return Err(ApiError::InvalidQuantity);
    }
    if quantity > product.quantity_available {
        return Err(ApiError::InsufficientStock(
            "Insufficient product quantity available".into(),
        ));
    }

    let cart = get_or_create_cart(txn, buyer).await?;

    let existing = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .filter(cart_item::Column::ProductId.eq(product_id))
        .one(txn)
        .await?;

    let item = match existing {
        Some(entry) => {
            let total = entry
                .quantity
                .checked_add(quantity)
                .ok_or(ApiError::InvalidQuantity)?;
            let mut entry: cart_item::ActiveModel = entry.into();
            entry.quantity = Set(total);
            entry.update(txn).await?
        }
        None => {
            cart_item::ActiveModel {
                cart_id: Set(cart.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                added_at: Set(Utc::now()),
                ..Default::default()
            }
            .insert(txn)
            .await?
        }
    };

    Ok(item)
}

async fn find_item(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    item_id: i32,
) -> Result<cart_item::Model, ApiError> {
    let not_found = || ApiError::NotFound("Cart item not found".into());
    let cart = find_cart(txn, buyer).await?.ok_or_else(not_found)?;

    cart_item::Entity::find_by_id(item_id)
        .filter(cart_item::Column::CartId.eq(cart.id))
        .one(txn)
        .await?
        .ok_or_else(not_found)
}

/// Overwrites the quantity of one of the buyer's lines.
pub async fn update_item(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    item_id: i32,
    quantity: i32,
) -> Result<cart_item::Model, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::InvalidQuantity);
    }

    let item = find_item(txn, buyer, item_id).await?;
    let product = item
        .find_related(product::Entity)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;

    if product.quantity_available < quantity {
        return Err(ApiError::InsufficientStock(
            "Insufficient product quantity available".into(),
        ));
    }

    let mut item: cart_item::ActiveModel = item.into();
    item.quantity = Set(quantity);
    Ok(item.update(txn).await?)
}

/// Removes one of the buyer's lines. Removing a line that is not in the
/// buyer's cart is a `NotFound`, also when it was removed before.
pub async fn remove_item(
    txn: &DatabaseTransaction,
    buyer: BuyerId,
    item_id: i32,
) -> Result<(), ApiError> {
    let item = find_item(txn, buyer, item_id).await?;
    item.delete(txn).await?;
    Ok(())
}

/// Read-only snapshot of the cart with per-line subtotals.
pub async fn view(txn: &DatabaseTransaction, buyer: BuyerId) -> Result<CartView, ApiError> {
    accounts::buyer_profile(txn, buyer).await?;

    let Some(cart) = find_cart(txn, buyer).await? else {
        return Ok(CartView {
            cart_id: None,
            items: Vec::new(),
            total: Decimal::ZERO,
        });
    };

    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart.id))
        .find_also_related(product::Entity)
        .order_by_asc(cart_item::Column::Id)
        .all(txn)
        .await?;

    let mut items = Vec::with_capacity(rows.len());
    let mut total_cents = 0i64;
    for (item, product) in rows {
        let Some(product) = product else { continue };
        let subtotal_cents = money::line_total(product.price_cents, item.quantity)?;
        total_cents = total_cents.saturating_add(subtotal_cents);
        items.push(CartLine {
            cart_item_id: item.id,
            product_id: product.id,
            product_name: product.name,
            price: money::from_cents(product.price_cents),
            quantity: item.quantity,
            quantity_unit: product.quantity_unit,
            subtotal: money::from_cents(subtotal_cents),
            farmer_id: product.farmer_id,
            is_active: product.is_active,
        });
    }

    Ok(CartView {
        cart_id: Some(cart.id),
        items,
        total: money::from_cents(total_cents),
    })
}
