//! The inventory ledger: `quantity_available` and `is_active` on products.
//!
//! Checkout is the only caller of [`decrement`].

use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::product;
use crate::error::ApiError;

/// Checks a product can cover `quantity`. Stock is checked before the
/// active flag, so a product sold out by a concurrent checkout reports
/// insufficient stock.
pub fn ensure_can_fulfil(product: &product::Model, quantity: i32) -> Result<(), ApiError> {
    if product.quantity_available < quantity {
        return Err(ApiError::InsufficientStock(format!(
            "Insufficient quantity for product {}",
            product.name
        )));
    }
    if !product.is_active {
        return Err(ApiError::Unavailable(format!(
            "Product {} is no longer available",
            product.name
        )));
    }
    Ok(())
}

/// Takes `quantity` units off a product with a single conditional update,
/// then deactivates it if it ran out.
///
/// The update only matches while enough stock is left, so two checkouts
/// racing for the last units cannot both succeed.
pub async fn decrement<C>(db: &C, product_id: i32, quantity: i32) -> Result<(), ApiError>
where
    C: ConnectionTrait,
{
    let result = product::Entity::update_many()
        .col_expr(
            product::Column::QuantityAvailable,
            Expr::col(product::Column::QuantityAvailable).sub(quantity),
        )
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::IsActive.eq(true))
        .filter(product::Column::QuantityAvailable.gte(quantity))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(ApiError::InsufficientStock(format!(
            "Insufficient quantity for product {product_id}"
        )));
    }

    product::Entity::update_many()
        .col_expr(product::Column::IsActive, Expr::value(false))
        .filter(product::Column::Id.eq(product_id))
        .filter(product::Column::QuantityAvailable.eq(0))
        .exec(db)
        .await?;

    Ok(())
}
