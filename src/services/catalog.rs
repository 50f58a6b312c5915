//! Products, their images and categories.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, LoaderTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::entities::{
    cart_item, category, offer, order_item, product, product_image, user,
};
use crate::error::ApiError;
use crate::money;
use crate::principal::FarmerId;
use crate::services::accounts;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 100, message = "Product name must not be empty"))]
    pub name: String,
    pub category_id: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity_available: i32,
    #[validate(length(min = 1, max = 20, message = "Quantity unit must not be empty"))]
    pub quantity_unit: String,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductChanges {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub category_id: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub category_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity_available: Option<i32>,
    #[validate(length(min = 1, max = 20))]
    pub quantity_unit: Option<String>,
    pub is_active: Option<bool>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity_available: i32,
    pub quantity_unit: String,
    pub is_active: bool,
    pub farmer_id: i32,
    pub farmer_name: Option<String>,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

async fn find_or_create_category(
    txn: &DatabaseTransaction,
    name: &str,
) -> Result<category::Model, ApiError> {
    if let Some(found) = category::Entity::find()
        .filter(category::Column::Name.eq(name))
        .one(txn)
        .await?
    {
        return Ok(found);
    }
    let created = category::ActiveModel {
        name: Set(name.to_owned()),
        description: Set(None),
        ..Default::default()
    }
    .insert(txn)
    .await?;
    info!(category_id = created.id, name, "Category created");
    Ok(created)
}

/// Picks the category by id, falling back to (or creating) one by name.
pub async fn resolve_category(
    txn: &DatabaseTransaction,
    category_id: Option<i32>,
    category_name: Option<&str>,
) -> Result<Option<i32>, ApiError> {
    if let Some(id) = category_id {
        if let Some(found) = category::Entity::find_by_id(id).one(txn).await? {
            return Ok(Some(found.id));
        }
        return match category_name {
            Some(name) => Ok(Some(find_or_create_category(txn, name).await?.id)),
            None => Err(ApiError::Validation(format!(
                "Category with id {id} does not exist. Provide a valid category_id or category_name to create a new category."
            ))),
        };
    }
    match category_name {
        Some(name) => Ok(Some(find_or_create_category(txn, name).await?.id)),
        None => Ok(None),
    }
}

async fn replace_images(
    txn: &DatabaseTransaction,
    product_id: i32,
    images: Vec<String>,
) -> Result<(), ApiError> {
    product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    for (idx, image_url) in images.into_iter().enumerate() {
        product_image::ActiveModel {
            product_id: Set(product_id),
            image_url: Set(image_url),
            order_num: Set(idx as i32 + 1),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(())
}

/// Builds views for `products`, loading categories, farmer names and
/// images with one query each.
async fn views<C>(db: &C, products: Vec<product::Model>) -> Result<Vec<ProductView>, ApiError>
where
    C: ConnectionTrait,
{
    if products.is_empty() {
        return Ok(Vec::new());
    }
    let categories = products.load_one(category::Entity, db).await?;
    let images = products.load_many(product_image::Entity, db).await?;

    let farmer_ids: Vec<i32> = products.iter().map(|product| product.farmer_id).collect();
    let farmers: HashMap<i32, String> = user::Entity::find()
        .filter(user::Column::Id.is_in(farmer_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|user| (user.id, user.full_name()))
        .collect();

    Ok(products
        .into_iter()
        .zip(categories)
        .zip(images)
        .map(|((product, category), mut images)| {
            images.sort_by_key(|image| image.order_num);
            ProductView {
                id: product.id,
                name: product.name,
                category: category.map(|category| category.name),
                description: product.description,
                price: money::from_cents(product.price_cents),
                quantity_available: product.quantity_available,
                quantity_unit: product.quantity_unit,
                is_active: product.is_active,
                farmer_name: farmers.get(&product.farmer_id).cloned(),
                farmer_id: product.farmer_id,
                images: images.into_iter().map(|image| image.image_url).collect(),
                created_at: product.created_at,
                updated_at: product.updated_at,
            }
        })
        .collect())
}

async fn view<C>(db: &C, product: product::Model) -> Result<ProductView, ApiError>
where
    C: ConnectionTrait,
{
    views(db, vec![product])
        .await?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))
}

async fn owned_product(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    product_id: i32,
) -> Result<product::Model, ApiError> {
    let product = product::Entity::find_by_id(product_id)
        .one(txn)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    if product.farmer_id != farmer.0 {
        return Err(ApiError::Forbidden(
            "You do not have permission to modify this product".into(),
        ));
    }
    Ok(product)
}

pub async fn create_product(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    payload: NewProduct,
) -> Result<ProductView, ApiError> {
    accounts::farmer_profile(txn, farmer).await?;

    if payload.category_id.is_none() && payload.category_name.is_none() {
        return Err(ApiError::Validation(
            "Either category_id or category_name must be provided.".into(),
        ));
    }
    let category_id =
        resolve_category(txn, payload.category_id, payload.category_name.as_deref()).await?;

    let product = product::ActiveModel {
        farmer_id: Set(farmer.0),
        name: Set(payload.name),
        category_id: Set(category_id),
        description: Set(payload.description),
        price_cents: Set(money::price_to_cents(payload.price)?),
        quantity_available: Set(payload.quantity_available),
        quantity_unit: Set(payload.quantity_unit),
        is_active: Set(payload.is_active.unwrap_or(true)),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    replace_images(txn, product.id, payload.images).await?;
    info!(product_id = product.id, farmer_id = farmer.0, "Product created");
    view(txn, product).await
}

/// Partial update. `images`, when given, replaces the whole list.
/// Restocking a product reactivates it unless `is_active` says otherwise.
pub async fn update_product(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    product_id: i32,
    changes: ProductChanges,
) -> Result<ProductView, ApiError> {
    let product = owned_product(txn, farmer, product_id).await?;

    let category_id = if changes.category_id.is_some() || changes.category_name.is_some() {
        resolve_category(txn, changes.category_id, changes.category_name.as_deref()).await?
    } else {
        product.category_id
    };

    let mut active: product::ActiveModel = product.into();
    active.category_id = Set(category_id);
    if let Some(name) = changes.name {
        active.name = Set(name);
    }
    if let Some(description) = changes.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = changes.price {
        active.price_cents = Set(money::price_to_cents(price)?);
    }
    if let Some(quantity) = changes.quantity_available {
        active.quantity_available = Set(quantity);
        if quantity > 0 && changes.is_active.is_none() {
            active.is_active = Set(true);
        }
    }
    if let Some(unit) = changes.quantity_unit {
        active.quantity_unit = Set(unit);
    }
    if let Some(is_active) = changes.is_active {
        active.is_active = Set(is_active);
    }
    let product = active.update(txn).await?;

    if let Some(images) = changes.images {
        replace_images(txn, product.id, images).await?;
    }
    view(txn, product).await
}

/// Deletes a product that was never ordered, together with its images,
/// cart lines and offers.
pub async fn delete_product(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
    product_id: i32,
) -> Result<(), ApiError> {
    let product = owned_product(txn, farmer, product_id).await?;

    let ordered = order_item::Entity::find()
        .filter(order_item::Column::ProductId.eq(product.id))
        .count(txn)
        .await?;
    if ordered > 0 {
        return Err(ApiError::Conflict(
            "Product has been ordered and cannot be deleted".into(),
        ));
    }

    product_image::Entity::delete_many()
        .filter(product_image::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    cart_item::Entity::delete_many()
        .filter(cart_item::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    offer::Entity::delete_many()
        .filter(offer::Column::ProductId.eq(product.id))
        .exec(txn)
        .await?;
    product.delete(txn).await?;
    info!(product_id, farmer_id = farmer.0, "Product deleted");
    Ok(())
}

/// Active products only, newest first.
pub async fn list_products<C>(db: &C) -> Result<Vec<ProductView>, ApiError>
where
    C: ConnectionTrait,
{
    let products = product::Entity::find()
        .filter(product::Column::IsActive.eq(true))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await?;
    views(db, products).await
}

/// An inactive product is reported as missing.
pub async fn get_product<C>(db: &C, product_id: i32) -> Result<ProductView, ApiError>
where
    C: ConnectionTrait,
{
    let product = product::Entity::find_by_id(product_id)
        .filter(product::Column::IsActive.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Product not found".into()))?;
    view(db, product).await
}

pub async fn farmer_products(
    txn: &DatabaseTransaction,
    farmer: FarmerId,
) -> Result<Vec<ProductView>, ApiError> {
    accounts::farmer_profile(txn, farmer).await?;
    let products = product::Entity::find()
        .filter(product::Column::FarmerId.eq(farmer.0))
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(txn)
        .await?;
    views(txn, products).await
}

pub async fn list_categories<C>(db: &C) -> Result<Vec<category::Model>, ApiError>
where
    C: ConnectionTrait,
{
    Ok(category::Entity::find()
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}
