pub mod buyer;
pub mod cart;
pub mod cart_item;
pub mod category;
pub mod farmer;
pub mod message;
pub mod offer;
pub mod order;
pub mod order_item;
pub mod product;
pub mod product_image;
pub mod user;

use sea_orm::{
    sea_query::{Index, IndexCreateStatement, TableCreateStatement},
    ConnectionTrait, DatabaseConnection, DbErr, Schema,
};
use tracing::info;

use crate::entities::{
    buyer::Entity as Buyer, cart::Entity as Cart, cart_item::Entity as CartItem,
    category::Entity as Category, farmer::Entity as Farmer, message::Entity as Message,
    offer::Entity as Offer, order::Entity as Order, order_item::Entity as OrderItem,
    product::Entity as Product, product_image::Entity as ProductImage, user::Entity as User,
};

/// Creates every table and index that does not exist yet.
///
/// Tables are created parent-first so that foreign keys always point at
/// an existing table.
pub async fn setup_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut tables: Vec<TableCreateStatement> = vec![
        schema.create_table_from_entity(User),
        schema.create_table_from_entity(Farmer),
        schema.create_table_from_entity(Buyer),
        schema.create_table_from_entity(Category),
        schema.create_table_from_entity(Product),
        schema.create_table_from_entity(ProductImage),
        schema.create_table_from_entity(Cart),
        schema.create_table_from_entity(CartItem),
        schema.create_table_from_entity(Offer),
        schema.create_table_from_entity(Order),
        schema.create_table_from_entity(OrderItem),
        schema.create_table_from_entity(Message),
    ];

    for table in tables.iter_mut() {
        table.if_not_exists();
        db.execute(backend.build(&*table)).await?;
    }

    let mut indexes: Vec<IndexCreateStatement> = Vec::new();
    indexes.extend(schema.create_index_from_entity(Product));
    indexes.extend(schema.create_index_from_entity(ProductImage));
    indexes.extend(schema.create_index_from_entity(CartItem));
    indexes.extend(schema.create_index_from_entity(Offer));
    indexes.extend(schema.create_index_from_entity(Order));
    indexes.extend(schema.create_index_from_entity(OrderItem));
    indexes.extend(schema.create_index_from_entity(Message));

    // One line per (cart, product): repeated adds must merge into it.
    indexes.push(
        Index::create()
            .name("idx_cart_items_cart_product")
            .table(CartItem)
            .col(cart_item::Column::CartId)
            .col(cart_item::Column::ProductId)
            .unique()
            .to_owned(),
    );

    for index in indexes.iter_mut() {
        index.if_not_exists();
        db.execute(backend.build(&*index)).await?;
    }

    info!(tables = tables.len(), indexes = indexes.len(), "Schema ready");
    Ok(())
}

