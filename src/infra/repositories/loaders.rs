//! Read helpers shared by the pooled stores and the transaction-bound
//! repositories. Everything here is generic over the connection so the same
//! loading rules apply inside and outside a transaction.

use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use uuid::Uuid;

use super::entities::{
    cart, cart_item, category, order, order_item, product, product_category, product_image,
};
use crate::config::CART_STATUS_ACTIVE;
use crate::domain::{
    Cart, CartStatus, Category, Order, OrderItem, Product, ProductDetails, ProductImage,
};

/// `SELECT ... FOR UPDATE` where the backend has row locks.
///
/// SQLite serializes writers on the whole database and has no row locks.
pub(crate) fn for_update<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Select<E> {
    match backend {
        DbBackend::Sqlite => select,
        _ => select.lock_exclusive(),
    }
}

/// Images for the given products, each list ordered by sort order.
pub(crate) async fn images_by_product<C: ConnectionTrait>(
    db: &C,
    product_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<ProductImage>>, DbErr> {
    let mut grouped: HashMap<Uuid, Vec<ProductImage>> = HashMap::new();
    if product_ids.is_empty() {
        return Ok(grouped);
    }

    let rows = product_image::Entity::find()
        .filter(product_image::Column::ProductId.is_in(product_ids.iter().copied()))
        .order_by_asc(product_image::Column::SortOrder)
        .order_by_asc(product_image::Column::Id)
        .all(db)
        .await?;

    for row in rows {
        grouped
            .entry(row.product_id)
            .or_default()
            .push(ProductImage::from(row));
    }
    Ok(grouped)
}

/// Attach images to product rows, keeping the row order.
pub(crate) async fn with_images<C: ConnectionTrait>(
    db: &C,
    models: Vec<product::Model>,
) -> Result<Vec<Product>, DbErr> {
    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let mut images = images_by_product(db, &ids).await?;

    Ok(models
        .into_iter()
        .map(|m| {
            let own = images.remove(&m.id).unwrap_or_default();
            m.into_product(own)
        })
        .collect())
}

pub(crate) async fn find_product<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<Product>, DbErr> {
    match product::Entity::find_by_id(id).one(db).await? {
        Some(model) => Ok(with_images(db, vec![model]).await?.pop()),
        None => Ok(None),
    }
}

/// Product with images and categories
pub(crate) async fn find_product_details<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<ProductDetails>, DbErr> {
    let Some(product) = find_product(db, id).await? else {
        return Ok(None);
    };

    let categories = category::Entity::find()
        .inner_join(product_category::Entity)
        .filter(product_category::Column::ProductId.eq(id))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(Some(ProductDetails { product, categories }))
}

/// The user's active cart with items in insertion order and their products.
pub(crate) async fn find_active_cart<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Option<Cart>, DbErr> {
    let model = cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart::Column::Status.eq(CART_STATUS_ACTIVE))
        .one(db)
        .await?;

    match model {
        Some(model) => Ok(Some(assemble_cart(db, model).await?)),
        None => Ok(None),
    }
}

pub(crate) async fn assemble_cart<C: ConnectionTrait>(
    db: &C,
    model: cart::Model,
) -> Result<Cart, DbErr> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(model.id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .order_by_asc(cart_item::Column::Id)
        .all(db)
        .await?;

    let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let products: HashMap<Uuid, Product> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        product::Entity::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, Product::from(m)))
            .collect()
    };

    let items = rows
        .into_iter()
        .map(|row| {
            let product = products.get(&row.product_id).cloned();
            row.into_item(product)
        })
        .collect();

    Ok(Cart {
        id: model.id,
        user_id: model.user_id,
        status: CartStatus::from(model.status.as_str()),
        items,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

/// Attach line items to order rows, keeping the row order.
pub(crate) async fn with_items<C: ConnectionTrait>(
    db: &C,
    models: Vec<order::Model>,
) -> Result<Vec<Order>, DbErr> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
    let rows = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(ids))
        .order_by_asc(order_item::Column::Position)
        .all(db)
        .await?;

    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for row in rows {
        grouped.entry(row.order_id).or_default().push(OrderItem::from(row));
    }

    Ok(models
        .into_iter()
        .map(|m| {
            let items = grouped.remove(&m.id).unwrap_or_default();
            m.into_order(items)
        })
        .collect())
}
