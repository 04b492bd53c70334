//! Catalog reads and single-row image writes.
//!
//! Multi-row product writes (create/update with categories and images) run
//! through the transaction-bound repository instead.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use super::entities::{product, product_image};
use super::loaders;
use crate::domain::{normalize_slug, Product, ProductDetails, ProductImage, ProductQuery};
use crate::errors::{AppError, AppResult, OptionExt};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const LIKE_ESCAPE: char = '\\';

/// LIKE pattern matching `term` anywhere, with its wildcards taken literally
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Product with images
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Product>>;

    /// Product with images and categories
    async fn find_details(&self, id: Uuid) -> AppResult<Option<ProductDetails>>;

    /// One page of products, newest first, plus the total match count
    async fn list(&self, query: ProductQuery) -> AppResult<(Vec<Product>, u64)>;

    /// Delete a product; images and cart lines go with it
    async fn delete(&self, id: Uuid) -> AppResult<()>;

    async fn find_image(&self, product_id: Uuid, image_id: Uuid) -> AppResult<Option<ProductImage>>;

    /// Append an image after the existing ones
    async fn add_image(&self, product_id: Uuid, image_url: String) -> AppResult<ProductImage>;

    async fn set_image_url(&self, image_id: Uuid, image_url: String) -> AppResult<ProductImage>;
}

pub struct ProductStore {
    db: DatabaseConnection,
}

impl ProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductRepository for ProductStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(loaders::find_product(&self.db, id).await?)
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Product>> {
        let model = product::Entity::find()
            .filter(product::Column::Slug.eq(normalize_slug(slug)))
            .one(&self.db)
            .await?;

        match model {
            Some(model) => Ok(loaders::with_images(&self.db, vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_details(&self, id: Uuid) -> AppResult<Option<ProductDetails>> {
        Ok(loaders::find_product_details(&self.db, id).await?)
    }

    async fn list(&self, query: ProductQuery) -> AppResult<(Vec<Product>, u64)> {
        let mut select = product::Entity::find();
        if let Some(status) = query.status {
            select = select.filter(product::Column::Status.eq(status.as_str()));
        }
        if let Some(term) = query.search_term() {
            // Case-insensitive on every backend; ILIKE is Postgres-only
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(product::Column::Name)))
                    .like(LikeExpr::new(contains_pattern(&term)).escape(LIKE_ESCAPE)),
            );
        }

        let total = select.clone().count(&self.db).await?;
        let models = select
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .offset(query.offset())
            .limit(query.limit())
            .all(&self.db)
            .await?;

        let products = loaders::with_images(&self.db, models).await?;
        Ok((products, total))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = product::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Product"));
        }
        Ok(())
    }

    async fn find_image(&self, product_id: Uuid, image_id: Uuid) -> AppResult<Option<ProductImage>> {
        let model = product_image::Entity::find_by_id(image_id)
            .filter(product_image::Column::ProductId.eq(product_id))
            .one(&self.db)
            .await?;
        Ok(model.map(ProductImage::from))
    }

    async fn add_image(&self, product_id: Uuid, image_url: String) -> AppResult<ProductImage> {
        let existing = product_image::Entity::find()
            .filter(product_image::Column::ProductId.eq(product_id))
            .count(&self.db)
            .await?;

        let model = product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            image_url: Set(image_url),
            sort_order: Set(i32::try_from(existing).unwrap_or(i32::MAX)),
        }
        .insert(&self.db)
        .await?;

        touch(&self.db, product_id).await?;
        Ok(ProductImage::from(model))
    }

    async fn set_image_url(&self, image_id: Uuid, image_url: String) -> AppResult<ProductImage> {
        let model = product_image::Entity::find_by_id(image_id)
            .one(&self.db)
            .await?
            .ok_or_not_found("Product image")?;
        let product_id = model.product_id;

        let mut active: product_image::ActiveModel = model.into();
        active.image_url = Set(image_url);
        let model = active.update(&self.db).await?;

        touch(&self.db, product_id).await?;
        Ok(ProductImage::from(model))
    }
}

/// Bump `updated_at` after a child row changed.
async fn touch(db: &DatabaseConnection, product_id: Uuid) -> AppResult<()> {
    product::Entity::update_many()
        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(product::Column::Id.eq(product_id))
        .exec(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("lamp"), "%lamp%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b"), "%a\\_b%");
        assert_eq!(contains_pattern("c:\\x"), "%c:\\\\x%");
    }
}
