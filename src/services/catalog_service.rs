//! Catalog service - Products, categories and product images.
//!
//! Reads are public; every write requires an administrator. Product
//! create/update touch several tables and run in one transaction, with the
//! product row locked so stock edits serialize with checkout.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    normalize_slug, Category, CurrentUser, NewCategory, NewProduct, Product, ProductChanges,
    ProductDetails, ProductImage, ProductQuery,
};
use crate::errors::{AppError, AppResult, OptionExt};
use crate::infra::{image_file_name, ImageStore, UnitOfWork};
use crate::types::Paginated;
use crate::with_transaction;

const SLUG_TAKEN: &str = "Product slug already in use";

/// Catalog service trait for dependency injection.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn create_product(&self, actor: &CurrentUser, input: NewProduct) -> AppResult<ProductDetails>;

    /// Filtered page of products, newest first
    async fn list_products(&self, query: ProductQuery) -> AppResult<Paginated<Product>>;

    /// Product with its images and categories
    async fn get_product(&self, id: Uuid) -> AppResult<ProductDetails>;

    async fn get_product_by_slug(&self, slug: &str) -> AppResult<Product>;

    async fn update_product(
        &self,
        actor: &CurrentUser,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<ProductDetails>;

    async fn delete_product(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()>;

    /// Store an uploaded image and append it to the product's gallery
    async fn add_image(
        &self,
        actor: &CurrentUser,
        product_id: Uuid,
        original_name: String,
        bytes: Vec<u8>,
    ) -> AppResult<ProductImage>;

    /// Swap the file behind an existing image, keeping its position
    async fn replace_image(
        &self,
        actor: &CurrentUser,
        product_id: Uuid,
        image_id: Uuid,
        original_name: String,
        bytes: Vec<u8>,
    ) -> AppResult<ProductImage>;

    async fn create_category(&self, actor: &CurrentUser, input: NewCategory) -> AppResult<Category>;

    async fn list_categories(&self) -> AppResult<Vec<Category>>;

    async fn delete_category(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()>;
}

/// Concrete implementation of CatalogService using Unit of Work.
pub struct CatalogManager<U: UnitOfWork> {
    uow: Arc<U>,
    images: Arc<dyn ImageStore>,
}

impl<U: UnitOfWork> CatalogManager<U> {
    pub fn new(uow: Arc<U>, images: Arc<dyn ImageStore>) -> Self {
        Self { uow, images }
    }
}

/// Normalize a slug and make sure something is left of it
fn clean_slug(slug: &str) -> AppResult<String> {
    let slug = normalize_slug(slug);
    if slug.is_empty() {
        return Err(AppError::validation("Slug is required"));
    }
    Ok(slug)
}

#[async_trait]
impl<U: UnitOfWork> CatalogService for CatalogManager<U> {
    #[tracing::instrument(skip(self, actor, input), fields(actor_id = %actor.id, slug = %input.slug))]
    async fn create_product(&self, actor: &CurrentUser, input: NewProduct) -> AppResult<ProductDetails> {
        actor.require_admin()?;
        input.validate()?;

        let mut input = input;
        input.slug = clean_slug(&input.slug)?;

        let details = with_transaction!(self.uow, |ctx| {
            let products = ctx.products();
            if products.slug_taken(&input.slug, None).await? {
                return Err(AppError::conflict(SLUG_TAKEN));
            }

            let product = products.create(&input).await?;
            products.set_categories(product.id, &input.category_ids).await?;
            products.replace_images(product.id, &input.images).await?;

            products.find_details(product.id).await?.ok_or_not_found("Product")
        })?;

        tracing::info!(product_id = %details.product.id, "Product created");
        Ok(details)
    }

    #[tracing::instrument(skip(self))]
    async fn list_products(&self, query: ProductQuery) -> AppResult<Paginated<Product>> {
        let (page, limit) = (query.page(), query.limit());
        let (items, total) = self.uow.products().list(query).await?;
        Ok(Paginated::new(items, page, limit, total))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<ProductDetails> {
        self.uow
            .products()
            .find_details(id)
            .await?
            .ok_or_not_found("Product")
    }

    async fn get_product_by_slug(&self, slug: &str) -> AppResult<Product> {
        self.uow
            .products()
            .find_by_slug(slug)
            .await?
            .ok_or_not_found("Product")
    }

    #[tracing::instrument(skip(self, actor, changes), fields(actor_id = %actor.id))]
    async fn update_product(
        &self,
        actor: &CurrentUser,
        id: Uuid,
        changes: ProductChanges,
    ) -> AppResult<ProductDetails> {
        actor.require_admin()?;
        changes.validate()?;

        let mut changes = changes;
        changes.slug = changes.slug.as_deref().map(clean_slug).transpose()?;

        let details = with_transaction!(self.uow, |ctx| {
            let products = ctx.products();

            // Lock first so a concurrent checkout cannot interleave with the edit
            products.find_for_update(id).await?.ok_or_not_found("Product")?;

            if let Some(slug) = &changes.slug {
                if products.slug_taken(slug, Some(id)).await? {
                    return Err(AppError::conflict(SLUG_TAKEN));
                }
            }

            products.update(id, &changes).await?;
            if let Some(category_ids) = &changes.category_ids {
                products.set_categories(id, category_ids).await?;
            }
            if let Some(images) = &changes.images {
                products.replace_images(id, images).await?;
            }

            products.find_details(id).await?.ok_or_not_found("Product")
        })?;

        tracing::info!(product_id = %id, "Product updated");
        Ok(details)
    }

    #[tracing::instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn delete_product(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        self.uow.products().delete(id).await?;
        tracing::info!(product_id = %id, "Product deleted");
        Ok(())
    }

    #[tracing::instrument(skip(self, actor, bytes), fields(actor_id = %actor.id))]
    async fn add_image(
        &self,
        actor: &CurrentUser,
        product_id: Uuid,
        original_name: String,
        bytes: Vec<u8>,
    ) -> AppResult<ProductImage> {
        actor.require_admin()?;

        let products = self.uow.products();
        products
            .find_by_id(product_id)
            .await?
            .ok_or_not_found("Product")?;

        let file_name = image_file_name(&original_name);
        self.images.save(&file_name, bytes).await?;

        match products.add_image(product_id, file_name.clone()).await {
            Ok(image) => {
                tracing::info!(image_id = %image.id, "Product image added");
                Ok(image)
            }
            Err(e) => {
                if let Err(cleanup) = self.images.remove(&file_name).await {
                    tracing::warn!("Orphaned image {} left behind: {}", file_name, cleanup);
                }
                Err(e)
            }
        }
    }

    #[tracing::instrument(skip(self, actor, bytes), fields(actor_id = %actor.id))]
    async fn replace_image(
        &self,
        actor: &CurrentUser,
        product_id: Uuid,
        image_id: Uuid,
        original_name: String,
        bytes: Vec<u8>,
    ) -> AppResult<ProductImage> {
        actor.require_admin()?;

        let products = self.uow.products();
        let previous = products
            .find_image(product_id, image_id)
            .await?
            .ok_or_not_found("Product image")?;

        let file_name = image_file_name(&original_name);
        self.images.save(&file_name, bytes).await?;
        let image = products.set_image_url(image_id, file_name).await?;

        if !previous.is_remote() {
            if let Err(e) = self.images.remove(&previous.image_url).await {
                tracing::warn!("Previous image {} not removed: {}", previous.image_url, e);
            }
        }

        tracing::info!(%image_id, "Product image replaced");
        Ok(image)
    }

    #[tracing::instrument(skip(self, actor, input), fields(actor_id = %actor.id))]
    async fn create_category(&self, actor: &CurrentUser, input: NewCategory) -> AppResult<Category> {
        actor.require_admin()?;
        input.validate()?;

        let name = input.name.trim().to_string();
        let slug = clean_slug(&input.slug)?;

        let category = self.uow.categories().create(name, slug).await?;
        tracing::info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    async fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.uow.categories().list().await
    }

    #[tracing::instrument(skip(self, actor), fields(actor_id = %actor.id))]
    async fn delete_category(&self, actor: &CurrentUser, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;

        self.uow.categories().delete(id).await?;
        tracing::info!(category_id = %id, "Category deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProductStatus, UserRole};
    use crate::infra::{MockCategoryRepository, MockImageStore, MockProductRepository};
    use crate::services::testing::TestUnitOfWork;
    use chrono::Utc;
    use mockall::predicate::{always, eq};

    fn admin() -> CurrentUser {
        CurrentUser::new(Uuid::new_v4(), "root@example.com", UserRole::Admin)
    }

    fn customer() -> CurrentUser {
        CurrentUser::new(Uuid::new_v4(), "ada@example.com", UserRole::Customer)
    }

    fn lamp() -> Product {
        Product {
            id: Uuid::new_v4(),
            name: "Desk Lamp".into(),
            slug: "desk-lamp".into(),
            description: None,
            price_cents: 2_500,
            stock_qty: 3,
            status: ProductStatus::Published,
            images: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn image(product_id: Uuid, url: &str) -> ProductImage {
        ProductImage {
            id: Uuid::new_v4(),
            product_id,
            image_url: url.to_string(),
            sort_order: 0,
        }
    }

    #[tokio::test]
    async fn test_customers_cannot_write_the_catalog() {
        let mut categories = MockCategoryRepository::new();
        categories.expect_create().never();
        let mut products = MockProductRepository::new();
        products.expect_delete().never();

        let uow = TestUnitOfWork::default()
            .with_categories(categories)
            .with_products(products);
        let service = CatalogManager::new(Arc::new(uow), Arc::new(MockImageStore::new()));

        let input = NewCategory {
            name: "Lighting".into(),
            slug: "lighting".into(),
        };
        let err = service.create_category(&customer(), input).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = service
            .delete_product(&customer(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn test_category_slug_is_normalized() {
        let mut categories = MockCategoryRepository::new();
        categories
            .expect_create()
            .with(eq("Lighting".to_string()), eq("lighting".to_string()))
            .returning(|name, slug| {
                Ok(Category {
                    id: Uuid::new_v4(),
                    name,
                    slug,
                })
            });

        let uow = TestUnitOfWork::default().with_categories(categories);
        let service = CatalogManager::new(Arc::new(uow), Arc::new(MockImageStore::new()));

        let input = NewCategory {
            name: " Lighting ".into(),
            slug: "  LIGHTING ".into(),
        };
        let category = service.create_category(&admin(), input).await.unwrap();
        assert_eq!(category.slug, "lighting");
    }

    #[tokio::test]
    async fn test_add_image_stores_file_then_appends_row() {
        let product = lamp();
        let product_id = product.id;

        let mut products = MockProductRepository::new();
        products
            .expect_find_by_id()
            .returning(move |_| Ok(Some(product.clone())));
        products
            .expect_add_image()
            .withf(|_, url| url.starts_with("lamp") && url.ends_with(".png"))
            .returning(|product_id, url| Ok(image(product_id, &url)));

        let mut images = MockImageStore::new();
        images
            .expect_save()
            .withf(|name, bytes| name.starts_with("lamp") && bytes == &vec![1u8, 2, 3])
            .times(1)
            .returning(|_, _| Ok(()));

        let uow = TestUnitOfWork::default().with_products(products);
        let service = CatalogManager::new(Arc::new(uow), Arc::new(images));

        let stored = service
            .add_image(&admin(), product_id, "Lamp.PNG".into(), vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(stored.product_id, product_id);
    }

    #[tokio::test]
    async fn test_replace_image_removes_previous_local_file() {
        let product_id = Uuid::new_v4();
        let previous = image(product_id, "old-lamp1a2b.png");
        let image_id = previous.id;

        let mut products = MockProductRepository::new();
        products
            .expect_find_image()
            .returning(move |_, _| Ok(Some(previous.clone())));
        products
            .expect_set_image_url()
            .returning(move |id, url| {
                let mut updated = image(product_id, &url);
                updated.id = id;
                Ok(updated)
            });

        let mut images = MockImageStore::new();
        images.expect_save().returning(|_, _| Ok(()));
        images
            .expect_remove()
            .with(eq("old-lamp1a2b.png"))
            .times(1)
            .returning(|_| Ok(()));

        let uow = TestUnitOfWork::default().with_products(products);
        let service = CatalogManager::new(Arc::new(uow), Arc::new(images));

        let replaced = service
            .replace_image(&admin(), product_id, image_id, "new.png".into(), vec![7])
            .await
            .unwrap();
        assert_eq!(replaced.id, image_id);
        assert!(replaced.image_url.starts_with("new"));
    }

    #[tokio::test]
    async fn test_replace_image_leaves_remote_urls_alone() {
        let product_id = Uuid::new_v4();
        let previous = image(product_id, "https://cdn.example.com/lamp.png");
        let image_id = previous.id;

        let mut products = MockProductRepository::new();
        products
            .expect_find_image()
            .returning(move |_, _| Ok(Some(previous.clone())));
        products
            .expect_set_image_url()
            .returning(move |_, url| Ok(image(product_id, &url)));

        let mut images = MockImageStore::new();
        images.expect_save().with(always(), always()).returning(|_, _| Ok(()));
        images.expect_remove().never();

        let uow = TestUnitOfWork::default().with_products(products);
        let service = CatalogManager::new(Arc::new(uow), Arc::new(images));

        service
            .replace_image(&admin(), product_id, image_id, "new.png".into(), vec![7])
            .await
            .unwrap();
    }
}
