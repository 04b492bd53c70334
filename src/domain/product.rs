//! Catalog entities: products, their images and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::config::{
    DEFAULT_PAGE_NUMBER, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PRODUCT_STATUS_ARCHIVED,
    PRODUCT_STATUS_DRAFT, PRODUCT_STATUS_PUBLISHED,
};

/// Publication state of a product. Only published products are purchasable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => PRODUCT_STATUS_DRAFT,
            ProductStatus::Published => PRODUCT_STATUS_PUBLISHED,
            ProductStatus::Archived => PRODUCT_STATUS_ARCHIVED,
        }
    }
}

impl From<&str> for ProductStatus {
    fn from(s: &str) -> Self {
        match s {
            PRODUCT_STATUS_PUBLISHED => ProductStatus::Published,
            PRODUCT_STATUS_ARCHIVED => ProductStatus::Archived,
            PRODUCT_STATUS_DRAFT => ProductStatus::Draft,
            other => {
                tracing::warn!(status = other, "Unknown product status, reading as draft");
                ProductStatus::Draft
            }
        }
    }
}

impl std::fmt::Display for ProductStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Product domain entity. Prices are integer minor currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_qty: i32,
    pub status: ProductStatus,
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_purchasable(&self) -> bool {
        self.status == ProductStatus::Published
    }

    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock_qty >= quantity
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: Uuid,
    pub product_id: Uuid,
    pub image_url: String,
    pub sort_order: i32,
}

impl ProductImage {
    /// Externally hosted images are never touched on disk.
    pub fn is_remote(&self) -> bool {
        self.image_url.starts_with("http://") || self.image_url.starts_with("https://")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

/// Product with its categories, as returned by the single-product read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetails {
    #[serde(flatten)]
    pub product: Product,
    pub categories: Vec<Category>,
}

/// Image reference supplied with a product create/update
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProductImageInput {
    #[validate(length(min = 1, message = "Image URL is required"))]
    pub image_url: String,
    #[serde(default)]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_qty: i32,
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub category_ids: Vec<Uuid>,
    #[validate(nested)]
    #[serde(default)]
    pub images: Vec<ProductImageInput>,
}

/// Partial product edit. `None` leaves a field untouched; `Some` collections
/// replace the current set.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductChanges {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: Option<i64>,
    #[validate(range(min = 0, message = "Stock cannot be negative"))]
    pub stock_qty: Option<i32>,
    pub status: Option<ProductStatus>,
    pub category_ids: Option<Vec<Uuid>>,
    #[validate(nested)]
    pub images: Option<Vec<ProductImageInput>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "Slug is required"))]
    pub slug: String,
}

/// Catalog listing filter
#[derive(Debug, Clone, Deserialize)]
pub struct ProductQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub status: Option<ProductStatus>,
    pub search: Option<String>,
}

fn default_page() -> u64 {
    DEFAULT_PAGE_NUMBER
}

fn default_limit() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE_NUMBER,
            limit: DEFAULT_PAGE_SIZE,
            status: None,
            search: None,
        }
    }
}

impl ProductQuery {
    /// Page number, never below 1
    pub fn page(&self) -> u64 {
        self.page.max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.limit()
    }

    /// Trimmed, lower-cased search term; blank searches are dropped.
    pub fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Slugs are stored trimmed and lower-cased.
pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parsing_defaults_to_draft() {
        assert_eq!(ProductStatus::from("published"), ProductStatus::Published);
        assert_eq!(ProductStatus::from("archived"), ProductStatus::Archived);
        assert_eq!(ProductStatus::from("bogus"), ProductStatus::Draft);
    }

    #[test]
    fn test_query_bounds() {
        let query = ProductQuery {
            page: 0,
            limit: 500,
            ..Default::default()
        };
        assert_eq!(query.page(), 1);
        assert_eq!(query.limit(), MAX_PAGE_SIZE);
        assert_eq!(query.offset(), 0);

        let query = ProductQuery {
            page: 3,
            ..Default::default()
        };
        assert_eq!(query.offset(), 24);
    }

    #[test]
    fn test_blank_search_is_ignored() {
        let query = ProductQuery {
            search: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(query.search_term(), None);

        let query = ProductQuery {
            search: Some(" Safari ".into()),
            ..Default::default()
        };
        assert_eq!(query.search_term().as_deref(), Some("safari"));
    }

    #[test]
    fn test_remote_images() {
        let mut image = ProductImage {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            image_url: "https://cdn.example.com/a.png".into(),
            sort_order: 0,
        };
        assert!(image.is_remote());
        image.image_url = "hat1f2e.png".into();
        assert!(!image.is_remote());
    }
}
