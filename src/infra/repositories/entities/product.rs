//! Product database entity.

use sea_orm::entity::prelude::*;

use crate::domain::{Product, ProductImage, ProductStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub stock_qty: i32,
    pub status: String,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::product_category::Entity")]
    ProductCategories,
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::product_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProductCategories.def()
    }
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::product_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::product_category::Relation::Product.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Build the domain product with its (already ordered) images.
    pub fn into_product(self, images: Vec<ProductImage>) -> Product {
        Product {
            id: self.id,
            name: self.name,
            slug: self.slug,
            description: self.description,
            price_cents: self.price_cents,
            stock_qty: self.stock_qty,
            status: ProductStatus::from(self.status.as_str()),
            images,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Product without images populated
impl From<Model> for Product {
    fn from(model: Model) -> Self {
        model.into_product(Vec::new())
    }
}
