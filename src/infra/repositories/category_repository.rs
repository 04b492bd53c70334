//! Category repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

use super::entities::category::{self, Entity as CategoryEntity};
use crate::domain::Category;
use crate::errors::{conflict_on_duplicate, AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

const DUPLICATE_CATEGORY: &str = "Category name or slug already in use";

#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// All categories ordered by name
    async fn list(&self) -> AppResult<Vec<Category>>;

    /// Insert a category; `Conflict` if the name or slug is taken
    async fn create(&self, name: String, slug: String) -> AppResult<Category>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

pub struct CategoryStore {
    db: DatabaseConnection,
}

impl CategoryStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepository for CategoryStore {
    async fn list(&self) -> AppResult<Vec<Category>> {
        let models = CategoryEntity::find()
            .order_by_asc(category::Column::Name)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(Category::from).collect())
    }

    async fn create(&self, name: String, slug: String) -> AppResult<Category> {
        let taken = CategoryEntity::find()
            .filter(
                Condition::any()
                    .add(category::Column::Name.eq(name.as_str()))
                    .add(category::Column::Slug.eq(slug.as_str())),
            )
            .one(&self.db)
            .await?;
        if taken.is_some() {
            return Err(AppError::conflict(DUPLICATE_CATEGORY));
        }

        // A concurrent insert can still win the race; the unique keys decide
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            slug: Set(slug),
        }
        .insert(&self.db)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE_CATEGORY))?;

        Ok(Category::from(model))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = CategoryEntity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(AppError::NotFound("Category"));
        }
        Ok(())
    }
}
