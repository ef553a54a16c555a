use async_trait::async_trait;
use souk_core::repository::{CategoryRepository, RepoResult};
use souk_shared::models::Category;
use sqlx::PgPool;

use crate::rows::CategoryRow;

pub struct PostgresCategoryRepository {
    pub pool: PgPool,
}

#[async_trait]
impl CategoryRepository for PostgresCategoryRepository {
    async fn list_active_categories(&self) -> RepoResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, parent_id, icon, is_active
             FROM categories
             WHERE is_active = TRUE
             ORDER BY name ASC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Category::from).collect())
    }
}
