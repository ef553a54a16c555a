use chrono::{DateTime, Utc};
use souk_core::repository::{CategoryRepository, RepoError};
use souk_shared::models::{Category, CategoryNode};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::tree::build_category_tree;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Category refresh failed: {0}")]
    RefreshFailed(#[source] RepoError),
}

/// Immutable view of the category table at one point in time.
#[derive(Debug)]
pub struct CategorySnapshot {
    tree: Arc<[CategoryNode]>,
    index: HashMap<Uuid, Category>,
    loaded_at: DateTime<Utc>,
}

impl CategorySnapshot {
    pub fn build(rows: Vec<Category>) -> Self {
        let tree: Arc<[CategoryNode]> = build_category_tree(&rows).into();
        let mut index = HashMap::with_capacity(rows.len());
        // First occurrence wins, as in the tree.
        for row in rows {
            index.entry(row.id).or_insert(row);
        }
        Self {
            tree,
            index,
            loaded_at: Utc::now(),
        }
    }

    pub fn tree(&self) -> Arc<[CategoryNode]> {
        Arc::clone(&self.tree)
    }

    pub fn get(&self, id: &Uuid) -> Option<&Category> {
        self.index.get(id)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

/// Serves the category tree from memory.
///
/// The tree and the flat index live in one [`CategorySnapshot`] behind an
/// `Arc`. A refresh builds a complete new snapshot off to the side and swaps
/// the pointer, so a reader holds either the old snapshot or the new one in
/// full. The lock only guards the pointer and is never held across an await.
pub struct CategoryCache {
    repo: Arc<dyn CategoryRepository>,
    current: RwLock<Arc<CategorySnapshot>>,
}

impl CategoryCache {
    /// Loads the first snapshot. Fails if it cannot be read, since there is
    /// nothing older to fall back on.
    pub async fn load(repo: Arc<dyn CategoryRepository>) -> Result<Self, CacheError> {
        info!("Loading category cache...");
        let rows = repo
            .list_active_categories()
            .await
            .map_err(CacheError::RefreshFailed)?;
        let snapshot = CategorySnapshot::build(rows);
        info!("Loaded {} categories into memory", snapshot.len());

        Ok(Self {
            repo,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Re-reads the table and swaps in a new snapshot. On a failed read the
    /// previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize, CacheError> {
        info!("Refreshing category cache...");
        let rows = match self.repo.list_active_categories().await {
            Ok(rows) => rows,
            Err(e) => {
                let stale = self.snapshot();
                warn!(
                    error = %e,
                    loaded_at = %stale.loaded_at(),
                    "Category refresh failed, serving previous snapshot"
                );
                return Err(CacheError::RefreshFailed(e));
            }
        };

        let snapshot = Arc::new(CategorySnapshot::build(rows));
        let count = snapshot.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;

        info!("Loaded {} categories into memory", count);
        Ok(count)
    }

    pub fn snapshot(&self) -> Arc<CategorySnapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The cached forest.
    pub fn find_all(&self) -> Arc<[CategoryNode]> {
        self.snapshot().tree()
    }

    pub fn find_one(&self, id: &Uuid) -> Option<Category> {
        self.snapshot().get(id).cloned()
    }
}
