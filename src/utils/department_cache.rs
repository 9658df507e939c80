use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::{
    error::{AppError, AppResult},
    model::department::Department,
    store::Store,
};

/// Whole department list under a single key, expiring after `ttl`.
#[derive(Clone)]
pub struct DepartmentCache {
    cache: Cache<(), Arc<Vec<Department>>>,
}

impl DepartmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn all(&self, store: &dyn Store) -> AppResult<Arc<Vec<Department>>> {
        self.cache
            .try_get_with((), async {
                let departments = store.list_departments().await?;
                tracing::debug!(count = departments.len(), "Department cache loaded");
                Ok::<_, AppError>(Arc::new(departments))
            })
            .await
            .map_err(|e| AppError::Persistence(e.to_string()))
    }

    pub async fn find(&self, store: &dyn Store, id: u64) -> AppResult<Option<Department>> {
        Ok(self.all(store).await?.iter().find(|d| d.id == id).cloned())
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&()).await;
    }
}
