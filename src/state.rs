use std::sync::Arc;

use crate::{config::Config, store::Store, utils::department_cache::DepartmentCache};

/// Shared handles every handler receives through `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub departments: DepartmentCache,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self {
            store,
            departments: DepartmentCache::new(config.department_cache_ttl),
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }
}
