use std::sync::Arc;

use tracing::info;

use crate::{
    auth::auth::Principal,
    error::{AppError, AppResult},
    model::{department::Department, employee::check_text},
    utils::department_cache::DepartmentCache,
    store::Store,
};

pub async fn list(store: &dyn Store, cache: &DepartmentCache) -> AppResult<Arc<Vec<Department>>> {
    cache.all(store).await
}

pub async fn create(
    store: &dyn Store,
    cache: &DepartmentCache,
    principal: &Principal,
    name: &str,
) -> AppResult<Department> {
    principal.require_admin()?;
    check_text("name", name, 20)?;

    let department = store.create_department(name.trim()).await?;
    cache.invalidate().await;
    info!(department_id = department.id, name = %department.name, "Department created");
    Ok(department)
}

/// Fails with a validation error unless `id` names an existing department.
pub async fn ensure_exists(store: &dyn Store, cache: &DepartmentCache, id: u64) -> AppResult<Department> {
    if let Some(department) = cache.find(store, id).await? {
        return Ok(department);
    }
    // a department created by another instance may not be cached yet
    cache.invalidate().await;
    cache
        .find(store, id)
        .await?
        .ok_or_else(|| AppError::validation(format!("department {id} does not exist")))
}
