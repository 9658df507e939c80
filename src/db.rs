use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::{
    auth::password::hash_password,
    config::Config,
    error::AppError,
    model::user::NewUser,
    service::statistics::POSITION_CATALOG,
    store::Store,
};

/// Department that owns the bootstrap admin account.
const ADMIN_DEPARTMENT: &str = "经理室";

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    let pool = MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    info!("Database ready");
    Ok(pool)
}

/// Ensures the catalog departments exist and, on an empty users table, creates
/// the admin account when a password is configured. Safe to run on every start.
pub async fn bootstrap(store: &dyn Store, config: &Config) -> Result<(), AppError> {
    let existing = store.list_departments().await?;
    for name in POSITION_CATALOG.keys() {
        if existing.iter().any(|d| d.name == *name) {
            continue;
        }
        match store.create_department(name).await {
            Ok(d) => info!(department_id = d.id, name = %d.name, "Department created"),
            // another instance won the race
            Err(AppError::Conflict(_)) => {}
            Err(e) => return Err(e),
        }
    }

    if store.has_users().await? {
        return Ok(());
    }

    let Some(password) = config.admin_password.as_deref() else {
        warn!("No users exist and ADMIN_PASSWORD is not set; nobody can log in");
        return Ok(());
    };

    let department_id = store
        .list_departments()
        .await?
        .into_iter()
        .find(|d| d.name == ADMIN_DEPARTMENT)
        .map(|d| d.id);

    let admin = store
        .create_user(NewUser {
            username: config.admin_username.clone(),
            password_hash: hash_password(password)?,
            is_admin: true,
            department_id,
        })
        .await?;
    info!(user_id = admin.id, username = %admin.username, "Admin account created");
    Ok(())
}
