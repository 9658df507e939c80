use actix_web::{HttpResponse, web};

use crate::{
    auth::auth::Principal,
    error::AppError,
    service::employee::{self, Dashboard},
    state::AppState,
};

/// Caller's identity, own profile and latest salary
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Dashboard of the caller", body = Dashboard),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Auth",
    security(("bearer_auth" = []))
)]
pub async fn dashboard(principal: Principal, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let dashboard = employee::dashboard(state.store(), &principal).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
