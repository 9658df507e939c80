use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::today,
    auth::auth::Principal,
    error::AppError,
    model::resignation::{Resignation, ResignationStatus, ReviewDecision},
    service::{resignation, roster::ResignationPage},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct ApplyResignation {
    /// Requested last day; defaults to today and cannot lie in the past
    #[schema(example = "2024-06-30", format = "date", value_type = String)]
    pub resign_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ResignationParams {
    pub status: Option<ResignationStatus>,
    pub page: Option<u64>,
}

/// Apply for resignation (employee self-service)
#[utoipa::path(
    post,
    path = "/api/resignations",
    request_body = ApplyResignation,
    responses(
        (status = 201, description = "Pending application created", body = Resignation),
        (status = 400, description = "Resign date in the past"),
        (status = 403, description = "Caller has no employee profile"),
        (status = 409, description = "Inactive employee or application already pending")
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn apply_resignation(
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Json<ApplyResignation>,
) -> Result<HttpResponse, AppError> {
    let created = resignation::apply(state.store(), &principal, payload.resign_date, today()).await?;
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/resignations",
    params(
        ("status", Query, description = "pending, approved or rejected"),
        ("page", Query, description = "Page number, 10 rows per page")
    ),
    responses(
        (status = 200, description = "Applications, newest first; employees see only their own", body = ResignationPage)
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn list_resignations(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<ResignationParams>,
) -> Result<HttpResponse, AppError> {
    let page = resignation::list(state.store(), &principal, query.status, query.page).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/resignations/{id}",
    params(("id", Path, description = "Resignation id")),
    responses(
        (status = 200, description = "Resignation", body = Resignation),
        (status = 403, description = "Neither admin nor the applicant"),
        (status = 404, description = "Resignation not found")
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn get_resignation(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let found = resignation::get(state.store(), &principal, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(found))
}

async fn review(
    principal: Principal,
    state: web::Data<AppState>,
    id: u64,
    decision: ReviewDecision,
) -> Result<HttpResponse, AppError> {
    let reviewed = resignation::review(state.store(), &principal, id, decision).await?;
    Ok(HttpResponse::Ok().json(reviewed))
}

/// Approve a pending resignation; the employee is deactivated
#[utoipa::path(
    put,
    path = "/api/resignations/{id}/approve",
    params(("id", Path, description = "Resignation id")),
    responses(
        (status = 200, description = "Approved", body = Resignation),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Resignation not found"),
        (status = 409, description = "Not pending")
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn approve_resignation(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    review(principal, state, path.into_inner(), ReviewDecision::Approve).await
}

/// Reject a pending resignation
#[utoipa::path(
    put,
    path = "/api/resignations/{id}/reject",
    params(("id", Path, description = "Resignation id")),
    responses(
        (status = 200, description = "Rejected", body = Resignation),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Resignation not found"),
        (status = 409, description = "Not pending")
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn reject_resignation(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    review(principal, state, path.into_inner(), ReviewDecision::Reject).await
}

/// Resign an employee directly (admin); recorded as approved
#[utoipa::path(
    post,
    path = "/api/employees/{id}/resign",
    params(("id", Path, description = "Employee id")),
    responses(
        (status = 201, description = "Employee deactivated", body = Resignation),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Employee already inactive")
    ),
    tag = "Resignation",
    security(("bearer_auth" = []))
)]
pub async fn resign_employee(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let created = resignation::resign_directly(state.store(), &principal, path.into_inner(), today()).await?;
    Ok(HttpResponse::Created().json(created))
}
