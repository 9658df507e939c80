use actix_web::{HttpResponse, web};

use crate::{
    auth::auth::Principal,
    error::AppError,
    model::salary::{SalaryFigures, SalaryView, parse_month},
    service::employee::{self, SalaryHistory},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/employees/{id}/salaries",
    params(("id", Path, description = "Employee id")),
    responses(
        (status = 200, description = "Salary rows ordered by month plus yearly totals", body = SalaryHistory),
        (status = 403, description = "Neither admin nor the employee"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn salary_history(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let history = employee::salary_history(state.store(), &principal, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

/// Insert or replace the salary of one employee for one month
#[utoipa::path(
    put,
    path = "/api/employees/{id}/salaries/{month}",
    params(
        ("id", Path, description = "Employee id"),
        ("month", Path, description = "YYYY-MM")
    ),
    request_body = SalaryFigures,
    responses(
        (status = 200, description = "Stored salary row", body = SalaryView),
        (status = 400, description = "Negative or malformed amount, bad month"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Salary",
    security(("bearer_auth" = []))
)]
pub async fn upsert_salary(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<(u64, String)>,
    payload: web::Json<SalaryFigures>,
) -> Result<HttpResponse, AppError> {
    let (employee_id, month) = path.into_inner();
    let month = parse_month(&month)?;

    let view = employee::upsert_salary(state.store(), &principal, employee_id, month, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(view))
}
