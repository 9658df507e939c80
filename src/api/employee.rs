use actix_web::{HttpResponse, web};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    api::today,
    auth::auth::Principal,
    error::AppError,
    model::{
        employee::{EmployeeFields, EmployeeProfile},
        salary::{SalaryFigures, parse_month},
    },
    service::{
        employee::{self, CreateEmployeeInput, EmployeeDetail, NewEmployee},
        roster::{self, RosterPage, RosterQuery},
    },
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[schema(example = json!({
    "employee_code": "E0031",
    "name": "陈静",
    "gender": "女",
    "age": 29,
    "position": "会计",
    "department_id": 2,
    "month": "2024-05",
    "salary": {"base_salary": "2800.00", "benefits": "500.00", "bonus": "0", "insurance": "200.00", "housing_fund": "150.00"},
    "initial_password": "changeme"
}))]
pub struct CreateEmployee {
    pub employee_code: String,
    #[serde(flatten)]
    pub fields: EmployeeFields,
    /// `YYYY-MM`; defaults to the current month
    pub month: Option<String>,
    pub salary: SalaryFigures,
    /// Creates a login account named after the employee code
    pub initial_password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateEmployee {
    #[serde(flatten)]
    pub fields: EmployeeFields,
    /// Figures for the current month
    pub salary: SalaryFigures,
}

#[derive(Debug, Deserialize)]
pub struct RosterParams {
    pub department_id: Option<u64>,
    pub name: Option<String>,
    pub month: Option<String>,
    pub page: Option<u64>,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee, first salary row and optional account created", body = EmployeeProfile),
        (status = 400, description = "Invalid field or unknown department"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Employee code already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let month = match payload.month.as_deref() {
        Some(m) => parse_month(m)?,
        None => today(),
    };

    let input = CreateEmployeeInput {
        employee: NewEmployee {
            employee_code: payload.employee_code,
            fields: payload.fields,
        },
        month,
        salary: payload.salary,
        initial_password: payload.initial_password,
    };

    let profile = employee::create(state.store(), &state.departments, &principal, input).await?;
    Ok(HttpResponse::Created().json(profile))
}

/// Roster of active employees with their latest (or the requested month's) salary
#[utoipa::path(
    get,
    path = "/api/employees",
    params(
        ("department_id", Query, description = "Filter by department"),
        ("name", Query, description = "Case-insensitive substring of the name"),
        ("month", Query, description = "YYYY-MM; defaults to each employee's latest month"),
        ("page", Query, description = "Page number, 10 rows per page")
    ),
    responses(
        (status = 200, description = "Paginated roster", body = RosterPage),
        (status = 403, description = "Admin only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<RosterParams>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let month = query.month.as_deref().map(parse_month).transpose()?;

    let page = roster::roster(
        state.store(),
        &principal,
        &RosterQuery {
            department_id: query.department_id,
            name: query.name,
            month,
            page: query.page,
        },
    )
    .await?;
    Ok(HttpResponse::Ok().json(page))
}

/// Profile with the current month's salary
#[utoipa::path(
    get,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee id")),
    responses(
        (status = 200, description = "Employee detail", body = EmployeeDetail),
        (status = 403, description = "Neither admin nor the employee"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, AppError> {
    let detail = employee::detail(state.store(), &principal, path.into_inner(), today()).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// Update employee fields and the current month's salary
#[utoipa::path(
    put,
    path = "/api/employees/{id}",
    params(("id", Path, description = "Employee id")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Updated employee", body = EmployeeProfile),
        (status = 400, description = "Invalid field or unknown department"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    principal: Principal,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateEmployee>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let profile = employee::edit(
        state.store(),
        &state.departments,
        &principal,
        path.into_inner(),
        payload.fields,
        payload.salary,
        today(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(profile))
}
