use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::auth::Principal,
    error::AppError,
    model::department::Department,
    service::{department, statistics::POSITION_CATALOG},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
pub struct CreateDepartment {
    #[schema(example = "人事科")]
    pub name: String,
}

#[derive(Serialize, ToSchema)]
pub struct PositionGroup {
    #[schema(example = "技术科")]
    pub department: String,
    #[schema(example = json!(["工程师", "架构师", "技术总监"]))]
    pub positions: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/api/departments",
    responses(
        (status = 200, description = "All departments", body = [Department]),
        (status = 401, description = "Missing or invalid token")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_departments(_principal: Principal, state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let departments = department::list(state.store(), &state.departments).await?;
    Ok(HttpResponse::Ok().json(departments.as_slice()))
}

#[utoipa::path(
    post,
    path = "/api/departments",
    request_body = CreateDepartment,
    responses(
        (status = 201, description = "Department created", body = Department),
        (status = 400, description = "Blank or too long name"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Name already taken")
    ),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn create_department(
    principal: Principal,
    state: web::Data<AppState>,
    payload: web::Json<CreateDepartment>,
) -> Result<HttpResponse, AppError> {
    let created = department::create(state.store(), &state.departments, &principal, &payload.name).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Position catalog used by the statistics filters
#[utoipa::path(
    get,
    path = "/api/positions",
    responses((status = 200, description = "Positions grouped by department", body = [PositionGroup])),
    tag = "Department",
    security(("bearer_auth" = []))
)]
pub async fn list_positions(_principal: Principal) -> HttpResponse {
    let groups: Vec<PositionGroup> = POSITION_CATALOG
        .iter()
        .map(|(department, positions)| PositionGroup {
            department: department.to_string(),
            positions: positions.iter().map(|p| p.to_string()).collect(),
        })
        .collect();
    HttpResponse::Ok().json(groups)
}
