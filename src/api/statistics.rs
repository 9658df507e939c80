use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::{
    auth::auth::Principal,
    error::AppError,
    model::salary::parse_month,
    service::{
        aggregation::GroupBy,
        statistics::{self, StatisticsFilter, StatisticsReport},
    },
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct StatisticsParams {
    pub department: Option<String>,
    pub position: Option<String>,
    pub year: Option<i32>,
    pub month: Option<String>,
    pub group_by: Option<GroupBy>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[utoipa::path(
    get,
    path = "/api/statistics",
    params(
        ("department", Query, description = "Department name"),
        ("position", Query, description = "Position title; must belong to the department when both are given"),
        ("year", Query, description = "Calendar year"),
        ("month", Query, description = "YYYY-MM"),
        ("group_by", Query, description = "department (default), position, year or month")
    ),
    responses(
        (status = 200, description = "Per-group and overall salary totals", body = StatisticsReport),
        (status = 400, description = "Position outside the department's catalog"),
        (status = 403, description = "Admin only")
    ),
    tag = "Statistics",
    security(("bearer_auth" = []))
)]
pub async fn salary_statistics(
    principal: Principal,
    state: web::Data<AppState>,
    query: web::Query<StatisticsParams>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = StatisticsFilter {
        department: non_blank(query.department),
        position: non_blank(query.position),
        year: query.year,
        month: query.month.as_deref().map(parse_month).transpose()?,
    };

    let report = statistics::statistics(
        state.store(),
        &principal,
        &filter,
        query.group_by.unwrap_or_default(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(report))
}
