use crate::api::{
    department::{CreateDepartment, PositionGroup},
    employee::{CreateEmployee, UpdateEmployee},
    resignation::ApplyResignation,
};
use crate::auth::auth::Principal;
use crate::model::{
    department::Department,
    employee::{Employee, EmployeeFields, EmployeeProfile},
    resignation::{Resignation, ResignationStatus},
    salary::{SalaryFigures, SalaryView},
};
use crate::models::{LoginReqDto, TokenPair};
use crate::service::{
    aggregation::{GroupBy, GroupTotals, GroupedTotals, SalaryTotals, YearTotals},
    employee::{Dashboard, EmployeeDetail, SalaryHistory},
    roster::{ResignationPage, RosterEntry, RosterPage},
    statistics::StatisticsReport,
};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Salary Management API",
        version = "1.0.0",
        description = r#"
## Salary Management System

Manages employees, departments, monthly salaries and the resignation workflow of one organization.

### 🔹 Key Features
- **Employee Management**
  - Create and edit employees, roster of active employees with their latest salary
- **Salary Management**
  - Idempotent monthly salary upsert, per-employee history with yearly totals
- **Statistics**
  - Salary totals grouped by department, position, year or month
- **Resignation Management**
  - Apply, approve/reject, or resign an employee directly

### 🔐 Security
Endpoints under `/api` require a **JWT Bearer** access token obtained from `/auth/login`.
Administrative operations answer `403` with a `redirect` to the login entry point for other roles.

### 📦 Response Format
- JSON; money amounts are decimal strings
- List endpoints are paginated by 10

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::api::me::dashboard,

        crate::api::department::list_departments,
        crate::api::department::create_department,
        crate::api::department::list_positions,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,

        crate::api::salary::salary_history,
        crate::api::salary::upsert_salary,

        crate::api::statistics::salary_statistics,

        crate::api::resignation::apply_resignation,
        crate::api::resignation::list_resignations,
        crate::api::resignation::get_resignation,
        crate::api::resignation::approve_resignation,
        crate::api::resignation::reject_resignation,
        crate::api::resignation::resign_employee
    ),
    components(
        schemas(
            LoginReqDto,
            TokenPair,
            Principal,
            Dashboard,
            Department,
            CreateDepartment,
            PositionGroup,
            Employee,
            EmployeeFields,
            EmployeeProfile,
            EmployeeDetail,
            CreateEmployee,
            UpdateEmployee,
            RosterEntry,
            RosterPage,
            SalaryFigures,
            SalaryView,
            SalaryHistory,
            SalaryTotals,
            YearTotals,
            GroupBy,
            GroupTotals,
            GroupedTotals,
            StatisticsReport,
            Resignation,
            ResignationStatus,
            ResignationPage,
            ApplyResignation
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, token refresh and the caller's dashboard"),
        (name = "Department", description = "Departments and the position catalog"),
        (name = "Employee", description = "Employee management APIs"),
        (name = "Salary", description = "Monthly salary APIs"),
        (name = "Statistics", description = "Salary statistics APIs"),
        (name = "Resignation", description = "Resignation workflow APIs"),
    )
)]
pub struct ApiDoc;
