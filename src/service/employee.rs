use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    auth::{auth::Principal, password::hash_password},
    error::{AppError, AppResult},
    model::{
        employee::{EmployeeFields, EmployeeProfile, check_text},
        salary::{SalaryFigures, SalaryView, first_of_month},
        user::NewUser,
    },
    service::{
        aggregation::{YearTotals, yearly_rollup},
        department,
    },
    store::Store,
    utils::department_cache::DepartmentCache,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NewEmployee {
    pub employee_code: String,
    pub fields: EmployeeFields,
}

/// Profile plus the current month's salary (zeros when no row exists yet).
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EmployeeDetail {
    #[serde(flatten)]
    pub profile: EmployeeProfile,
    #[schema(value_type = String, format = "date", example = "2024-05-01")]
    pub month: NaiveDate,
    pub salary: SalaryFigures,
    #[schema(value_type = String, example = "2950.00")]
    pub actual_salary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryHistory {
    pub employee_id: u64,
    pub salaries: Vec<SalaryView>,
    pub yearly: Vec<YearTotals>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Dashboard {
    pub principal: Principal,
    pub employee: Option<EmployeeProfile>,
    pub latest_salary: Option<SalaryView>,
}

pub struct CreateEmployeeInput {
    pub employee: NewEmployee,
    pub month: NaiveDate,
    pub salary: SalaryFigures,
    pub initial_password: Option<String>,
}

pub async fn create(
    store: &dyn Store,
    departments: &DepartmentCache,
    principal: &Principal,
    mut input: CreateEmployeeInput,
) -> AppResult<EmployeeProfile> {
    principal.require_admin()?;
    input.employee.employee_code = input.employee.employee_code.trim().to_string();
    check_text("employee_code", &input.employee.employee_code, 20)?;
    input.employee.fields = input.employee.fields.trimmed();
    input.employee.fields.validate()?;
    input.salary.validate()?;
    input.salary = input.salary.rescaled();
    let dept = department::ensure_exists(store, departments, input.employee.fields.department_id).await?;

    let account = match input.initial_password.as_deref() {
        Some(password) if password.is_empty() => {
            return Err(AppError::validation("initial_password must not be empty"));
        }
        Some(password) => Some(NewUser {
            username: input.employee.employee_code.clone(),
            password_hash: hash_password(password)?,
            is_admin: false,
            department_id: Some(dept.id),
        }),
        None => None,
    };

    let profile = store
        .create_employee(input.employee, first_of_month(input.month), input.salary, account)
        .await?;

    info!(
        employee_id = profile.employee.id,
        code = %profile.employee.employee_code,
        department = %profile.department_name,
        "Employee created"
    );
    Ok(profile)
}

/// Updates the employee and upserts the salary of the month containing `today`.
pub async fn edit(
    store: &dyn Store,
    departments: &DepartmentCache,
    principal: &Principal,
    id: u64,
    fields: EmployeeFields,
    salary: SalaryFigures,
    today: NaiveDate,
) -> AppResult<EmployeeProfile> {
    principal.require_admin()?;
    let fields = fields.trimmed();
    fields.validate()?;
    salary.validate()?;
    let salary = salary.rescaled();
    department::ensure_exists(store, departments, fields.department_id).await?;

    let profile = store
        .update_employee(id, fields, first_of_month(today), salary)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    info!(employee_id = id, "Employee updated");
    Ok(profile)
}

pub async fn upsert_salary(
    store: &dyn Store,
    principal: &Principal,
    employee_id: u64,
    month: NaiveDate,
    figures: SalaryFigures,
) -> AppResult<SalaryView> {
    principal.require_admin()?;
    figures.validate()?;
    let figures = figures.rescaled();
    store
        .find_employee(employee_id)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    let salary = store
        .upsert_salary(employee_id, first_of_month(month), figures)
        .await?;
    info!(employee_id, month = %salary.month, "Salary upserted");
    Ok(salary.into())
}

pub async fn detail(
    store: &dyn Store,
    principal: &Principal,
    id: u64,
    today: NaiveDate,
) -> AppResult<EmployeeDetail> {
    principal.require_self_or_admin(id)?;

    let profile = store
        .find_employee(id)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    let month = first_of_month(today);
    let salary = store
        .salary_for_month(id, month)
        .await?
        .map(|s| s.figures)
        .unwrap_or_default();

    Ok(EmployeeDetail {
        profile,
        month,
        actual_salary: salary.actual_salary(),
        salary,
    })
}

pub async fn salary_history(store: &dyn Store, principal: &Principal, id: u64) -> AppResult<SalaryHistory> {
    principal.require_self_or_admin(id)?;
    store
        .find_employee(id)
        .await?
        .ok_or(AppError::NotFound("Employee"))?;

    let rows = store.salary_history(id).await?;
    let yearly = yearly_rollup(&rows);

    Ok(SalaryHistory {
        employee_id: id,
        salaries: rows.into_iter().map(SalaryView::from).collect(),
        yearly,
    })
}

pub async fn dashboard(store: &dyn Store, principal: &Principal) -> AppResult<Dashboard> {
    let (employee, latest_salary) = match principal.employee_id {
        Some(id) => (
            store.find_employee(id).await?,
            store.latest_salary(id).await?.map(SalaryView::from),
        ),
        None => (None, None),
    };

    Ok(Dashboard {
        principal: principal.clone(),
        employee,
        latest_salary,
    })
}
