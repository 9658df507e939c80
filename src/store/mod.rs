//! Persistence seam.
//!
//! Every operation that writes more than one row is a single method here so that
//! implementations can run it inside one transaction: either every write commits
//! or none does.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::{
    error::AppResult,
    model::{
        department::Department,
        employee::{Employee, EmployeeFields, EmployeeProfile},
        resignation::{Resignation, ReviewDecision},
        salary::{Salary, SalaryFigures},
        user::{NewUser, User},
    },
    service::{
        aggregation::SalaryRecord, employee::NewEmployee, resignation::ResignationFilter,
        roster::{RosterEntry, RosterQuery}, statistics::StatisticsFilter,
    },
};

#[cfg(test)]
pub mod memory;
pub mod mysql;

#[async_trait]
pub trait Store: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    // ---------- users & tokens ----------
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn has_users(&self) -> AppResult<bool>;
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
    async fn save_refresh_token(&self, user_id: u64, jti: &str, expires_at: i64) -> AppResult<()>;
    /// Revokes a live refresh token; false when it is unknown or already revoked.
    async fn consume_refresh_token(&self, jti: &str) -> AppResult<bool>;

    // ---------- departments ----------
    async fn list_departments(&self) -> AppResult<Vec<Department>>;
    async fn create_department(&self, name: &str) -> AppResult<Department>;

    // ---------- employees ----------
    async fn find_employee(&self, id: u64) -> AppResult<Option<EmployeeProfile>>;
    async fn find_employee_by_code(&self, code: &str) -> AppResult<Option<Employee>>;
    /// Employee row, its first salary row and the optional login account, atomically.
    async fn create_employee(
        &self,
        employee: NewEmployee,
        month: NaiveDate,
        salary: SalaryFigures,
        account: Option<NewUser>,
    ) -> AppResult<EmployeeProfile>;
    /// Field update plus salary upsert for `month`, atomically. `None` if absent.
    async fn update_employee(
        &self,
        id: u64,
        fields: EmployeeFields,
        month: NaiveDate,
        salary: SalaryFigures,
    ) -> AppResult<Option<EmployeeProfile>>;

    // ---------- salaries ----------
    /// Insert or update in place the row identified by (employee, month).
    async fn upsert_salary(&self, employee_id: u64, month: NaiveDate, salary: SalaryFigures) -> AppResult<Salary>;
    async fn salary_for_month(&self, employee_id: u64, month: NaiveDate) -> AppResult<Option<Salary>>;
    async fn latest_salary(&self, employee_id: u64) -> AppResult<Option<Salary>>;
    /// All rows of one employee ordered by month.
    async fn salary_history(&self, employee_id: u64) -> AppResult<Vec<Salary>>;
    /// One roster page and the total number of matching employees.
    async fn roster(&self, query: &RosterQuery, offset: u64, limit: u64) -> AppResult<(Vec<RosterEntry>, u64)>;
    /// Salary rows joined with their employee, ordered by department, employee, month.
    async fn salary_records(&self, filter: &StatisticsFilter) -> AppResult<Vec<SalaryRecord>>;

    // ---------- resignations ----------
    async fn find_resignation(&self, id: u64) -> AppResult<Option<Resignation>>;
    async fn list_resignations(
        &self,
        filter: &ResignationFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Resignation>, u64)>;
    /// Pending application with a snapshot of the employee.
    async fn create_resignation_application(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation>;
    /// Applies the transition table; approval also deactivates the employee.
    async fn review_resignation(&self, id: u64, decision: ReviewDecision) -> AppResult<Resignation>;
    /// Deactivates the employee and records an already approved resignation.
    async fn resign_employee(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation>;
}
