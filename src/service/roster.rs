use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::Principal,
    error::AppResult,
    model::{employee::Employee, resignation::Resignation, salary::SalaryView},
    store::Store,
};

/// Fixed roster and listing page size.
pub const PAGE_SIZE: u64 = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RosterQuery {
    pub department_id: Option<u64>,
    /// Case-insensitive substring of the employee name
    pub name: Option<String>,
    /// First-of-month date; `None` selects each employee's latest month
    pub month: Option<NaiveDate>,
    pub page: Option<u64>,
}

impl RosterQuery {
    /// Trimmed, lowercased name filter; blank input means no filter.
    pub fn name_needle(&self) -> Option<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RosterEntry {
    pub employee: Employee,
    #[schema(example = "技术科")]
    pub department_name: String,
    /// Absent when the employee has no salary row for the selected month
    pub salary: Option<SalaryView>,
}

impl RosterEntry {
    fn sort_salary(&self) -> Decimal {
        self.salary
            .as_ref()
            .map(|s| s.figures.base_salary)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Department ascending, base salary descending (missing as 0), employee id ascending.
pub fn compare_entries(a: &RosterEntry, b: &RosterEntry) -> Ordering {
    a.employee
        .department_id
        .cmp(&b.employee.department_id)
        .then_with(|| b.sort_salary().cmp(&a.sort_salary()))
        .then_with(|| a.employee.id.cmp(&b.employee.id))
}

pub fn name_matches(name: &str, needle: &str) -> bool {
    name.to_lowercase().contains(needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub page_size: u64,
}

impl Pagination {
    /// 1-indexed; missing or zero pages become page 1.
    pub fn new(page: Option<u64>) -> Self {
        Pagination {
            page: page.unwrap_or(1).max(1),
            page_size: PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(self.page_size)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[aliases(RosterPage = Page<RosterEntry>, ResignationPage = Page<Resignation>)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub page_size: u64,
    #[schema(example = 25)]
    pub total: u64,
    #[schema(example = 3)]
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: Pagination, total: u64) -> Self {
        Page {
            data,
            page: pagination.page,
            page_size: pagination.page_size,
            total,
            total_pages: pagination.total_pages(total),
        }
    }
}

pub async fn roster(
    store: &dyn Store,
    principal: &Principal,
    query: &RosterQuery,
) -> AppResult<Page<RosterEntry>> {
    principal.require_admin()?;

    let pagination = Pagination::new(query.page);
    let (entries, total) = store
        .roster(query, pagination.offset(), pagination.page_size)
        .await?;

    tracing::debug!(
        page = pagination.page,
        total,
        returned = entries.len(),
        "Roster page served"
    );

    Ok(Page::new(entries, pagination, total))
}
