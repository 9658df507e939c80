//! In-memory [`Store`] for tests, with one-shot failure injection.
//!
//! Multi-row operations snapshot the whole state and restore it on error, which
//! gives them the same all-or-nothing behavior as a database transaction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::Store;
use crate::{
    error::{AppError, AppResult},
    model::{
        department::Department,
        employee::{Employee, EmployeeFields, EmployeeProfile},
        resignation::{Resignation, ResignationStatus, ReviewDecision},
        salary::{Salary, SalaryFigures, SalaryView},
        user::{NewUser, User},
    },
    service::{
        aggregation::SalaryRecord,
        employee::NewEmployee,
        resignation::ResignationFilter,
        roster::{RosterEntry, RosterQuery, compare_entries, name_matches},
        statistics::StatisticsFilter,
    },
};

/// Places inside multi-row operations where an injected failure can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    /// After the employee row was deactivated, before the resignation row is written
    AfterDeactivation,
    /// After the employee row was inserted, before its salary row
    AfterEmployeeInsert,
}

#[derive(Debug, Clone, Default)]
struct State {
    next_id: u64,
    departments: Vec<Department>,
    employees: Vec<Employee>,
    salaries: Vec<Salary>,
    resignations: Vec<Resignation>,
    users: Vec<User>,
    /// jti -> revoked
    refresh_tokens: HashMap<String, bool>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn department_name(&self, id: u64) -> String {
        self.departments
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.clone())
            .unwrap_or_default()
    }

    fn profile(&self, id: u64) -> Option<EmployeeProfile> {
        self.employees.iter().find(|e| e.id == id).map(|e| EmployeeProfile {
            employee: e.clone(),
            department_name: self.department_name(e.department_id),
        })
    }

    fn employee_mut(&mut self, id: u64) -> AppResult<&mut Employee> {
        self.employees
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(AppError::NotFound("Employee"))
    }

    fn upsert_salary(&mut self, employee_id: u64, month: NaiveDate, figures: SalaryFigures) -> Salary {
        if let Some(existing) = self
            .salaries
            .iter_mut()
            .find(|s| s.employee_id == employee_id && s.month == month)
        {
            existing.figures = figures;
            return existing.clone();
        }

        let salary = Salary {
            id: self.next_id(),
            employee_id,
            month,
            figures,
        };
        self.salaries.push(salary.clone());
        salary
    }

    fn latest_salary(&self, employee_id: u64) -> Option<&Salary> {
        self.salaries
            .iter()
            .filter(|s| s.employee_id == employee_id)
            .max_by_key(|s| s.month)
    }

    fn snapshot_resignation(
        &mut self,
        employee_id: u64,
        resign_date: NaiveDate,
        status: ResignationStatus,
    ) -> AppResult<Resignation> {
        let profile = self.profile(employee_id).ok_or(AppError::NotFound("Employee"))?;
        let resignation = Resignation {
            id: self.next_id(),
            employee_id,
            resign_date,
            name: profile.employee.name,
            department: profile.department_name,
            position: profile.employee.position,
            status,
        };
        self.resignations.push(resignation.clone());
        Ok(resignation)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_point: RwLock<Option<FailPoint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a failure that fires the next time `point` is reached.
    pub fn fail_at(&self, point: FailPoint) {
        *self.fail_point.write().expect("fail point poisoned") = Some(point);
    }

    fn trip(&self, point: FailPoint) -> AppResult<()> {
        let mut armed = self.fail_point.write().expect("fail point poisoned");
        if *armed == Some(point) {
            *armed = None;
            return Err(AppError::Persistence(format!("injected failure at {point:?}")));
        }
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&State) -> T) -> T {
        f(&self.state.read().expect("memory store poisoned"))
    }

    /// Runs `f` against the state; on error every change it made is discarded.
    fn atomically<T>(&self, f: impl FnOnce(&mut State) -> AppResult<T>) -> AppResult<T> {
        let mut state = self.state.write().expect("memory store poisoned");
        let snapshot = state.clone();
        let result = f(&mut state);
        if result.is_err() {
            *state = snapshot;
        }
        result
    }

    pub fn seed_department(&self, name: &str) -> u64 {
        self.atomically(|s| {
            let id = s.next_id();
            s.departments.push(Department {
                id,
                name: name.to_string(),
            });
            Ok(id)
        })
        .expect("seed department")
    }

    pub fn seed_employee(&self, name: &str, position: &str, department_id: u64, is_active: bool) -> u64 {
        self.atomically(|s| {
            let id = s.next_id();
            s.employees.push(Employee {
                id,
                employee_code: format!("E{id:04}"),
                name: name.to_string(),
                gender: "男".into(),
                age: 30,
                position: position.to_string(),
                is_active,
                department_id,
            });
            Ok(id)
        })
        .expect("seed employee")
    }

    pub fn seed_salary(&self, employee_id: u64, month: NaiveDate, figures: SalaryFigures) {
        self.atomically(|s| Ok(s.upsert_salary(employee_id, month, figures)))
            .expect("seed salary");
    }

    pub fn employee(&self, id: u64) -> Employee {
        self.read(|s| s.employees.iter().find(|e| e.id == id).cloned())
            .expect("employee exists")
    }

    pub fn salaries_of(&self, employee_id: u64) -> Vec<Salary> {
        self.read(|s| {
            s.salaries
                .iter()
                .filter(|x| x.employee_id == employee_id)
                .cloned()
                .collect()
        })
    }

    pub fn resignation(&self, id: u64) -> Resignation {
        self.read(|s| s.resignations.iter().find(|r| r.id == id).cloned())
            .expect("resignation exists")
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self.read(|s| s.users.iter().find(|u| u.username == username).cloned()))
    }

    async fn has_users(&self) -> AppResult<bool> {
        Ok(self.read(|s| !s.users.is_empty()))
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        self.atomically(|s| insert_user(s, user))
    }

    async fn save_refresh_token(&self, _user_id: u64, jti: &str, _expires_at: i64) -> AppResult<()> {
        self.atomically(|s| {
            s.refresh_tokens.insert(jti.to_string(), false);
            Ok(())
        })
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<bool> {
        self.atomically(|s| match s.refresh_tokens.get_mut(jti) {
            Some(revoked) if !*revoked => {
                *revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        })
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        Ok(self.read(|s| s.departments.clone()))
    }

    async fn create_department(&self, name: &str) -> AppResult<Department> {
        self.atomically(|s| {
            if s.departments.iter().any(|d| d.name == name) {
                return Err(AppError::conflict("Department already exists"));
            }
            let department = Department {
                id: s.next_id(),
                name: name.to_string(),
            };
            s.departments.push(department.clone());
            Ok(department)
        })
    }

    async fn find_employee(&self, id: u64) -> AppResult<Option<EmployeeProfile>> {
        Ok(self.read(|s| s.profile(id)))
    }

    async fn find_employee_by_code(&self, code: &str) -> AppResult<Option<Employee>> {
        Ok(self.read(|s| s.employees.iter().find(|e| e.employee_code == code).cloned()))
    }

    async fn create_employee(
        &self,
        employee: NewEmployee,
        month: NaiveDate,
        salary: SalaryFigures,
        account: Option<NewUser>,
    ) -> AppResult<EmployeeProfile> {
        self.atomically(|s| {
            if s.employees.iter().any(|e| e.employee_code == employee.employee_code) {
                return Err(AppError::conflict("Employee code already exists"));
            }
            let id = s.next_id();
            s.employees.push(Employee {
                id,
                employee_code: employee.employee_code,
                name: employee.fields.name,
                gender: employee.fields.gender,
                age: employee.fields.age,
                position: employee.fields.position,
                is_active: true,
                department_id: employee.fields.department_id,
            });
            self.trip(FailPoint::AfterEmployeeInsert)?;

            s.upsert_salary(id, month, salary);
            if let Some(account) = account {
                insert_user(s, account)?;
            }
            s.profile(id).ok_or(AppError::NotFound("Employee"))
        })
    }

    async fn update_employee(
        &self,
        id: u64,
        fields: EmployeeFields,
        month: NaiveDate,
        salary: SalaryFigures,
    ) -> AppResult<Option<EmployeeProfile>> {
        self.atomically(|s| {
            let Some(employee) = s.employees.iter_mut().find(|e| e.id == id) else {
                return Ok(None);
            };
            employee.name = fields.name;
            employee.gender = fields.gender;
            employee.age = fields.age;
            employee.position = fields.position;
            employee.department_id = fields.department_id;

            s.upsert_salary(id, month, salary);
            Ok(s.profile(id))
        })
    }

    async fn upsert_salary(&self, employee_id: u64, month: NaiveDate, salary: SalaryFigures) -> AppResult<Salary> {
        self.atomically(|s| Ok(s.upsert_salary(employee_id, month, salary)))
    }

    async fn salary_for_month(&self, employee_id: u64, month: NaiveDate) -> AppResult<Option<Salary>> {
        Ok(self.read(|s| {
            s.salaries
                .iter()
                .find(|x| x.employee_id == employee_id && x.month == month)
                .cloned()
        }))
    }

    async fn latest_salary(&self, employee_id: u64) -> AppResult<Option<Salary>> {
        Ok(self.read(|s| s.latest_salary(employee_id).cloned()))
    }

    async fn salary_history(&self, employee_id: u64) -> AppResult<Vec<Salary>> {
        let mut rows = self.salaries_of(employee_id);
        rows.sort_by_key(|s| s.month);
        Ok(rows)
    }

    async fn roster(&self, query: &RosterQuery, offset: u64, limit: u64) -> AppResult<(Vec<RosterEntry>, u64)> {
        let needle = query.name_needle();
        let mut entries: Vec<RosterEntry> = self.read(|s| {
            s.employees
                .iter()
                .filter(|e| e.is_active)
                .filter(|e| query.department_id.is_none_or(|d| e.department_id == d))
                .filter(|e| needle.as_deref().is_none_or(|n| name_matches(&e.name, n)))
                .map(|e| {
                    let salary = match query.month {
                        Some(month) => s
                            .salaries
                            .iter()
                            .find(|x| x.employee_id == e.id && x.month == month),
                        None => s.latest_salary(e.id),
                    };
                    RosterEntry {
                        employee: e.clone(),
                        department_name: s.department_name(e.department_id),
                        salary: salary.cloned().map(SalaryView::from),
                    }
                })
                .collect()
        });

        entries.sort_by(compare_entries);
        let total = entries.len() as u64;
        let page = entries
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn salary_records(&self, filter: &StatisticsFilter) -> AppResult<Vec<SalaryRecord>> {
        let range = filter.month_range()?;
        let mut records: Vec<SalaryRecord> = self.read(|s| {
            s.salaries
                .iter()
                .filter(|x| range.is_none_or(|(from, to)| x.month >= from && x.month < to))
                .filter_map(|x| {
                    let e = s.employees.iter().find(|e| e.id == x.employee_id)?;
                    Some(SalaryRecord {
                        employee_name: e.name.clone(),
                        department_id: e.department_id,
                        department_name: s.department_name(e.department_id),
                        position: e.position.clone(),
                        salary: x.clone(),
                    })
                })
                .filter(|r| filter.department.as_ref().is_none_or(|d| &r.department_name == d))
                .filter(|r| filter.position.as_ref().is_none_or(|p| &r.position == p))
                .collect()
        });

        records.sort_by_key(|r| (r.department_id, r.salary.employee_id, r.salary.month));
        Ok(records)
    }

    async fn find_resignation(&self, id: u64) -> AppResult<Option<Resignation>> {
        Ok(self.read(|s| s.resignations.iter().find(|r| r.id == id).cloned()))
    }

    async fn list_resignations(
        &self,
        filter: &ResignationFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Resignation>, u64)> {
        let mut rows: Vec<Resignation> = self.read(|s| {
            s.resignations
                .iter()
                .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
                .filter(|r| filter.status.is_none_or(|st| r.status == st))
                .cloned()
                .collect()
        });
        rows.sort_by(|a, b| b.id.cmp(&a.id));

        let total = rows.len() as u64;
        let page = rows.into_iter().skip(usize::try_from(offset).unwrap_or(usize::MAX)).take(limit as usize).collect();
        Ok((page, total))
    }

    async fn create_resignation_application(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation> {
        self.atomically(|s| {
            if !s.employee_mut(employee_id)?.is_active {
                return Err(AppError::conflict("Employee is no longer active"));
            }
            if s.resignations
                .iter()
                .any(|r| r.employee_id == employee_id && r.status == ResignationStatus::Pending)
            {
                return Err(AppError::conflict("A pending resignation already exists"));
            }
            s.snapshot_resignation(employee_id, resign_date, ResignationStatus::Pending)
        })
    }

    async fn review_resignation(&self, id: u64, decision: ReviewDecision) -> AppResult<Resignation> {
        self.atomically(|s| {
            let resignation = s
                .resignations
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(AppError::NotFound("Resignation"))?;
            let next = resignation.status.review(decision)?;
            let employee_id = resignation.employee_id;

            if next == ResignationStatus::Approved {
                s.employee_mut(employee_id)?.is_active = false;
                self.trip(FailPoint::AfterDeactivation)?;
            }

            let resignation = s
                .resignations
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(AppError::NotFound("Resignation"))?;
            resignation.status = next;
            Ok(resignation.clone())
        })
    }

    async fn resign_employee(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation> {
        self.atomically(|s| {
            let employee = s.employee_mut(employee_id)?;
            if !employee.is_active {
                return Err(AppError::conflict("Employee has already resigned"));
            }
            employee.is_active = false;
            self.trip(FailPoint::AfterDeactivation)?;

            s.snapshot_resignation(employee_id, resign_date, ResignationStatus::Approved)
        })
    }
}

fn insert_user(state: &mut State, user: NewUser) -> AppResult<User> {
    if state.users.iter().any(|u| u.username == user.username) {
        return Err(AppError::conflict("Username already exists"));
    }
    let user = User {
        id: state.next_id(),
        username: user.username,
        password: user.password_hash,
        is_admin: user.is_admin,
        department_id: user.department_id,
    };
    state.users.push(user.clone());
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn refresh_tokens_are_single_use() {
        let store = MemoryStore::new();
        store.save_refresh_token(1, "jti-1", 0).await.unwrap();

        assert!(store.consume_refresh_token("jti-1").await.unwrap());
        assert!(!store.consume_refresh_token("jti-1").await.unwrap());
        assert!(!store.consume_refresh_token("unknown").await.unwrap());
    }

    #[actix_web::test]
    async fn salary_records_respect_month_range() {
        let store = MemoryStore::new();
        let dept = store.seed_department("技术科");
        let id = store.seed_employee("甲", "工程师", dept, true);
        for m in [11, 12] {
            store.seed_salary(id, NaiveDate::from_ymd_opt(2023, m, 1).unwrap(), SalaryFigures::default());
        }
        store.seed_salary(id, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), SalaryFigures::default());

        let filter = StatisticsFilter {
            year: Some(2023),
            ..Default::default()
        };
        assert_eq!(store.salary_records(&filter).await.unwrap().len(), 2);
        assert_eq!(store.salary_records(&StatisticsFilter::default()).await.unwrap().len(), 3);
    }
}
