use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{Executor, MySql, MySqlConnection, MySqlPool};
use tracing::debug;

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
        roster::{RosterEntry, RosterQuery},
        statistics::StatisticsFilter,
    },
    utils::db_utils::{SqlValue, WhereClause, bind_as, bind_scalar, like_contains},
};

const PROFILE_SELECT: &str = r#"
    SELECT e.id, e.employee_code, e.name, e.gender, e.age, e.position, e.is_active,
           e.department_id, d.name AS department_name
    FROM employees e
    JOIN departments d ON d.id = e.department_id
"#;

const SALARY_COLUMNS: &str =
    "s.id, s.employee_id, s.month, s.base_salary, s.benefits, s.bonus, s.insurance, s.housing_fund";

const RESIGNATION_COLUMNS: &str = "id, employee_id, resign_date, name, department, position, status";

pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

/// Roster row: salary columns are NULL when the LEFT JOIN finds no row.
#[derive(sqlx::FromRow)]
struct RosterRow {
    #[sqlx(flatten)]
    employee: Employee,
    department_name: String,
    salary_id: Option<u64>,
    month: Option<NaiveDate>,
    base_salary: Option<Decimal>,
    benefits: Option<Decimal>,
    bonus: Option<Decimal>,
    insurance: Option<Decimal>,
    housing_fund: Option<Decimal>,
}

impl From<RosterRow> for RosterEntry {
    fn from(row: RosterRow) -> Self {
        let salary = match (row.salary_id, row.month) {
            (Some(id), Some(month)) => Some(SalaryView::from(Salary {
                id,
                employee_id: row.employee.id,
                month,
                figures: SalaryFigures {
                    base_salary: row.base_salary.unwrap_or_default(),
                    benefits: row.benefits.unwrap_or_default(),
                    bonus: row.bonus.unwrap_or_default(),
                    insurance: row.insurance.unwrap_or_default(),
                    housing_fund: row.housing_fund.unwrap_or_default(),
                },
            })),
            _ => None,
        };

        RosterEntry {
            employee: row.employee,
            department_name: row.department_name,
            salary,
        }
    }
}

/// Maps a duplicate-key error (MySQL 23000) to `Conflict`, anything else to `Persistence`.
fn duplicate_as_conflict(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::conflict(message),
        _ => e.into(),
    }
}

async fn fetch_profile<'e, E>(executor: E, id: u64, lock: bool) -> Result<Option<EmployeeProfile>, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "{PROFILE_SELECT} WHERE e.id = ?{}",
        if lock { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, EmployeeProfile>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await
}

async fn upsert_salary_row(
    conn: &mut MySqlConnection,
    employee_id: u64,
    month: NaiveDate,
    f: &SalaryFigures,
) -> Result<Salary, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO salaries (employee_id, month, base_salary, benefits, bonus, insurance, housing_fund)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE
            base_salary = VALUES(base_salary),
            benefits = VALUES(benefits),
            bonus = VALUES(bonus),
            insurance = VALUES(insurance),
            housing_fund = VALUES(housing_fund)
        "#,
    )
    .bind(employee_id)
    .bind(month)
    .bind(f.base_salary)
    .bind(f.benefits)
    .bind(f.bonus)
    .bind(f.insurance)
    .bind(f.housing_fund)
    .execute(&mut *conn)
    .await?;

    let sql = format!("SELECT {SALARY_COLUMNS} FROM salaries s WHERE s.employee_id = ? AND s.month = ?");
    sqlx::query_as::<_, Salary>(&sql)
        .bind(employee_id)
        .bind(month)
        .fetch_one(&mut *conn)
        .await
}

async fn insert_user(conn: &mut MySqlConnection, user: &NewUser) -> AppResult<u64> {
    let result = sqlx::query(
        "INSERT INTO users (username, password, is_admin, department_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(user.is_admin)
    .bind(user.department_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| duplicate_as_conflict(e, "Username already exists"))?;

    Ok(result.last_insert_id())
}

async fn insert_resignation(
    conn: &mut MySqlConnection,
    profile: EmployeeProfile,
    resign_date: NaiveDate,
    status: ResignationStatus,
) -> Result<Resignation, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO resignations (employee_id, resign_date, name, department, position, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(profile.employee.id)
    .bind(resign_date)
    .bind(&profile.employee.name)
    .bind(&profile.department_name)
    .bind(&profile.employee.position)
    .bind(status.as_ref())
    .execute(&mut *conn)
    .await?;

    Ok(Resignation {
        id: result.last_insert_id(),
        employee_id: profile.employee.id,
        resign_date,
        name: profile.employee.name,
        department: profile.department_name,
        position: profile.employee.position,
        status,
    })
}

#[async_trait]
impl Store for MySqlStore {
    fn backend_tag(&self) -> &'static str {
        "mysql"
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, is_admin, department_id FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn has_users(&self) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_user(&mut conn, &user).await?;
        Ok(User {
            id,
            username: user.username,
            password: user.password_hash,
            is_admin: user.is_admin,
            department_id: user.department_id,
        })
    }

    async fn save_refresh_token(&self, user_id: u64, jti: &str, expires_at: i64) -> AppResult<()> {
        let expires_at = DateTime::from_timestamp(expires_at, 0)
            .ok_or_else(|| AppError::Internal(format!("invalid token expiry {expires_at}")))?
            .naive_utc();

        sqlx::query("INSERT INTO refresh_tokens (user_id, jti, expires_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(jti)
            .bind(expires_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn consume_refresh_token(&self, jti: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ? AND revoked = FALSE AND expires_at > UTC_TIMESTAMP()
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_departments(&self) -> AppResult<Vec<Department>> {
        let rows = sqlx::query_as::<_, Department>("SELECT id, name FROM departments ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create_department(&self, name: &str) -> AppResult<Department> {
        let result = sqlx::query("INSERT INTO departments (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(|e| duplicate_as_conflict(e, "Department already exists"))?;

        Ok(Department {
            id: result.last_insert_id(),
            name: name.to_string(),
        })
    }

    async fn find_employee(&self, id: u64) -> AppResult<Option<EmployeeProfile>> {
        Ok(fetch_profile(&self.pool, id, false).await?)
    }

    async fn find_employee_by_code(&self, code: &str) -> AppResult<Option<Employee>> {
        let employee = sqlx::query_as::<_, Employee>(
            r#"
            SELECT id, employee_code, name, gender, age, position, is_active, department_id
            FROM employees WHERE employee_code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(employee)
    }

    async fn create_employee(
        &self,
        employee: NewEmployee,
        month: NaiveDate,
        salary: SalaryFigures,
        account: Option<NewUser>,
    ) -> AppResult<EmployeeProfile> {
        let mut tx = self.pool.begin().await?;

        let fields = &employee.fields;
        let result = sqlx::query(
            r#"
            INSERT INTO employees (employee_code, name, gender, age, position, is_active, department_id)
            VALUES (?, ?, ?, ?, ?, TRUE, ?)
            "#,
        )
        .bind(&employee.employee_code)
        .bind(&fields.name)
        .bind(&fields.gender)
        .bind(fields.age)
        .bind(&fields.position)
        .bind(fields.department_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| duplicate_as_conflict(e, "Employee code already exists"))?;
        let id = result.last_insert_id();

        upsert_salary_row(&mut tx, id, month, &salary).await?;
        if let Some(account) = &account {
            insert_user(&mut tx, account).await?;
        }

        let profile = fetch_profile(&mut *tx, id, false)
            .await?
            .ok_or(AppError::NotFound("Employee"))?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn update_employee(
        &self,
        id: u64,
        fields: EmployeeFields,
        month: NaiveDate,
        salary: SalaryFigures,
    ) -> AppResult<Option<EmployeeProfile>> {
        let mut tx = self.pool.begin().await?;

        if fetch_profile(&mut *tx, id, true).await?.is_none() {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE employees
            SET name = ?, gender = ?, age = ?, position = ?, department_id = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.gender)
        .bind(fields.age)
        .bind(&fields.position)
        .bind(fields.department_id)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        upsert_salary_row(&mut tx, id, month, &salary).await?;

        let profile = fetch_profile(&mut *tx, id, false).await?;
        tx.commit().await?;
        Ok(profile)
    }

    async fn upsert_salary(&self, employee_id: u64, month: NaiveDate, salary: SalaryFigures) -> AppResult<Salary> {
        let mut conn = self.pool.acquire().await?;
        Ok(upsert_salary_row(&mut conn, employee_id, month, &salary).await?)
    }

    async fn salary_for_month(&self, employee_id: u64, month: NaiveDate) -> AppResult<Option<Salary>> {
        let sql = format!("SELECT {SALARY_COLUMNS} FROM salaries s WHERE s.employee_id = ? AND s.month = ?");
        let row = sqlx::query_as::<_, Salary>(&sql)
            .bind(employee_id)
            .bind(month)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn latest_salary(&self, employee_id: u64) -> AppResult<Option<Salary>> {
        let sql = format!(
            "SELECT {SALARY_COLUMNS} FROM salaries s WHERE s.employee_id = ? ORDER BY s.month DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, Salary>(&sql)
            .bind(employee_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn salary_history(&self, employee_id: u64) -> AppResult<Vec<Salary>> {
        let sql = format!("SELECT {SALARY_COLUMNS} FROM salaries s WHERE s.employee_id = ? ORDER BY s.month");
        let rows = sqlx::query_as::<_, Salary>(&sql)
            .bind(employee_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn roster(&self, query: &RosterQuery, offset: u64, limit: u64) -> AppResult<(Vec<RosterEntry>, u64)> {
        // ---------- WHERE ----------
        let mut filter = WhereClause::new();
        filter.push("e.is_active = TRUE", []);
        if let Some(department_id) = query.department_id {
            filter.push("e.department_id = ?", [SqlValue::U64(department_id)]);
        }
        if let Some(needle) = query.name_needle() {
            filter.push("LOWER(e.name) LIKE ?", [SqlValue::String(like_contains(&needle))]);
        }

        let count_sql = format!("SELECT COUNT(*) FROM employees e{}", filter.sql());
        let total: i64 = bind_scalar(sqlx::query_scalar(&count_sql), filter.values())
            .fetch_one(&self.pool)
            .await?;

        // ---------- salary month per employee ----------
        let mut values = Vec::new();
        let month_match = match query.month {
            Some(month) => {
                values.push(SqlValue::Date(month));
                "?"
            }
            None => "(SELECT MAX(m.month) FROM salaries m WHERE m.employee_id = e.id)",
        };
        values.extend_from_slice(filter.values());
        values.push(SqlValue::U64(limit));
        values.push(SqlValue::U64(offset));

        let sql = format!(
            r#"
            SELECT e.id, e.employee_code, e.name, e.gender, e.age, e.position, e.is_active,
                   e.department_id, d.name AS department_name,
                   s.id AS salary_id, s.month, s.base_salary, s.benefits, s.bonus,
                   s.insurance, s.housing_fund
            FROM employees e
            JOIN departments d ON d.id = e.department_id
            LEFT JOIN salaries s ON s.employee_id = e.id AND s.month = {month_match}
            {where_sql}
            ORDER BY e.department_id, COALESCE(s.base_salary, 0) DESC, e.id
            LIMIT ? OFFSET ?
            "#,
            where_sql = filter.sql(),
        );
        debug!(sql = %sql, "Roster query");

        let rows = bind_as(sqlx::query_as::<_, RosterRow>(&sql), &values)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows.into_iter().map(RosterEntry::from).collect(), total as u64))
    }

    async fn salary_records(&self, filter: &StatisticsFilter) -> AppResult<Vec<SalaryRecord>> {
        let mut clause = WhereClause::new();
        if let Some((from, to)) = filter.month_range()? {
            clause.push("s.month >= ? AND s.month < ?", [SqlValue::Date(from), SqlValue::Date(to)]);
        }
        if let Some(department) = &filter.department {
            clause.push("d.name = ?", [SqlValue::String(department.clone())]);
        }
        if let Some(position) = &filter.position {
            clause.push("e.position = ?", [SqlValue::String(position.clone())]);
        }

        let sql = format!(
            r#"
            SELECT e.name AS employee_name, e.department_id, d.name AS department_name, e.position,
                   {SALARY_COLUMNS}
            FROM salaries s
            JOIN employees e ON e.id = s.employee_id
            JOIN departments d ON d.id = e.department_id
            {where_sql}
            ORDER BY e.department_id, s.employee_id, s.month
            "#,
            where_sql = clause.sql(),
        );

        let rows = bind_as(sqlx::query_as::<_, SalaryRecord>(&sql), clause.values())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_resignation(&self, id: u64) -> AppResult<Option<Resignation>> {
        let sql = format!("SELECT {RESIGNATION_COLUMNS} FROM resignations WHERE id = ?");
        let row = sqlx::query_as::<_, Resignation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_resignations(
        &self,
        filter: &ResignationFilter,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<Resignation>, u64)> {
        let mut clause = WhereClause::new();
        if let Some(employee_id) = filter.employee_id {
            clause.push("employee_id = ?", [SqlValue::U64(employee_id)]);
        }
        if let Some(status) = filter.status {
            clause.push("status = ?", [SqlValue::String(status.to_string())]);
        }

        let count_sql = format!("SELECT COUNT(*) FROM resignations{}", clause.sql());
        let total: i64 = bind_scalar(sqlx::query_scalar(&count_sql), clause.values())
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {RESIGNATION_COLUMNS} FROM resignations{} ORDER BY id DESC LIMIT ? OFFSET ?",
            clause.sql()
        );
        let rows = bind_as(sqlx::query_as::<_, Resignation>(&sql), clause.values())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total as u64))
    }

    async fn create_resignation_application(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation> {
        let mut tx = self.pool.begin().await?;

        let profile = fetch_profile(&mut *tx, employee_id, true)
            .await?
            .ok_or(AppError::NotFound("Employee"))?;
        if !profile.employee.is_active {
            return Err(AppError::conflict("Employee is no longer active"));
        }

        let pending: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM resignations WHERE employee_id = ? AND status = ?",
        )
        .bind(employee_id)
        .bind(ResignationStatus::Pending.as_ref())
        .fetch_one(&mut *tx)
        .await?;
        if pending > 0 {
            return Err(AppError::conflict("A pending resignation already exists"));
        }

        let resignation = insert_resignation(&mut tx, profile, resign_date, ResignationStatus::Pending).await?;
        tx.commit().await?;
        Ok(resignation)
    }

    async fn review_resignation(&self, id: u64, decision: ReviewDecision) -> AppResult<Resignation> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {RESIGNATION_COLUMNS} FROM resignations WHERE id = ? FOR UPDATE");
        let mut resignation = sqlx::query_as::<_, Resignation>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(AppError::NotFound("Resignation"))?;

        let next = resignation.status.review(decision)?;
        if next == ResignationStatus::Approved {
            sqlx::query("UPDATE employees SET is_active = FALSE WHERE id = ?")
                .bind(resignation.employee_id)
                .execute(&mut *tx)
                .await?;
        }

        // guarded by the row lock above; the status check keeps the update idempotent
        let result = sqlx::query("UPDATE resignations SET status = ? WHERE id = ? AND status = ?")
            .bind(next.as_ref())
            .bind(id)
            .bind(ResignationStatus::Pending.as_ref())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::conflict("resignation was reviewed concurrently"));
        }

        tx.commit().await?;
        resignation.status = next;
        Ok(resignation)
    }

    async fn resign_employee(&self, employee_id: u64, resign_date: NaiveDate) -> AppResult<Resignation> {
        let mut tx = self.pool.begin().await?;

        let profile = fetch_profile(&mut *tx, employee_id, true)
            .await?
            .ok_or(AppError::NotFound("Employee"))?;
        if !profile.employee.is_active {
            return Err(AppError::conflict("Employee has already resigned"));
        }

        sqlx::query("UPDATE employees SET is_active = FALSE WHERE id = ?")
            .bind(employee_id)
            .execute(&mut *tx)
            .await?;

        let resignation = insert_resignation(&mut tx, profile, resign_date, ResignationStatus::Approved).await?;
        tx.commit().await?;
        Ok(resignation)
    }
}
