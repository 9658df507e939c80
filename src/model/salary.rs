use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Upper bound (exclusive) of a DECIMAL(10,2) column.
const MAX_AMOUNT: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// The five stored salary components of one month.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct SalaryFigures {
    #[schema(value_type = String, example = "2500.00")]
    pub base_salary: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "800.00")]
    pub benefits: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "300.00")]
    pub bonus: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "250.00")]
    pub insurance: Decimal,
    #[serde(default)]
    #[schema(value_type = String, example = "400.00")]
    pub housing_fund: Decimal,
}

impl SalaryFigures {
    /// base + benefits + bonus - insurance - housing fund, exact.
    pub fn actual_salary(&self) -> Decimal {
        self.base_salary + self.benefits + self.bonus - self.insurance - self.housing_fund
    }

    pub fn validate(&self) -> AppResult<()> {
        for (field, value) in [
            ("base_salary", self.base_salary),
            ("benefits", self.benefits),
            ("bonus", self.bonus),
            ("insurance", self.insurance),
            ("housing_fund", self.housing_fund),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(AppError::validation(format!("{field} must not be negative")));
            }
            if value.normalize().scale() > 2 {
                return Err(AppError::validation(format!(
                    "{field} must have at most 2 decimal places"
                )));
            }
            if value >= MAX_AMOUNT {
                return Err(AppError::validation(format!("{field} is too large")));
            }
        }
        Ok(())
    }

    /// Every amount at the two-decimal scale of the salary columns.
    pub fn rescaled(self) -> Self {
        let cents = |mut value: Decimal| {
            value.rescale(2);
            value
        };
        SalaryFigures {
            base_salary: cents(self.base_salary),
            benefits: cents(self.benefits),
            bonus: cents(self.bonus),
            insurance: cents(self.insurance),
            housing_fund: cents(self.housing_fund),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Salary {
    pub id: u64,
    pub employee_id: u64,
    /// Always the first day of the month
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub month: NaiveDate,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub figures: SalaryFigures,
}

/// Salary row as returned to clients, with the derived actual salary.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SalaryView {
    pub id: u64,
    pub employee_id: u64,
    #[schema(value_type = String, format = "date", example = "2024-01-01")]
    pub month: NaiveDate,
    #[serde(flatten)]
    pub figures: SalaryFigures,
    #[schema(value_type = String, example = "2950.00")]
    pub actual_salary: Decimal,
}

impl From<Salary> for SalaryView {
    fn from(salary: Salary) -> Self {
        let actual_salary = salary.figures.actual_salary();
        SalaryView {
            id: salary.id,
            employee_id: salary.employee_id,
            month: salary.month,
            figures: salary.figures,
            actual_salary,
        }
    }
}

/// Normalizes any date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

/// Parses `YYYY-MM` or `YYYY-MM-DD` into a first-of-month date.
pub fn parse_month(value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    let parsed = if value.len() == 7 {
        NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d")
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
    };

    parsed
        .map(first_of_month)
        .map_err(|_| AppError::validation(format!("invalid month '{value}', expected YYYY-MM")))
}
