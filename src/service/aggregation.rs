use std::collections::{BTreeMap, HashMap};

use chrono::Datelike;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::salary::{Salary, SalaryFigures};

/// One salary row joined with the employee attributes used as grouping keys.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct SalaryRecord {
    pub employee_name: String,
    pub department_id: u64,
    pub department_name: String,
    pub position: String,
    #[sqlx(flatten)]
    pub salary: Salary,
}

/// Sums of every salary component over a set of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct SalaryTotals {
    #[schema(value_type = String, example = "30000.00")]
    pub base_salary: Decimal,
    #[schema(value_type = String, example = "9600.00")]
    pub benefits: Decimal,
    #[schema(value_type = String, example = "3600.00")]
    pub bonus: Decimal,
    #[schema(value_type = String, example = "3000.00")]
    pub insurance: Decimal,
    #[schema(value_type = String, example = "4800.00")]
    pub housing_fund: Decimal,
    #[schema(value_type = String, example = "35400.00")]
    pub actual_salary: Decimal,
    #[schema(example = 12)]
    pub records: u64,
}

impl SalaryTotals {
    pub fn add(&mut self, figures: &SalaryFigures) {
        self.base_salary += figures.base_salary;
        self.benefits += figures.benefits;
        self.bonus += figures.bonus;
        self.insurance += figures.insurance;
        self.housing_fund += figures.housing_fund;
        self.actual_salary += figures.actual_salary();
        self.records += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GroupTotals {
    #[schema(example = "技术科")]
    pub key: String,
    pub totals: SalaryTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct GroupedTotals {
    /// Groups in the order their key first appears in the input
    pub groups: Vec<GroupTotals>,
    pub overall: SalaryTotals,
}

impl GroupedTotals {
    pub fn group(&self, key: &str) -> Option<&SalaryTotals> {
        self.groups.iter().find(|g| g.key == key).map(|g| &g.totals)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Department,
    Position,
    Year,
    Month,
}

impl GroupBy {
    pub fn key(self, record: &SalaryRecord) -> String {
        match self {
            GroupBy::Department => record.department_name.clone(),
            GroupBy::Position => record.position.clone(),
            GroupBy::Year => record.salary.month.year().to_string(),
            GroupBy::Month => record.salary.month.format("%Y-%m").to_string(),
        }
    }
}

pub fn aggregate_by_group<'a, I, F>(records: I, key: F) -> GroupedTotals
where
    I: IntoIterator<Item = &'a SalaryRecord>,
    F: Fn(&SalaryRecord) -> String,
{
    let mut result = GroupedTotals::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let k = key(record);
        let slot = *index.entry(k.clone()).or_insert_with(|| {
            result.groups.push(GroupTotals {
                key: k,
                totals: SalaryTotals::default(),
            });
            result.groups.len() - 1
        });

        result.groups[slot].totals.add(&record.salary.figures);
        result.overall.add(&record.salary.figures);
    }

    result
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct YearTotals {
    #[schema(example = 2023)]
    pub year: i32,
    pub totals: SalaryTotals,
}

/// Rolls one employee's salary rows up by calendar year, oldest first.
pub fn yearly_rollup(salaries: &[Salary]) -> Vec<YearTotals> {
    let mut years: BTreeMap<i32, SalaryTotals> = BTreeMap::new();
    for salary in salaries {
        years
            .entry(salary.month.year())
            .or_default()
            .add(&salary.figures);
    }

    years
        .into_iter()
        .map(|(year, totals)| YearTotals { year, totals })
        .collect()
}
