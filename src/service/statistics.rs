use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::auth::Principal,
    error::{AppError, AppResult},
    service::aggregation::{GroupBy, GroupedTotals, aggregate_by_group},
    store::Store,
};

/// Department name -> position titles that belong to it.
pub static POSITION_CATALOG: Lazy<BTreeMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    BTreeMap::from([
        ("经理室", &["总经理", "副总经理", "行政经理"][..]),
        ("财务科", &["会计", "出纳", "财务主管"][..]),
        ("技术科", &["工程师", "架构师", "技术总监"][..]),
        ("销售科", &["销售代表", "大区经理", "客户经理"][..]),
    ])
});

/// Rejects department/position combinations outside the catalog.
pub fn validate_department_position(department: Option<&str>, position: Option<&str>) -> AppResult<()> {
    match (department, position) {
        (Some(dept), Some(pos)) => match POSITION_CATALOG.get(dept) {
            Some(titles) if titles.contains(&pos) => Ok(()),
            Some(_) => Err(AppError::validation(format!(
                "position '{pos}' does not belong to department '{dept}'"
            ))),
            None => Err(AppError::validation(format!(
                "department '{dept}' has no position catalog"
            ))),
        },
        (None, Some(pos)) => {
            if POSITION_CATALOG.values().any(|titles| titles.contains(&pos)) {
                Ok(())
            } else {
                Err(AppError::validation(format!("unknown position '{pos}'")))
            }
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticsFilter {
    pub department: Option<String>,
    pub position: Option<String>,
    pub year: Option<i32>,
    /// First-of-month date
    pub month: Option<NaiveDate>,
}

impl StatisticsFilter {
    /// Half-open `[from, to)` month range selected by `year` and `month`.
    pub fn month_range(&self) -> AppResult<Option<(NaiveDate, NaiveDate)>> {
        let year_range = match self.year {
            Some(y) => Some((
                NaiveDate::from_ymd_opt(y, 1, 1),
                y.checked_add(1).and_then(|next| NaiveDate::from_ymd_opt(next, 1, 1)),
            )),
            None => None,
        };

        match (year_range, self.month) {
            (_, Some(month)) => {
                if let Some(y) = self.year {
                    if chrono::Datelike::year(&month) != y {
                        return Err(AppError::validation("month lies outside the requested year"));
                    }
                }
                let next = month
                    .checked_add_months(chrono::Months::new(1))
                    .ok_or_else(|| AppError::validation("month out of range"))?;
                Ok(Some((month, next)))
            }
            (Some((Some(from), Some(to))), None) => Ok(Some((from, to))),
            (Some(_), None) => Err(AppError::validation("year out of range")),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StatisticsReport {
    pub group_by: GroupBy,
    #[serde(flatten)]
    pub totals: GroupedTotals,
}

pub async fn statistics(
    store: &dyn Store,
    principal: &Principal,
    filter: &StatisticsFilter,
    group_by: GroupBy,
) -> AppResult<StatisticsReport> {
    principal.require_admin()?;
    validate_department_position(filter.department.as_deref(), filter.position.as_deref())?;
    filter.month_range()?;

    let records = store.salary_records(filter).await?;
    let totals = aggregate_by_group(&records, |r| group_by.key(r));

    tracing::debug!(
        ?group_by,
        records = records.len(),
        groups = totals.groups.len(),
        "Statistics computed"
    );

    Ok(StatisticsReport { group_by, totals })
}
