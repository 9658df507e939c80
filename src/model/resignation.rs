use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResignationStatus {
    Pending,
    Approved,
    Rejected,
}

impl TryFrom<String> for ResignationStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ResignationStatus {
    /// Transition table. Only pending applications can be reviewed.
    pub fn review(self, decision: ReviewDecision) -> AppResult<ResignationStatus> {
        match (self, decision) {
            (ResignationStatus::Pending, ReviewDecision::Approve) => Ok(ResignationStatus::Approved),
            (ResignationStatus::Pending, ReviewDecision::Reject) => Ok(ResignationStatus::Rejected),
            (current, _) => Err(AppError::conflict(format!(
                "resignation is already {current}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Resignation {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 12)]
    pub employee_id: u64,
    #[schema(value_type = String, format = "date", example = "2024-06-30")]
    pub resign_date: NaiveDate,

    // snapshot taken when the record is created
    #[schema(example = "张伟")]
    pub name: String,
    #[schema(example = "技术科")]
    pub department: String,
    #[schema(example = "工程师")]
    pub position: String,

    #[sqlx(try_from = "String")]
    pub status: ResignationStatus,
}
