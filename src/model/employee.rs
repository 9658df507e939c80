use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "E0001",
        "name": "张伟",
        "gender": "男",
        "age": 32,
        "position": "工程师",
        "is_active": true,
        "department_id": 3
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: u64,

    /// External employee code, also the login username of the linked account
    #[schema(example = "E0001")]
    pub employee_code: String,

    #[schema(example = "张伟")]
    pub name: String,

    #[schema(example = "男")]
    pub gender: String,

    #[schema(example = 32)]
    pub age: u32,

    #[schema(example = "工程师")]
    pub position: String,

    #[schema(example = true)]
    pub is_active: bool,

    #[schema(example = 3)]
    pub department_id: u64,
}

/// Employee joined with its department name.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
pub struct EmployeeProfile {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub employee: Employee,
    #[schema(example = "技术科")]
    pub department_name: String,
}

/// Editable employee attributes, shared by create and edit.
#[derive(Debug, Clone, PartialEq, Deserialize, ToSchema)]
pub struct EmployeeFields {
    #[schema(example = "张伟")]
    pub name: String,
    #[schema(example = "男")]
    pub gender: String,
    #[schema(example = 32)]
    pub age: u32,
    #[schema(example = "工程师")]
    pub position: String,
    #[schema(example = 3)]
    pub department_id: u64,
}

impl EmployeeFields {
    /// Text fields without surrounding whitespace, as they are stored.
    pub fn trimmed(self) -> Self {
        EmployeeFields {
            name: self.name.trim().to_string(),
            gender: self.gender.trim().to_string(),
            position: self.position.trim().to_string(),
            ..self
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        check_text("name", &self.name, 20)?;
        check_text("gender", &self.gender, 2)?;
        check_text("position", &self.position, 20)?;
        if !(16..=100).contains(&self.age) {
            return Err(AppError::validation("age must be between 16 and 100"));
        }
        Ok(())
    }
}

/// Validates a required text column against its VARCHAR width (in characters).
pub fn check_text(field: &str, value: &str, max_chars: usize) -> AppResult<()> {
    let len = value.trim().chars().count();
    if len == 0 {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if len > max_chars {
        return Err(AppError::validation(format!(
            "{field} must be at most {max_chars} characters"
        )));
    }
    Ok(())
}
