use crate::{
    auth::jwt::TokenSubject,
    error::{AppError, AppResult},
    model::role::Role,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// The authenticated caller of a request.
///
/// Produced by [`auth_middleware`](crate::auth::middleware::auth_middleware) from the
/// bearer access token and passed explicitly into every service operation.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Principal {
    pub user_id: u64,
    pub username: String,
    #[schema(value_type = String, example = "admin")]
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl From<TokenSubject> for Principal {
    fn from(subject: TokenSubject) -> Self {
        Principal {
            user_id: subject.user_id,
            username: subject.username,
            role: subject.role,
            employee_id: subject.employee_id,
        }
    }
}

impl FromRequest for Principal {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<Principal>()
                .cloned()
                .ok_or_else(|| AppError::Unauthorized("Missing token".into())),
        )
    }
}

impl Principal {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.role.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin only".into()))
        }
    }

    /// Admins may act on anyone; employees only on their own record.
    pub fn require_self_or_admin(&self, employee_id: u64) -> AppResult<()> {
        if self.role.is_admin() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Not allowed to access another employee".into()))
        }
    }

    /// The caller's own employee record, required for self-service operations.
    pub fn own_employee_id(&self) -> AppResult<u64> {
        self.employee_id
            .ok_or_else(|| AppError::Forbidden("No employee profile".into()))
    }
}
