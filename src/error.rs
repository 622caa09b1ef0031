use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::auth::{Role, TokenError};
use crate::utils::error_codes;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Authentication(String),
    #[error("{} access required. Your role: {actual}", .expected.title())]
    RoleMismatch { expected: Role, actual: Role },
    #[error("{0}")]
    Authorization(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Too many requests, retry in {0} seconds")]
    RateLimited(u64),
    #[error("Database error: {0}")]
    Persistence(String),
    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: i32,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingField(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::RoleMismatch { .. } | AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            AppError::MissingField(_) | AppError::Validation(_) => error_codes::VALIDATION_ERROR,
            AppError::Authentication(_) => error_codes::AUTH_FAILED,
            AppError::RoleMismatch { .. } | AppError::Authorization(_) => {
                error_codes::PERMISSION_DENIED
            }
            AppError::NotFound(_) => error_codes::NOT_FOUND,
            AppError::Conflict(_) => error_codes::CONFLICT,
            AppError::RateLimited(_) => error_codes::RATE_LIMIT,
            AppError::Persistence(_) | AppError::Internal(_) => error_codes::INTERNAL_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        AppError::NotFound(format!("{what} not found"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            // 服务端错误细节只写日志
            AppError::Persistence(detail) | AppError::Internal(detail) => {
                tracing::error!(error = %detail, "Request failed");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            error,
            code: self.code(),
        });

        (status, body).into_response()
    }
}

/// 唯一约束名到用户可读的冲突信息
fn conflict_message(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("users_email_key") => "Email already registered",
        Some("students_registration_number_key") => "Registration number already exists",
        Some("students_user_id_key") => "Student profile already exists for this user",
        Some("mentors_user_id_key") => "Mentor profile already exists for this user",
        Some("mentor_assignments_registration_number_key") => {
            "Student is already assigned to a mentor"
        }
        Some("internships_registration_number_key") => "Internship details already submitted",
        Some("parents_registration_number_key") => "Parent information already exists",
        _ => "Resource already exists",
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(conflict_message(db.constraint()).into())
            }
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                AppError::NotFound("Referenced record not found".into())
            }
            sqlx::Error::Database(db) if db.is_check_violation() => AppError::Validation(format!(
                "Value violates constraint {}",
                db.constraint().unwrap_or("check")
            )),
            other => AppError::Persistence(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::Persistence(e.to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(e: bcrypt::BcryptError) -> Self {
        AppError::Internal(format!("password hashing failed: {e}"))
    }
}

impl From<TokenError> for AppError {
    fn from(e: TokenError) -> Self {
        AppError::Authentication(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_and_code() {
        let cases = [
            (AppError::MissingField("email"), StatusCode::BAD_REQUEST, 1000),
            (
                AppError::Authentication("x".into()),
                StatusCode::UNAUTHORIZED,
                1002,
            ),
            (
                AppError::Authorization("x".into()),
                StatusCode::FORBIDDEN,
                1003,
            ),
            (AppError::not_found("Student"), StatusCode::NOT_FOUND, 1004),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT, 1001),
            (AppError::RateLimited(60), StatusCode::TOO_MANY_REQUESTS, 1005),
            (
                AppError::Persistence("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
                5000,
            ),
        ];
        for (error, status, code) in cases {
            assert_eq!(error.status(), status);
            assert_eq!(error.code(), code);
        }
    }

    #[test]
    fn role_mismatch_names_both_roles() {
        let error = AppError::RoleMismatch {
            expected: Role::Admin,
            actual: Role::Mentor,
        };
        assert_eq!(error.to_string(), "Admin access required. Your role: mentor");
        assert_eq!(error.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn missing_field_names_the_field() {
        assert_eq!(
            AppError::MissingField("registration_number").to_string(),
            "Missing required field: registration_number"
        );
    }

    #[test]
    fn token_errors_are_authentication_failures() {
        let error: AppError = TokenError::MissingRole.into();
        assert_eq!(error.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn row_not_found_is_not_found() {
        let error: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        let error: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_messages_follow_constraint_names() {
        assert_eq!(
            conflict_message(Some("users_email_key")),
            "Email already registered"
        );
        assert_eq!(conflict_message(None), "Resource already exists");
    }
}
