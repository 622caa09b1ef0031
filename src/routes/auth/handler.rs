use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{Identity, IssuedToken, Role, TokenCodec},
    error::AppError,
    models::{Mentor, NewMentor, NewStudent, NewUser, Student, User},
    utils::{
        digest_reset_token, hash_password, new_reset_token, optional_text, required,
        required_text, validate_email, validate_password, verify_password,
    },
};

use super::model::{
    ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
    RegisterResponse, ResetPasswordRequest, VerifyResponse,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn issue_token(
    codec: &TokenCodec,
    user_id: i32,
    role: Role,
) -> Result<IssuedToken, AppError> {
    codec
        .issue(user_id, role, None)
        .map_err(|e| AppError::Internal(format!("failed to issue token: {e}")))
}

/// 未单独提供姓/名时按空格拆分 `name`
fn split_name(name: &str) -> (Option<String>, Option<String>) {
    match name.split_once(' ') {
        Some((first, last)) => (Some(first.to_string()), optional_text(Some(last.to_string()))),
        None => (Some(name.to_string()), None),
    }
}

/// 注册学生或导师账号，用户与档案在同一事务中创建
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let email = required_text(req.email, "email")?.to_lowercase();
    validate_email(&email)?;
    let password = required(req.password, "password")?;
    validate_password(&password)?;
    let role: Role = required_text(req.role, "role")?
        .parse()
        .map_err(|e: crate::auth::UnknownRole| AppError::Validation(e.to_string()))?;
    if role == Role::Admin {
        return Err(AppError::Validation(
            "Role must be either student or mentor".into(),
        ));
    }
    let name = required_text(req.name, "name")?;

    // 先校验档案必填字段，再开事务
    let (registration_number, batch, department) = match role {
        Role::Student => (
            Some(required_text(req.registration_number, "registration_number")?),
            Some(required_text(req.batch, "batch")?),
            optional_text(req.department),
        ),
        _ => (None, None, Some(required_text(req.department, "department")?)),
    };

    let (default_first, default_last) = split_name(&name);
    let first_name = optional_text(req.first_name).or(default_first);
    let last_name = optional_text(req.last_name).or(default_last);
    let password_hash = hash_password(&password, state.config.bcrypt_cost)?;

    let mut tx = state.pool.begin().await?;
    let user = User::create(
        &mut tx,
        NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: first_name.as_deref(),
            last_name: last_name.as_deref(),
            role,
        },
    )
    .await?;

    let registration_number = match (role, registration_number, batch) {
        (Role::Student, Some(registration_number), Some(batch)) => {
            let student = Student::create(
                &mut tx,
                NewStudent {
                    user_id: user.id,
                    name,
                    registration_number,
                    batch,
                    department,
                    phone: optional_text(req.phone),
                    address: optional_text(req.address),
                    section: optional_text(req.section),
                    program: optional_text(req.program),
                },
            )
            .await?;
            Some(student.registration_number)
        }
        _ => {
            Mentor::create(
                &mut tx,
                NewMentor {
                    user_id: user.id,
                    name,
                    department: department.unwrap_or_default(),
                    designation: optional_text(req.designation),
                    max_students: req.max_students,
                    phone: optional_text(req.phone),
                },
            )
            .await?;
            None
        }
    };
    tx.commit().await?;

    tracing::info!(user_id = user.id, role = %role, "Registered user");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user_id: user.id,
            email: user.email,
            role,
            registration_number,
        }),
    ))
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let email = required_text(req.email, "email")?.to_lowercase();
    let password = required(req.password, "password")?;

    let mut conn = state.pool.acquire().await?;
    let user = User::find_by_email(&mut conn, &email)
        .await?
        .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.into()))?;

    if !verify_password(&password, &user.password_hash)? {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::Authentication(INVALID_CREDENTIALS.into()));
    }

    let registration_number = match user.role {
        Role::Student => Student::find_by_user_id(&mut conn, user.id)
            .await?
            .map(|s| s.registration_number),
        _ => None,
    };

    let token = issue_token(&state.codec, user.id, user.role)?;
    tracing::info!(user_id = user.id, role = %user.role, session_id = %token.identity.session_id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        email: user.email,
        registration_number,
    }))
}

/// 为当前调用方签发新会话令牌，角色以数据库为准
#[axum::debug_handler]
pub async fn refresh(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<IssuedToken>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let user = User::find_by_id(&mut conn, identity.user_id)
        .await?
        .ok_or_else(|| AppError::Authentication("User no longer exists".into()))?;

    let token = issue_token(&state.codec, user.id, user.role)?;
    Ok(Json(token))
}

#[axum::debug_handler]
pub async fn verify_role(
    Extension(identity): Extension<Identity>,
    Path(role): Path<String>,
) -> Result<Json<VerifyResponse>, AppError> {
    let expected: Role = role
        .parse()
        .map_err(|e: crate::auth::UnknownRole| AppError::Validation(e.to_string()))?;

    if identity.role != expected {
        return Err(AppError::RoleMismatch {
            expected,
            actual: identity.role,
        });
    }

    Ok(Json(VerifyResponse {
        valid: true,
        user_id: identity.user_id,
        role: identity.role,
        session_id: identity.session_id,
    }))
}

/// 生成重置令牌，明文只写入日志
#[axum::debug_handler]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let email = required_text(req.email, "email")?.to_lowercase();
    let token = new_reset_token();

    let mut conn = state.pool.acquire().await?;
    match User::set_reset_token(&mut conn, &email, &digest_reset_token(&token)).await? {
        Some(user_id) => tracing::info!(user_id, reset_token = %token, "Password reset token issued"),
        None => tracing::info!(email = %email, "Password reset requested for unknown email"),
    }

    Ok(Json(MessageResponse {
        message: "If the email is registered, a password reset token has been issued",
    }))
}

#[axum::debug_handler]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let token = required_text(req.token, "token")?;
    let new_password = required(req.new_password, "new_password")?;
    validate_password(&new_password)?;
    let password_hash = hash_password(&new_password, state.config.bcrypt_cost)?;

    let mut tx = state.pool.begin().await?;
    let user = User::find_by_reset_token(&mut tx, &digest_reset_token(&token))
        .await?
        .ok_or_else(|| AppError::Validation("Invalid or expired reset token".into()))?;
    User::update_password(&mut tx, user.id, &password_hash).await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, "Password reset completed");
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_name_uses_first_space() {
        assert_eq!(
            split_name("Ada Lovelace King"),
            (Some("Ada".into()), Some("Lovelace King".into()))
        );
        assert_eq!(split_name("Ada"), (Some("Ada".into()), None));
    }
}
