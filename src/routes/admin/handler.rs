use axum::{
    extract::{Extension, Json, Path, Query, State},
    http::StatusCode,
};

use crate::{
    AppState,
    assignment::{Assignment, AssignmentOutcome, AssignmentRegistry, AssignmentView},
    auth::{Identity, Role},
    error::AppError,
    models::{Mentor, MentorSummary, NewMentor, PasswordChangeLog, User},
    utils::{
        GENERATED_PASSWORD_LEN, generate_password, hash_password, optional_text, required,
        required_text,
    },
};

use super::model::{
    AssignMentorRequest, CreateMentorRequest, PasswordLogQuery, PasswordResetResponse,
    ReassignMentorRequest, UnassignResponse,
};

const DEFAULT_LOG_LIMIT: i64 = 100;

#[axum::debug_handler]
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<User>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(User::list(&mut conn).await?))
}

#[axum::debug_handler]
pub async fn list_mentors(
    State(state): State<AppState>,
) -> Result<Json<Vec<MentorSummary>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(Mentor::list(&mut conn).await?))
}

/// 为已有的导师账号建立导师档案
#[axum::debug_handler]
pub async fn create_mentor(
    State(state): State<AppState>,
    Json(req): Json<CreateMentorRequest>,
) -> Result<(StatusCode, Json<Mentor>), AppError> {
    let user_id = required(req.user_id, "user_id")?;
    let name = required_text(req.name, "name")?;
    let department = required_text(req.department, "department")?;
    if matches!(req.max_students, Some(max) if max < 0) {
        return Err(AppError::Validation("max_students must not be negative".into()));
    }

    let mut tx = state.pool.begin().await?;
    let user = User::find_by_id(&mut tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    if user.role != Role::Mentor {
        return Err(AppError::Validation(format!(
            "User {} has role {}, expected mentor",
            user.id, user.role
        )));
    }

    let mentor = Mentor::create(
        &mut tx,
        NewMentor {
            user_id,
            name,
            department,
            designation: optional_text(req.designation),
            max_students: req.max_students,
            phone: optional_text(req.phone),
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(mentor)))
}

#[axum::debug_handler]
pub async fn list_assignments(
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentView>>, AppError> {
    Ok(Json(AssignmentRegistry::list(&state.pool).await?))
}

#[axum::debug_handler]
pub async fn assign_mentor(
    State(state): State<AppState>,
    Json(req): Json<AssignMentorRequest>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    let mentor_id = required(req.mentor_id, "mentor_id")?;
    let registration_number = required_text(req.registration_number, "registration_number")?;

    let mut tx = state.pool.begin().await?;
    let outcome = AssignmentRegistry::assign(&mut tx, mentor_id, &registration_number).await?;
    tx.commit().await?;

    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn reassign_mentor(
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<ReassignMentorRequest>,
) -> Result<Json<AssignmentOutcome>, AppError> {
    let mentor_id = required(req.mentor_id, "mentor_id")?;

    let mut tx = state.pool.begin().await?;
    let outcome = AssignmentRegistry::reassign(&mut tx, mentor_id, &registration_number).await?;
    tx.commit().await?;

    Ok(Json(outcome))
}

#[axum::debug_handler]
pub async fn unassign_mentor(
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<UnassignResponse>, AppError> {
    let mut tx = state.pool.begin().await?;
    let removed: Assignment = AssignmentRegistry::unassign(&mut tx, &registration_number).await?;
    tx.commit().await?;

    Ok(Json(UnassignResponse {
        message: "Mentor assignment removed",
        removed,
    }))
}

/// 重置用户密码，新密码只在响应中返回一次
#[axum::debug_handler]
pub async fn reset_user_password(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(user_id): Path<i32>,
) -> Result<Json<PasswordResetResponse>, AppError> {
    let new_password = generate_password(GENERATED_PASSWORD_LEN);
    let password_hash = hash_password(&new_password, state.config.bcrypt_cost)?;

    let mut tx = state.pool.begin().await?;
    let user = User::find_by_id(&mut tx, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    User::update_password(&mut tx, user.id, &password_hash).await?;
    PasswordChangeLog::record(&mut tx, user.id, identity.user_id).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = user.id,
        changed_by = identity.user_id,
        "Admin reset user password"
    );
    Ok(Json(PasswordResetResponse {
        user_id: user.id,
        email: user.email,
        new_password,
    }))
}

#[axum::debug_handler]
pub async fn list_password_logs(
    State(state): State<AppState>,
    Query(query): Query<PasswordLogQuery>,
) -> Result<Json<Vec<PasswordChangeLog>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, 1000);
    let mut conn = state.pool.acquire().await?;
    Ok(Json(PasswordChangeLog::list(&mut conn, limit).await?))
}
