use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use sqlx::PgConnection;

use crate::{
    AppState,
    assignment::AssignmentRegistry,
    auth::{Identity, Role},
    error::AppError,
    models::{
        Evaluation, Internship, Mentor, MentorFeedback, NewEvaluation, NewMentorFeedback,
        NewProgressEntry, NewStudent, NewUser, NewWeeklyFeedback, ProgressEntry, ProgressReport,
        Report, Student, User, WeeklyFeedback, WeeklyFeedbackUpsert, overall_progress,
    },
    utils::{
        GENERATED_PASSWORD_LEN, ensure_range, generate_password, hash_password, optional_text,
        required, required_text, validate_email, validate_password,
    },
};

use super::model::{
    ApprovalRequest, CreateStudentRequest, CreateStudentResponse, DashboardResponse,
    EvaluationRequest, GradeRequest, MentorFeedbackRequest, ProgressRequest,
    StudentDetailResponse, WeeklyFeedbackRequest,
};

async fn current_mentor(conn: &mut PgConnection, identity: &Identity) -> Result<Mentor, AppError> {
    Mentor::find_by_user_id(conn, identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Mentor profile"))
}

fn ensure_assigned(
    mentor: &Mentor,
    registration_number: &str,
    authorized: bool,
) -> Result<(), AppError> {
    if !authorized {
        tracing::warn!(
            mentor_id = mentor.id,
            registration_number,
            "Mentor accessed unassigned student"
        );
        return Err(AppError::Authorization(
            "You are not assigned as a mentor to this student".into(),
        ));
    }
    Ok(())
}

/// 导师读取某个学生数据前的检查：学生存在且分配给该导师
async fn mentor_scope(
    conn: &mut PgConnection,
    identity: &Identity,
    registration_number: &str,
) -> Result<Mentor, AppError> {
    let mentor = current_mentor(conn, identity).await?;
    if !Student::exists(conn, registration_number).await? {
        return Err(AppError::not_found("Student"));
    }
    let authorized =
        AssignmentRegistry::authorize(&mut *conn, mentor.id, registration_number).await?;
    ensure_assigned(&mentor, registration_number, authorized)?;
    Ok(mentor)
}

/// 写操作使用，需传入事务连接；学生行锁持有到事务结束
async fn mentor_write_scope(
    conn: &mut PgConnection,
    identity: &Identity,
    registration_number: &str,
) -> Result<Mentor, AppError> {
    let mentor = current_mentor(conn, identity).await?;
    let authorized =
        AssignmentRegistry::authorize_for_update(conn, mentor.id, registration_number).await?;
    ensure_assigned(&mentor, registration_number, authorized)?;
    Ok(mentor)
}

#[axum::debug_handler]
pub async fn dashboard(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<DashboardResponse>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let mentor = current_mentor(&mut conn, &identity).await?;
    let registration_numbers = AssignmentRegistry::students_of(&mut *conn, mentor.id).await?;

    let remaining_capacity = mentor
        .max_students
        .map(|max| (i64::from(max) - registration_numbers.len() as i64).max(0));

    Ok(Json(DashboardResponse {
        assigned_students: registration_numbers.len(),
        registration_numbers,
        remaining_capacity,
        mentor,
    }))
}

#[axum::debug_handler]
pub async fn list_students(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Student>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let mentor = current_mentor(&mut conn, &identity).await?;
    Ok(Json(Student::list_for_mentor(&mut conn, mentor.id).await?))
}

#[axum::debug_handler]
pub async fn student_detail(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<StudentDetailResponse>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;

    let student = Student::find_by_registration_number(&mut conn, &registration_number)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))?;
    let progress = ProgressEntry::list_for_student(&mut conn, &registration_number).await?;
    let evaluations = Evaluation::list_for_student(&mut conn, &registration_number).await?;
    let internship = Internship::find_for_student(&mut conn, &registration_number).await?;

    Ok(Json(StudentDetailResponse {
        student,
        overall_progress: overall_progress(&progress),
        evaluation_count: evaluations.len(),
        internship,
    }))
}

/// 创建学生账号并分配给当前导师，三步在同一事务中完成
#[axum::debug_handler]
pub async fn create_student(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<CreateStudentRequest>,
) -> Result<(StatusCode, Json<CreateStudentResponse>), AppError> {
    let email = required_text(req.email, "email")?.to_lowercase();
    validate_email(&email)?;
    let name = required_text(req.name, "name")?;
    let registration_number = required_text(req.registration_number, "registration_number")?;
    let batch = required_text(req.batch, "batch")?;

    let (password, initial_password) = match optional_text(req.password) {
        Some(password) => {
            validate_password(&password)?;
            (password, None)
        }
        None => {
            let generated = generate_password(GENERATED_PASSWORD_LEN);
            (generated.clone(), Some(generated))
        }
    };
    let password_hash = hash_password(&password, state.config.bcrypt_cost)?;

    let mut tx = state.pool.begin().await?;
    let mentor = current_mentor(&mut tx, &identity).await?;
    let user = User::create(
        &mut tx,
        NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: Some(name.as_str()),
            last_name: None,
            role: Role::Student,
        },
    )
    .await?;
    let student = Student::create(
        &mut tx,
        NewStudent {
            user_id: user.id,
            name,
            registration_number,
            batch,
            department: optional_text(req.department),
            phone: optional_text(req.phone),
            address: optional_text(req.address),
            section: optional_text(req.section),
            program: optional_text(req.program),
        },
    )
    .await?;
    let outcome =
        AssignmentRegistry::assign(&mut tx, mentor.id, &student.registration_number).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateStudentResponse {
            student: Student {
                mentor_id: Some(outcome.assignment.mentor_id),
                ..student
            },
            assignment: outcome.assignment,
            initial_password,
        }),
    ))
}

#[axum::debug_handler]
pub async fn list_evaluations(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    Ok(Json(
        Evaluation::list_for_student(&mut conn, &registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn create_evaluation(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<EvaluationRequest>,
) -> Result<(StatusCode, Json<Evaluation>), AppError> {
    let evaluation_type = required_text(req.evaluation_type, "evaluation_type")?;
    let marks = ensure_range(required(req.marks, "marks")?, 0.0, 100.0, "marks")?;

    let mut tx = state.pool.begin().await?;
    let mentor = mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let evaluation = Evaluation::create(
        &mut tx,
        NewEvaluation {
            registration_number,
            mentor_id: mentor.id,
            evaluation_type,
            marks,
            feedback: optional_text(req.feedback),
            remarks: optional_text(req.remarks),
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(evaluation)))
}

#[axum::debug_handler]
pub async fn list_weekly_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<Vec<WeeklyFeedback>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    Ok(Json(
        WeeklyFeedback::list_for_student(&mut conn, &registration_number).await?,
    ))
}

/// 提交周反馈，同一周再次提交时覆盖
#[axum::debug_handler]
pub async fn submit_weekly_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<WeeklyFeedbackRequest>,
) -> Result<(StatusCode, Json<WeeklyFeedbackUpsert>), AppError> {
    let week = ensure_range(required(req.week, "week")?, 1, i32::MAX, "week")?;
    let feedback = required_text(req.feedback, "feedback")?;
    let performance_rating = ensure_range(
        required(req.performance_rating, "performance_rating")?,
        1,
        5,
        "performance_rating",
    )?;
    let completion_percentage = ensure_range(
        req.completion_percentage.unwrap_or(0),
        0,
        100,
        "completion_percentage",
    )?;

    let mut tx = state.pool.begin().await?;
    let mentor = mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let result = WeeklyFeedback::upsert(
        &mut tx,
        NewWeeklyFeedback {
            registration_number,
            mentor_id: mentor.id,
            week,
            feedback,
            performance_rating,
            completion_percentage,
            areas_of_improvement: optional_text(req.areas_of_improvement),
            strengths: optional_text(req.strengths),
        },
    )
    .await?;
    tx.commit().await?;

    let status = if result.inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

#[axum::debug_handler]
pub async fn list_progress(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<ProgressReport>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    let entries = ProgressEntry::list_for_student(&mut conn, &registration_number).await?;
    Ok(Json(ProgressReport::new(registration_number, entries)))
}

#[axum::debug_handler]
pub async fn update_progress(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<ProgressRequest>,
) -> Result<Json<ProgressEntry>, AppError> {
    let phase = required_text(req.phase, "phase")?;
    let week = ensure_range(required(req.week, "week")?, 1, i32::MAX, "week")?;
    let completion_percentage = ensure_range(
        required(req.completion_percentage, "completion_percentage")?,
        0,
        100,
        "completion_percentage",
    )?;
    let status = required_text(req.status, "status")?;

    let mut tx = state.pool.begin().await?;
    mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let entry = ProgressEntry::upsert(
        &mut tx,
        NewProgressEntry {
            registration_number,
            phase,
            week,
            completion_percentage,
            status,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(Json(entry))
}

#[axum::debug_handler]
pub async fn list_mentor_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<Vec<MentorFeedback>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    Ok(Json(
        MentorFeedback::list_for_student(&mut conn, &registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn create_mentor_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<MentorFeedbackRequest>,
) -> Result<(StatusCode, Json<MentorFeedback>), AppError> {
    let title = required_text(req.title, "title")?;
    let feedback_text = required_text(req.feedback_text, "feedback_text")?;
    let rating = ensure_range(required(req.rating, "rating")?, 1, 5, "rating")?;

    let mut tx = state.pool.begin().await?;
    let mentor = mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let feedback = MentorFeedback::create(
        &mut tx,
        NewMentorFeedback {
            registration_number,
            mentor_id: mentor.id,
            title,
            feedback_text,
            rating,
            category: optional_text(req.category),
            improvement_areas: optional_text(req.improvement_areas),
            strengths: optional_text(req.strengths),
        },
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(feedback)))
}

#[axum::debug_handler]
pub async fn get_internship(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<Internship>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    let internship = Internship::find_for_student(&mut conn, &registration_number)
        .await?
        .ok_or_else(|| AppError::not_found("Internship"))?;
    Ok(Json(internship))
}

#[axum::debug_handler]
pub async fn approve_internship(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
    Json(req): Json<ApprovalRequest>,
) -> Result<Json<Internship>, AppError> {
    let approved = required(req.approved, "approved")?;

    let mut tx = state.pool.begin().await?;
    let mentor = mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let internship = Internship::set_approval(&mut tx, &registration_number, mentor.id, approved)
        .await?
        .ok_or_else(|| AppError::not_found("Internship"))?;
    tx.commit().await?;

    tracing::info!(
        mentor_id = mentor.id,
        registration_number = %registration_number,
        approved,
        "Internship approval updated"
    );
    Ok(Json(internship))
}

#[axum::debug_handler]
pub async fn list_reports(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path(registration_number): Path<String>,
) -> Result<Json<Vec<Report>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    mentor_scope(&mut conn, &identity, &registration_number).await?;
    Ok(Json(
        Report::list_for_student(&mut conn, &registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn grade_report(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Path((registration_number, report_id)): Path<(String, i32)>,
    Json(req): Json<GradeRequest>,
) -> Result<Json<Report>, AppError> {
    let marks = ensure_range(required(req.marks, "marks")?, 0.0, 100.0, "marks")?;

    let mut tx = state.pool.begin().await?;
    mentor_write_scope(&mut tx, &identity, &registration_number).await?;
    let report = Report::grade(
        &mut tx,
        report_id,
        &registration_number,
        marks,
        optional_text(req.remarks),
    )
    .await?
    .ok_or_else(|| AppError::not_found("Report"))?;
    tx.commit().await?;

    Ok(Json(report))
}
