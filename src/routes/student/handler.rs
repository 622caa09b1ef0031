use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use sqlx::PgConnection;

use crate::{
    AppState,
    auth::Identity,
    error::AppError,
    models::{
        AlumniDetails, AlumniRelation, Evaluation, Internship, InternshipDetails, InternshipType,
        Mentor, MentorFeedback, Parent, ParentChanges, ProgressEntry, ProgressReport, Report,
        ReportType, Student, StudentChanges, UnknownInternshipType, UnknownReportType, User,
        WeeklyFeedback, WeeklyReport,
    },
    utils::{ensure_range, optional_text, required, required_text, validate_email},
};

use super::model::{
    InternshipRequest, ProfileResponse, ReportRequest, UpdateProfileRequest, UpdatedProfile,
    WeeklyReportRequest,
};

async fn current_student(
    conn: &mut PgConnection,
    identity: &Identity,
) -> Result<Student, AppError> {
    Student::find_by_user_id(conn, identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Student profile"))
}

fn parse_date(value: Option<String>, field: &'static str) -> Result<NaiveDate, AppError> {
    let value = required_text(value, field)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("{field} must be a date in YYYY-MM-DD format")))
}

fn internship_details(req: InternshipRequest) -> Result<InternshipDetails, AppError> {
    let company_name = required_text(req.company_name, "company_name")?;
    let internship_type: InternshipType = required_text(req.internship_type, "internship_type")?
        .parse()
        .map_err(|e: UnknownInternshipType| {
            AppError::Validation(format!("{e}, expected in-house or external"))
        })?;
    let start_date = parse_date(req.start_date, "start_date")?;
    let end_date = parse_date(req.end_date, "end_date")?;
    if start_date > end_date {
        return Err(AppError::Validation(
            "start_date must not be after end_date".into(),
        ));
    }
    if matches!(req.stipend, Some(stipend) if stipend < 0.0) {
        return Err(AppError::Validation("stipend must not be negative".into()));
    }
    let hr_email = optional_text(req.hr_email);
    if let Some(email) = &hr_email {
        validate_email(email)?;
    }

    Ok(InternshipDetails {
        company_name,
        internship_type,
        start_date,
        end_date,
        stipend: req.stipend,
        location: optional_text(req.location),
        hr_contact: optional_text(req.hr_contact),
        hr_email,
    })
}

fn parent_changes(mut changes: ParentChanges) -> Result<ParentChanges, AppError> {
    for field in [
        &mut changes.father_name,
        &mut changes.father_organization,
        &mut changes.father_designation,
        &mut changes.father_mobile_no,
        &mut changes.father_email,
        &mut changes.mother_name,
        &mut changes.mother_organization,
        &mut changes.mother_designation,
        &mut changes.mother_mobile_no,
        &mut changes.mother_email,
        &mut changes.business_card_image,
        &mut changes.communication_address,
        &mut changes.permanent_address,
        &mut changes.pin_code,
    ] {
        *field = optional_text(field.take());
    }

    for (email, field) in [
        (&changes.father_email, "father_email"),
        (&changes.mother_email, "mother_email"),
    ] {
        if let Some(email) = email {
            validate_email(email)
                .map_err(|_| AppError::Validation(format!("{field} is not a valid email address")))?;
        }
    }
    Ok(changes)
}

fn alumni_details(mut details: AlumniDetails) -> AlumniDetails {
    for field in [
        &mut details.alumni_name,
        &mut details.alumni_registration_number,
        &mut details.alumni_branch,
        &mut details.alumni_program,
        &mut details.alumni_batch,
        &mut details.relation_with_student,
    ] {
        *field = optional_text(field.take());
    }
    details
}

#[axum::debug_handler]
pub async fn get_profile(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    let user = User::find_by_id(&mut conn, identity.user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let mentor = match student.mentor_id {
        Some(mentor_id) => Mentor::find_by_id(&mut conn, mentor_id).await?,
        None => None,
    };
    let alumni_relation =
        AlumniRelation::find_for_student(&mut conn, &student.registration_number).await?;

    Ok(Json(ProfileResponse {
        student,
        email: user.email,
        mentor,
        alumni_relation,
    }))
}

/// 更新档案，学号不可修改；可同时维护校友关系
#[axum::debug_handler]
pub async fn update_profile(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UpdatedProfile>, AppError> {
    if req.has_alumni == Some(false) && req.alumni_relation.is_some() {
        return Err(AppError::Validation(
            "alumni_relation cannot be set when has_alumni is false".into(),
        ));
    }
    let alumni = req.alumni_relation.map(alumni_details);

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;

    if let Some(requested) = optional_text(req.registration_number) {
        if requested != student.registration_number {
            return Err(AppError::Validation(
                "Registration number cannot be changed".into(),
            ));
        }
    }

    let changes = StudentChanges {
        name: optional_text(req.name),
        batch: optional_text(req.batch),
        department: optional_text(req.department),
        phone: optional_text(req.phone),
        address: optional_text(req.address),
        section: optional_text(req.section),
        program: optional_text(req.program),
    };
    let updated = Student::update_profile(&mut tx, identity.user_id, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Student profile"))?;

    let registration_number = &updated.registration_number;
    let alumni_relation = match (req.has_alumni, alumni) {
        (Some(false), _) => {
            AlumniRelation::remove(&mut tx, registration_number).await?;
            None
        }
        (_, Some(details)) => {
            Some(AlumniRelation::upsert(&mut tx, registration_number, details).await?)
        }
        (_, None) => AlumniRelation::find_for_student(&mut tx, registration_number).await?,
    };
    tx.commit().await?;

    Ok(Json(UpdatedProfile {
        student: updated,
        alumni_relation,
    }))
}

#[axum::debug_handler]
pub async fn get_parent(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Parent>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    let parent = Parent::find_for_student(&mut conn, &student.registration_number)
        .await?
        .ok_or_else(|| AppError::not_found("Parent information"))?;
    Ok(Json(parent))
}

/// 已存在时由唯一约束返回 409
#[axum::debug_handler]
pub async fn create_parent(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<ParentChanges>,
) -> Result<(StatusCode, Json<Parent>), AppError> {
    let changes = parent_changes(req)?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let parent = Parent::create(&mut tx, &student.registration_number, changes).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(parent)))
}

#[axum::debug_handler]
pub async fn update_parent(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<ParentChanges>,
) -> Result<Json<Parent>, AppError> {
    let changes = parent_changes(req)?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let parent = Parent::update(&mut tx, &student.registration_number, changes)
        .await?
        .ok_or_else(|| AppError::not_found("Parent information"))?;
    tx.commit().await?;

    Ok(Json(parent))
}

#[axum::debug_handler]
pub async fn list_evaluations(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Evaluation>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    Ok(Json(
        Evaluation::list_for_student(&mut conn, &student.registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn get_progress(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<ProgressReport>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    let entries = ProgressEntry::list_for_student(&mut conn, &student.registration_number).await?;
    Ok(Json(ProgressReport::new(student.registration_number, entries)))
}

#[axum::debug_handler]
pub async fn list_weekly_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<WeeklyFeedback>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    Ok(Json(
        WeeklyFeedback::list_for_student(&mut conn, &student.registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn list_mentor_feedback(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<MentorFeedback>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    Ok(Json(
        MentorFeedback::list_for_student(&mut conn, &student.registration_number).await?,
    ))
}

#[axum::debug_handler]
pub async fn submit_internship(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<InternshipRequest>,
) -> Result<(StatusCode, Json<Internship>), AppError> {
    let details = internship_details(req)?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let internship = Internship::create(&mut tx, &student.registration_number, details).await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(internship)))
}

#[axum::debug_handler]
pub async fn get_internship(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Internship>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    let internship = Internship::find_for_student(&mut conn, &student.registration_number)
        .await?
        .ok_or_else(|| AppError::not_found("Internship"))?;
    Ok(Json(internship))
}

#[axum::debug_handler]
pub async fn update_internship(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<InternshipRequest>,
) -> Result<Json<Internship>, AppError> {
    let details = internship_details(req)?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let internship = Internship::update(&mut tx, &student.registration_number, details)
        .await?
        .ok_or_else(|| AppError::not_found("Internship"))?;
    tx.commit().await?;

    Ok(Json(internship))
}

#[axum::debug_handler]
pub async fn submit_weekly_report(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<WeeklyReportRequest>,
) -> Result<Json<WeeklyReport>, AppError> {
    let week_number = ensure_range(
        required(req.week_number, "week_number")?,
        1,
        i32::MAX,
        "week_number",
    )?;
    let report_text = required_text(req.report_text, "report_text")?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let report =
        WeeklyReport::submit(&mut tx, &student.registration_number, week_number, &report_text)
            .await?;
    tx.commit().await?;

    Ok(Json(report))
}

#[axum::debug_handler]
pub async fn list_weekly_reports(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<WeeklyReport>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    Ok(Json(
        WeeklyReport::list_for_student(&mut conn, &student.registration_number).await?,
    ))
}

/// 登记报告文件路径，文件本身不经过本服务
#[axum::debug_handler]
pub async fn submit_report(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Result<(StatusCode, Json<Report>), AppError> {
    let report_type: ReportType = required_text(req.report_type, "report_type")?
        .parse()
        .map_err(|e: UnknownReportType| {
            AppError::Validation(format!("{e}, expected monthly or final"))
        })?;
    let report_file_path = required_text(req.report_file_path, "report_file_path")?;

    let mut tx = state.pool.begin().await?;
    let student = current_student(&mut tx, &identity).await?;
    let report = Report::create(
        &mut tx,
        &student.registration_number,
        report_type,
        Some(report_file_path),
        optional_text(req.presentation_file_path),
    )
    .await?;
    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(report)))
}

#[axum::debug_handler]
pub async fn list_reports(
    Extension(identity): Extension<Identity>,
    State(state): State<AppState>,
) -> Result<Json<Vec<Report>>, AppError> {
    let mut conn = state.pool.acquire().await?;
    let student = current_student(&mut conn, &identity).await?;
    Ok(Json(
        Report::list_for_student(&mut conn, &student.registration_number).await?,
    ))
}
