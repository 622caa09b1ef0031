mod handler;
mod model;

pub use handler::{
    approve_internship, create_evaluation, create_mentor_feedback, create_student, dashboard,
    get_internship, grade_report, list_evaluations, list_mentor_feedback, list_progress,
    list_reports, list_students, list_weekly_feedback, student_detail, submit_weekly_feedback,
    update_progress,
};
