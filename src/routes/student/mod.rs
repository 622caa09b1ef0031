mod handler;
mod model;

pub use handler::{
    create_parent, get_internship, get_parent, get_profile, get_progress, list_evaluations,
    list_mentor_feedback, list_reports, list_weekly_feedback, list_weekly_reports,
    submit_internship, submit_report, submit_weekly_report, update_internship, update_parent,
    update_profile,
};
