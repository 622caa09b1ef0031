mod handler;
mod model;

pub use handler::{
    assign_mentor, create_mentor, list_assignments, list_mentors, list_password_logs, list_users,
    reassign_mentor, reset_user_password, unassign_mentor,
};
