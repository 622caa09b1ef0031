mod handler;
mod model;

pub use handler::{forgot_password, login, refresh, register, reset_password, verify_role};
