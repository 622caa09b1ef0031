pub mod admin;
pub mod auth;
pub mod health;
pub mod mentor;
pub mod student;
