use serde::{Deserialize, Serialize};

use crate::assignment::Assignment;

#[derive(Debug, Deserialize)]
pub struct CreateMentorRequest {
    pub user_id: Option<i32>,
    pub name: Option<String>,
    pub department: Option<String>,
    pub designation: Option<String>,
    pub max_students: Option<i32>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignMentorRequest {
    pub mentor_id: Option<i32>,
    pub registration_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReassignMentorRequest {
    pub mentor_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct UnassignResponse {
    pub message: &'static str,
    pub removed: Assignment,
}

#[derive(Debug, Serialize)]
pub struct PasswordResetResponse {
    pub user_id: i32,
    pub email: String,
    /// 只在本次响应中返回
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordLogQuery {
    pub limit: Option<i64>,
}
