use serde::{Deserialize, Serialize};

use crate::assignment::Assignment;
use crate::models::{Internship, Mentor, Student};

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub mentor: Mentor,
    pub assigned_students: usize,
    pub registration_numbers: Vec<String>,
    /// 为空表示不限
    pub remaining_capacity: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct StudentDetailResponse {
    pub student: Student,
    pub overall_progress: f64,
    pub evaluation_count: usize,
    pub internship: Option<Internship>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub registration_number: Option<String>,
    pub batch: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub section: Option<String>,
    pub program: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateStudentResponse {
    pub student: Student,
    pub assignment: Assignment,
    /// 未指定密码时生成，只返回一次
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluationRequest {
    pub evaluation_type: Option<String>,
    pub marks: Option<f64>,
    pub feedback: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyFeedbackRequest {
    pub week: Option<i32>,
    pub feedback: Option<String>,
    pub performance_rating: Option<i32>,
    pub completion_percentage: Option<i32>,
    pub areas_of_improvement: Option<String>,
    pub strengths: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub phase: Option<String>,
    pub week: Option<i32>,
    pub completion_percentage: Option<i32>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MentorFeedbackRequest {
    pub title: Option<String>,
    pub feedback_text: Option<String>,
    pub rating: Option<i32>,
    pub category: Option<String>,
    pub improvement_areas: Option<String>,
    pub strengths: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalRequest {
    pub approved: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct GradeRequest {
    pub marks: Option<f64>,
    pub remarks: Option<String>,
}
