use serde::{Deserialize, Serialize};

use crate::models::{AlumniDetails, AlumniRelation, Mentor, Student};

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub student: Student,
    pub email: String,
    pub mentor: Option<Mentor>,
    pub alumni_relation: Option<AlumniRelation>,
}

#[derive(Debug, Serialize)]
pub struct UpdatedProfile {
    #[serde(flatten)]
    pub student: Student,
    pub alumni_relation: Option<AlumniRelation>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub batch: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub section: Option<String>,
    pub program: Option<String>,
    /// 只允许原样回传，不能修改
    pub registration_number: Option<String>,
    /// `false` 删除已有的校友关系
    pub has_alumni: Option<bool>,
    pub alumni_relation: Option<AlumniDetails>,
}

#[derive(Debug, Deserialize)]
pub struct InternshipRequest {
    pub company_name: Option<String>,
    pub internship_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub stipend: Option<f64>,
    pub location: Option<String>,
    pub hr_contact: Option<String>,
    pub hr_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WeeklyReportRequest {
    pub week_number: Option<i32>,
    pub report_text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub report_type: Option<String>,
    pub report_file_path: Option<String>,
    pub presentation_file_path: Option<String>,
}
