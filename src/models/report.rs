use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeeklyReport {
    pub id: i32,
    pub registration_number: String,
    pub week_number: i32,
    pub report_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyReport {
    /// 同一周重复提交覆盖旧内容
    pub async fn submit(
        conn: &mut PgConnection,
        registration_number: &str,
        week_number: i32,
        report_text: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, WeeklyReport>(
            r#"
            INSERT INTO weekly_reports (registration_number, week_number, report_text)
            VALUES ($1, $2, $3)
            ON CONFLICT ON CONSTRAINT unique_student_week_report DO UPDATE
            SET report_text = EXCLUDED.report_text, updated_at = NOW()
            RETURNING id, registration_number, week_number, report_text, created_at, updated_at
            "#,
        )
        .bind(registration_number)
        .bind(week_number)
        .bind(report_text)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WeeklyReport>(
            r#"
            SELECT id, registration_number, week_number, report_text, created_at, updated_at
            FROM weekly_reports
            WHERE registration_number = $1
            ORDER BY week_number
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    Monthly,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown report type `{0}`")]
pub struct UnknownReportType(pub String);

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Monthly => "monthly",
            ReportType::Final => "final",
        }
    }
}

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(ReportType::Monthly),
            "final" => Ok(ReportType::Final),
            other => Err(UnknownReportType(other.to_string())),
        }
    }
}

impl TryFrom<String> for ReportType {
    type Error = UnknownReportType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 报告记录，只保存文件路径
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Report {
    pub id: i32,
    pub registration_number: String,
    #[sqlx(try_from = "String")]
    pub report_type: ReportType,
    pub submission_date: DateTime<Utc>,
    pub report_file_path: Option<String>,
    pub presentation_file_path: Option<String>,
    pub marks: Option<f64>,
    pub remarks: Option<String>,
}

impl Report {
    pub async fn create(
        conn: &mut PgConnection,
        registration_number: &str,
        report_type: ReportType,
        report_file_path: Option<String>,
        presentation_file_path: Option<String>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            INSERT INTO reports
                (registration_number, report_type, report_file_path, presentation_file_path)
            VALUES ($1, $2, $3, $4)
            RETURNING id, registration_number, report_type, submission_date, report_file_path,
                      presentation_file_path, marks, remarks
            "#,
        )
        .bind(registration_number)
        .bind(report_type.as_str())
        .bind(report_file_path)
        .bind(presentation_file_path)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            SELECT id, registration_number, report_type, submission_date, report_file_path,
                   presentation_file_path, marks, remarks
            FROM reports
            WHERE registration_number = $1
            ORDER BY submission_date DESC
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }

    /// 评分只作用于该学生名下的报告
    pub async fn grade(
        conn: &mut PgConnection,
        report_id: i32,
        registration_number: &str,
        marks: f64,
        remarks: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Report>(
            r#"
            UPDATE reports
            SET marks = $3, remarks = COALESCE($4, remarks)
            WHERE id = $1 AND registration_number = $2
            RETURNING id, registration_number, report_type, submission_date, report_file_path,
                      presentation_file_path, marks, remarks
            "#,
        )
        .bind(report_id)
        .bind(registration_number)
        .bind(marks)
        .bind(remarks)
        .fetch_optional(&mut *conn)
        .await
    }
}
