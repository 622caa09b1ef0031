use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProgressEntry {
    pub id: i32,
    pub registration_number: String,
    pub phase: String,
    pub week: i32,
    pub completion_percentage: i32,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewProgressEntry {
    pub registration_number: String,
    pub phase: String,
    pub week: i32,
    pub completion_percentage: i32,
    pub status: String,
}

/// 学生进度汇总
#[derive(Debug, Serialize)]
pub struct ProgressReport {
    pub registration_number: String,
    pub overall_progress: f64,
    pub entries: Vec<ProgressEntry>,
}

impl ProgressReport {
    pub fn new(registration_number: String, entries: Vec<ProgressEntry>) -> Self {
        Self {
            overall_progress: overall_progress(&entries),
            registration_number,
            entries,
        }
    }
}

/// 各条记录完成度的平均值，保留一位小数
pub fn overall_progress(entries: &[ProgressEntry]) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    let total: i64 = entries
        .iter()
        .map(|e| i64::from(e.completion_percentage))
        .sum();
    let average = total as f64 / entries.len() as f64;
    (average * 10.0).round() / 10.0
}

impl ProgressEntry {
    /// 同一学生、阶段、周次只保留一条
    pub async fn upsert(conn: &mut PgConnection, new: NewProgressEntry) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, ProgressEntry>(
            r#"
            INSERT INTO progress_tracking
                (registration_number, phase, week, completion_percentage, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT ON CONSTRAINT unique_progress_entry DO UPDATE
            SET completion_percentage = EXCLUDED.completion_percentage,
                status = EXCLUDED.status,
                updated_at = NOW()
            RETURNING id, registration_number, phase, week, completion_percentage, status, updated_at
            "#,
        )
        .bind(new.registration_number)
        .bind(new.phase)
        .bind(new.week)
        .bind(new.completion_percentage)
        .bind(new.status)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ProgressEntry>(
            r#"
            SELECT id, registration_number, phase, week, completion_percentage, status, updated_at
            FROM progress_tracking
            WHERE registration_number = $1
            ORDER BY week, phase
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }
}
