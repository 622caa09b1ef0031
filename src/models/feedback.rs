use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct WeeklyFeedback {
    pub id: i32,
    pub registration_number: String,
    pub mentor_id: i32,
    pub week: i32,
    pub feedback: String,
    pub performance_rating: i32,
    pub completion_percentage: i32,
    pub areas_of_improvement: Option<String>,
    pub strengths: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 周反馈写入结果，`inserted` 为 false 表示覆盖了已有记录
#[derive(Debug, Serialize, FromRow)]
pub struct WeeklyFeedbackUpsert {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub feedback: WeeklyFeedback,
    pub inserted: bool,
}

#[derive(Debug)]
pub struct NewWeeklyFeedback {
    pub registration_number: String,
    pub mentor_id: i32,
    pub week: i32,
    pub feedback: String,
    pub performance_rating: i32,
    pub completion_percentage: i32,
    pub areas_of_improvement: Option<String>,
    pub strengths: Option<String>,
}

impl WeeklyFeedback {
    /// 同一学生、导师、周次只保留一条
    pub async fn upsert(
        conn: &mut PgConnection,
        new: NewWeeklyFeedback,
    ) -> Result<WeeklyFeedbackUpsert, sqlx::Error> {
        sqlx::query_as::<_, WeeklyFeedbackUpsert>(
            r#"
            INSERT INTO weekly_feedback
                (registration_number, mentor_id, week, feedback, performance_rating,
                 completion_percentage, areas_of_improvement, strengths)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT ON CONSTRAINT unique_weekly_feedback DO UPDATE
            SET feedback = EXCLUDED.feedback,
                performance_rating = EXCLUDED.performance_rating,
                completion_percentage = EXCLUDED.completion_percentage,
                areas_of_improvement = EXCLUDED.areas_of_improvement,
                strengths = EXCLUDED.strengths,
                updated_at = NOW()
            RETURNING id, registration_number, mentor_id, week, feedback, performance_rating,
                      completion_percentage, areas_of_improvement, strengths, submitted_at,
                      updated_at, (xmax = 0) AS inserted
            "#,
        )
        .bind(new.registration_number)
        .bind(new.mentor_id)
        .bind(new.week)
        .bind(new.feedback)
        .bind(new.performance_rating)
        .bind(new.completion_percentage)
        .bind(new.areas_of_improvement)
        .bind(new.strengths)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, WeeklyFeedback>(
            r#"
            SELECT id, registration_number, mentor_id, week, feedback, performance_rating,
                   completion_percentage, areas_of_improvement, strengths, submitted_at, updated_at
            FROM weekly_feedback
            WHERE registration_number = $1
            ORDER BY week
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }
}

/// 导师的不定期反馈
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MentorFeedback {
    pub id: i32,
    pub registration_number: String,
    pub mentor_id: i32,
    pub title: String,
    pub feedback_text: String,
    pub rating: i32,
    pub category: Option<String>,
    pub improvement_areas: Option<String>,
    pub strengths: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewMentorFeedback {
    pub registration_number: String,
    pub mentor_id: i32,
    pub title: String,
    pub feedback_text: String,
    pub rating: i32,
    pub category: Option<String>,
    pub improvement_areas: Option<String>,
    pub strengths: Option<String>,
}

impl MentorFeedback {
    pub async fn create(
        conn: &mut PgConnection,
        new: NewMentorFeedback,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MentorFeedback>(
            r#"
            INSERT INTO mentor_feedback
                (registration_number, mentor_id, title, feedback_text, rating, category,
                 improvement_areas, strengths)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, registration_number, mentor_id, title, feedback_text, rating, category,
                      improvement_areas, strengths, created_at
            "#,
        )
        .bind(new.registration_number)
        .bind(new.mentor_id)
        .bind(new.title)
        .bind(new.feedback_text)
        .bind(new.rating)
        .bind(new.category)
        .bind(new.improvement_areas)
        .bind(new.strengths)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MentorFeedback>(
            r#"
            SELECT id, registration_number, mentor_id, title, feedback_text, rating, category,
                   improvement_areas, strengths, created_at
            FROM mentor_feedback
            WHERE registration_number = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }
}
