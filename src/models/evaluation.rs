use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Evaluation {
    pub id: i32,
    pub registration_number: String,
    pub mentor_id: i32,
    pub evaluation_type: String,
    pub marks: f64,
    pub feedback: Option<String>,
    pub remarks: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewEvaluation {
    pub registration_number: String,
    pub mentor_id: i32,
    pub evaluation_type: String,
    pub marks: f64,
    pub feedback: Option<String>,
    pub remarks: Option<String>,
}

impl Evaluation {
    pub async fn create(conn: &mut PgConnection, new: NewEvaluation) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Evaluation>(
            r#"
            INSERT INTO evaluations
                (registration_number, mentor_id, evaluation_type, marks, feedback, remarks)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, registration_number, mentor_id, evaluation_type, marks, feedback,
                      remarks, submitted_at
            "#,
        )
        .bind(new.registration_number)
        .bind(new.mentor_id)
        .bind(new.evaluation_type)
        .bind(new.marks)
        .bind(new.feedback)
        .bind(new.remarks)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Evaluation>(
            r#"
            SELECT id, registration_number, mentor_id, evaluation_type, marks, feedback,
                   remarks, submitted_at
            FROM evaluations
            WHERE registration_number = $1
            ORDER BY submitted_at DESC
            "#,
        )
        .bind(registration_number)
        .fetch_all(&mut *conn)
        .await
    }
}
