use serde::Serialize;
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Mentor {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub department: String,
    pub designation: Option<String>,
    pub max_students: Option<i32>,
    pub phone: Option<String>,
}

/// 管理端导师列表项
#[derive(Debug, Serialize, FromRow)]
pub struct MentorSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub mentor: Mentor,
    pub email: String,
    pub student_count: i64,
}

#[derive(Debug)]
pub struct NewMentor {
    pub user_id: i32,
    pub name: String,
    pub department: String,
    pub designation: Option<String>,
    pub max_students: Option<i32>,
    pub phone: Option<String>,
}

impl Mentor {
    pub async fn create(conn: &mut PgConnection, new: NewMentor) -> Result<Self, sqlx::Error> {
        let mentor = sqlx::query_as::<_, Mentor>(
            r#"
            INSERT INTO mentors (user_id, name, department, designation, max_students, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, department, designation, max_students, phone
            "#,
        )
        .bind(new.user_id)
        .bind(new.name)
        .bind(new.department)
        .bind(new.designation)
        .bind(new.max_students)
        .bind(new.phone)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(mentor_id = mentor.id, user_id = mentor.user_id, "Created mentor profile");
        Ok(mentor)
    }

    pub async fn find_by_user_id(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mentor>(
            r#"
            SELECT id, user_id, name, department, designation, max_students, phone
            FROM mentors
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Mentor>(
            r#"
            SELECT id, user_id, name, department, designation, max_students, phone
            FROM mentors
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn list(conn: &mut PgConnection) -> Result<Vec<MentorSummary>, sqlx::Error> {
        sqlx::query_as::<_, MentorSummary>(
            r#"
            SELECT m.id, m.user_id, m.name, m.department, m.designation, m.max_students, m.phone,
                   u.email,
                   COUNT(ma.id) AS student_count
            FROM mentors m
            JOIN users u ON u.id = m.user_id
            LEFT JOIN mentor_assignments ma ON ma.mentor_id = m.id
            GROUP BY m.id, u.email
            ORDER BY m.name
            "#,
        )
        .fetch_all(&mut *conn)
        .await
    }
}
