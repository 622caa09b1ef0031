use serde::Serialize;
use sqlx::{FromRow, PgConnection};

/// 学生档案；`mentor_id` 由 mentor_assignments 联表得到，只读
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub registration_number: String,
    pub batch: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub section: Option<String>,
    pub program: Option<String>,
    pub mentor_id: Option<i32>,
}

#[derive(Debug)]
pub struct NewStudent {
    pub user_id: i32,
    pub name: String,
    pub registration_number: String,
    pub batch: String,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub section: Option<String>,
    pub program: Option<String>,
}

/// 可修改字段；学号不在其中
#[derive(Debug, Default)]
pub struct StudentChanges {
    pub name: Option<String>,
    pub batch: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub section: Option<String>,
    pub program: Option<String>,
}

impl Student {
    pub async fn create(conn: &mut PgConnection, new: NewStudent) -> Result<Self, sqlx::Error> {
        let student = sqlx::query_as::<_, Student>(
            r#"
            INSERT INTO students
                (user_id, name, registration_number, batch, department, phone, address, section, program)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, name, registration_number, batch, department, phone, address,
                      section, program, NULL::INTEGER AS mentor_id
            "#,
        )
        .bind(new.user_id)
        .bind(new.name)
        .bind(new.registration_number)
        .bind(new.batch)
        .bind(new.department)
        .bind(new.phone)
        .bind(new.address)
        .bind(new.section)
        .bind(new.program)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(
            student_id = student.id,
            registration_number = %student.registration_number,
            "Created student profile"
        );
        Ok(student)
    }

    pub async fn find_by_user_id(
        conn: &mut PgConnection,
        user_id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT s.id, s.user_id, s.name, s.registration_number, s.batch, s.department,
                   s.phone, s.address, s.section, s.program, ma.mentor_id
            FROM students s
            LEFT JOIN mentor_assignments ma ON ma.registration_number = s.registration_number
            WHERE s.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_by_registration_number(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT s.id, s.user_id, s.name, s.registration_number, s.batch, s.department,
                   s.phone, s.address, s.section, s.program, ma.mentor_id
            FROM students s
            LEFT JOIN mentor_assignments ma ON ma.registration_number = s.registration_number
            WHERE s.registration_number = $1
            "#,
        )
        .bind(registration_number)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn exists(conn: &mut PgConnection, registration_number: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM students WHERE registration_number = $1)",
        )
        .bind(registration_number)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list_for_mentor(
        conn: &mut PgConnection,
        mentor_id: i32,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            SELECT s.id, s.user_id, s.name, s.registration_number, s.batch, s.department,
                   s.phone, s.address, s.section, s.program, ma.mentor_id
            FROM mentor_assignments ma
            JOIN students s ON s.registration_number = ma.registration_number
            WHERE ma.mentor_id = $1
            ORDER BY s.registration_number
            "#,
        )
        .bind(mentor_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// 按用户ID更新档案，未提供的字段保持原值
    pub async fn update_profile(
        conn: &mut PgConnection,
        user_id: i32,
        changes: StudentChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Student>(
            r#"
            WITH updated AS (
                UPDATE students
                SET name = COALESCE($2, name),
                    batch = COALESCE($3, batch),
                    department = COALESCE($4, department),
                    phone = COALESCE($5, phone),
                    address = COALESCE($6, address),
                    section = COALESCE($7, section),
                    program = COALESCE($8, program)
                WHERE user_id = $1
                RETURNING *
            )
            SELECT s.id, s.user_id, s.name, s.registration_number, s.batch, s.department,
                   s.phone, s.address, s.section, s.program, ma.mentor_id
            FROM updated s
            LEFT JOIN mentor_assignments ma ON ma.registration_number = s.registration_number
            "#,
        )
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.batch)
        .bind(changes.department)
        .bind(changes.phone)
        .bind(changes.address)
        .bind(changes.section)
        .bind(changes.program)
        .fetch_optional(&mut *conn)
        .await
    }
}
