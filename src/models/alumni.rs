use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

/// 学生的校友亲属
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlumniRelation {
    pub id: i32,
    pub registration_number: String,
    pub alumni_name: Option<String>,
    pub alumni_registration_number: Option<String>,
    pub alumni_branch: Option<String>,
    pub alumni_program: Option<String>,
    pub alumni_batch: Option<String>,
    pub relation_with_student: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlumniDetails {
    pub alumni_name: Option<String>,
    pub alumni_registration_number: Option<String>,
    pub alumni_branch: Option<String>,
    pub alumni_program: Option<String>,
    pub alumni_batch: Option<String>,
    pub relation_with_student: Option<String>,
}

impl AlumniRelation {
    pub async fn find_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AlumniRelation>(
            r#"
            SELECT id, registration_number, alumni_name, alumni_registration_number,
                   alumni_branch, alumni_program, alumni_batch, relation_with_student
            FROM alumni_relations
            WHERE registration_number = $1
            "#,
        )
        .bind(registration_number)
        .fetch_optional(&mut *conn)
        .await
    }

    /// 不存在则创建，存在则只覆盖提供的字段
    pub async fn upsert(
        conn: &mut PgConnection,
        registration_number: &str,
        details: AlumniDetails,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AlumniRelation>(
            r#"
            INSERT INTO alumni_relations
                (registration_number, alumni_name, alumni_registration_number, alumni_branch,
                 alumni_program, alumni_batch, relation_with_student)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (registration_number) DO UPDATE
            SET alumni_name = COALESCE(EXCLUDED.alumni_name, alumni_relations.alumni_name),
                alumni_registration_number = COALESCE(
                    EXCLUDED.alumni_registration_number,
                    alumni_relations.alumni_registration_number
                ),
                alumni_branch = COALESCE(EXCLUDED.alumni_branch, alumni_relations.alumni_branch),
                alumni_program = COALESCE(EXCLUDED.alumni_program, alumni_relations.alumni_program),
                alumni_batch = COALESCE(EXCLUDED.alumni_batch, alumni_relations.alumni_batch),
                relation_with_student = COALESCE(
                    EXCLUDED.relation_with_student,
                    alumni_relations.relation_with_student
                )
            RETURNING id, registration_number, alumni_name, alumni_registration_number,
                      alumni_branch, alumni_program, alumni_batch, relation_with_student
            "#,
        )
        .bind(registration_number)
        .bind(details.alumni_name)
        .bind(details.alumni_registration_number)
        .bind(details.alumni_branch)
        .bind(details.alumni_program)
        .bind(details.alumni_batch)
        .bind(details.relation_with_student)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn remove(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM alumni_relations WHERE registration_number = $1")
            .bind(registration_number)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
