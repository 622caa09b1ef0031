use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

use crate::auth::Role;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i32,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub role: Role,
}

impl User {
    /// 创建用户，邮箱重复时返回唯一约束错误
    pub async fn create(conn: &mut PgConnection, new: NewUser<'_>) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, first_name, last_name, role, created_at
            "#,
        )
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.first_name)
        .bind(new.last_name)
        .bind(new.role.as_str())
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(user_id = user.id, role = %user.role, "Created user");
        Ok(user)
    }

    pub async fn find_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_by_email(
        conn: &mut PgConnection,
        email: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn list(conn: &mut PgConnection) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await
    }

    /// 更新密码并作废未使用的重置令牌
    pub async fn update_password(
        conn: &mut PgConnection,
        id: i32,
        password_hash: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $1, reset_token = NULL
            WHERE id = $2
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 保存重置令牌摘要，返回对应用户ID
    pub async fn set_reset_token(
        conn: &mut PgConnection,
        email: &str,
        token_digest: &str,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            UPDATE users
            SET reset_token = $1
            WHERE email = $2
            RETURNING id
            "#,
        )
        .bind(token_digest)
        .bind(email)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_by_reset_token(
        conn: &mut PgConnection,
        token_digest: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, first_name, last_name, role, created_at
            FROM users
            WHERE reset_token = $1
            FOR UPDATE
            "#,
        )
        .bind(token_digest)
        .fetch_optional(&mut *conn)
        .await
    }

    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{first} {last}"),
            (Some(name), None) | (None, Some(name)) => name.clone(),
            (None, None) => self.email.clone(),
        }
    }
}
