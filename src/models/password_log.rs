use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection};

/// 管理员重置密码的审计记录
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PasswordChangeLog {
    pub id: i32,
    pub user_id: i32,
    pub user_email: String,
    pub changed_by: i32,
    pub changed_by_email: String,
    pub changed_at: DateTime<Utc>,
}

impl PasswordChangeLog {
    pub async fn record(
        conn: &mut PgConnection,
        user_id: i32,
        changed_by: i32,
    ) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO password_change_logs (user_id, changed_by)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(changed_by)
        .fetch_one(&mut *conn)
        .await
    }

    pub async fn list(conn: &mut PgConnection, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, PasswordChangeLog>(
            r#"
            SELECT l.id, l.user_id, u.email AS user_email, l.changed_by,
                   a.email AS changed_by_email, l.changed_at
            FROM password_change_logs l
            JOIN users u ON u.id = l.user_id
            JOIN users a ON a.id = l.changed_by
            ORDER BY l.changed_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await
    }
}
