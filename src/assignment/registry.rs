use sqlx::{PgConnection, PgExecutor};

use super::types::{Assignment, AssignmentOutcome, AssignmentState, AssignmentView, Transition};
use crate::error::AppError;

/// 导师分配登记表。
///
/// `mentor_assignments` 是导师与学生关系的唯一来源。写操作需在事务连接上调用：
/// 先对学生行和导师行加 `FOR UPDATE` 锁，再读取当前状态并执行转换，
/// `UNIQUE(registration_number)` 兜底并发插入。
pub struct AssignmentRegistry;

impl AssignmentRegistry {
    pub async fn assign(
        conn: &mut PgConnection,
        mentor_id: i32,
        registration_number: &str,
    ) -> Result<AssignmentOutcome, AppError> {
        lock_student(conn, registration_number).await?;
        let capacity = lock_mentor(conn, mentor_id).await?;
        let state = AssignmentState::from(Self::resolve(&mut *conn, registration_number).await?);

        let transition = state.assign(mentor_id)?;
        let assignment = match transition {
            Transition::Unchanged => find(conn, registration_number).await?,
            _ => {
                ensure_capacity(conn, mentor_id, capacity).await?;
                insert(conn, mentor_id, registration_number).await?
            }
        };

        tracing::info!(
            mentor_id,
            registration_number,
            ?transition,
            "Mentor assignment"
        );
        Ok(AssignmentOutcome {
            assignment,
            transition,
        })
    }

    /// 管理员改派，新建或移动分配
    pub async fn reassign(
        conn: &mut PgConnection,
        mentor_id: i32,
        registration_number: &str,
    ) -> Result<AssignmentOutcome, AppError> {
        lock_student(conn, registration_number).await?;
        let capacity = lock_mentor(conn, mentor_id).await?;
        let state = AssignmentState::from(Self::resolve(&mut *conn, registration_number).await?);

        let transition = state.reassign(mentor_id);
        let assignment = match transition {
            Transition::Unchanged => find(conn, registration_number).await?,
            Transition::Created => {
                ensure_capacity(conn, mentor_id, capacity).await?;
                insert(conn, mentor_id, registration_number).await?
            }
            Transition::Moved { .. } => {
                ensure_capacity(conn, mentor_id, capacity).await?;
                sqlx::query_as::<_, Assignment>(
                    r#"
                    UPDATE mentor_assignments
                    SET mentor_id = $1, assigned_at = NOW()
                    WHERE registration_number = $2
                    RETURNING id, mentor_id, registration_number, assigned_at
                    "#,
                )
                .bind(mentor_id)
                .bind(registration_number)
                .fetch_one(&mut *conn)
                .await?
            }
        };

        tracing::info!(
            mentor_id,
            registration_number,
            ?transition,
            "Mentor reassignment"
        );
        Ok(AssignmentOutcome {
            assignment,
            transition,
        })
    }

    pub async fn unassign(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Assignment, AppError> {
        lock_student(conn, registration_number).await?;

        let removed = sqlx::query_as::<_, Assignment>(
            r#"
            DELETE FROM mentor_assignments
            WHERE registration_number = $1
            RETURNING id, mentor_id, registration_number, assigned_at
            "#,
        )
        .bind(registration_number)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Student has no mentor assigned".into()))?;

        tracing::info!(
            mentor_id = removed.mentor_id,
            registration_number,
            "Mentor unassigned"
        );
        Ok(removed)
    }

    /// 学生当前导师
    pub async fn resolve<'e, E>(
        executor: E,
        registration_number: &str,
    ) -> Result<Option<i32>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let mentor_id = sqlx::query_scalar::<_, i32>(
            "SELECT mentor_id FROM mentor_assignments WHERE registration_number = $1",
        )
        .bind(registration_number)
        .fetch_optional(executor)
        .await?;

        Ok(mentor_id)
    }

    pub async fn authorize<'e, E>(
        executor: E,
        mentor_id: i32,
        registration_number: &str,
    ) -> Result<bool, AppError>
    where
        E: PgExecutor<'e>,
    {
        let state = AssignmentState::from(Self::resolve(executor, registration_number).await?);
        Ok(state.authorizes(mentor_id))
    }

    /// 写路径上的授权检查，需在事务连接上调用。
    ///
    /// 先对学生行加 `FOR SHARE` 锁，与 `assign`/`reassign`/`unassign` 的
    /// `FOR UPDATE` 互斥，分配关系在本事务提交前不会改变。
    pub async fn authorize_for_update(
        conn: &mut PgConnection,
        mentor_id: i32,
        registration_number: &str,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, i32>(
            "SELECT id FROM students WHERE registration_number = $1 FOR SHARE",
        )
        .bind(registration_number)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Student"))?;

        Self::authorize(&mut *conn, mentor_id, registration_number).await
    }

    pub async fn students_of<'e, E>(executor: E, mentor_id: i32) -> Result<Vec<String>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let registration_numbers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT registration_number
            FROM mentor_assignments
            WHERE mentor_id = $1
            ORDER BY registration_number
            "#,
        )
        .bind(mentor_id)
        .fetch_all(executor)
        .await?;

        Ok(registration_numbers)
    }

    pub async fn list<'e, E>(executor: E) -> Result<Vec<AssignmentView>, AppError>
    where
        E: PgExecutor<'e>,
    {
        let assignments = sqlx::query_as::<_, AssignmentView>(
            r#"
            SELECT ma.registration_number, s.name AS student_name, ma.mentor_id,
                   m.name AS mentor_name, ma.assigned_at
            FROM mentor_assignments ma
            JOIN students s ON s.registration_number = ma.registration_number
            JOIN mentors m ON m.id = ma.mentor_id
            ORDER BY ma.registration_number
            "#,
        )
        .fetch_all(executor)
        .await?;

        Ok(assignments)
    }
}

async fn lock_student(conn: &mut PgConnection, registration_number: &str) -> Result<(), AppError> {
    sqlx::query_scalar::<_, i32>(
        "SELECT id FROM students WHERE registration_number = $1 FOR UPDATE",
    )
    .bind(registration_number)
    .fetch_optional(&mut *conn)
    .await?
    .map(|_| ())
    .ok_or_else(|| AppError::not_found("Student"))
}

/// 锁定导师行并返回其容量上限
async fn lock_mentor(conn: &mut PgConnection, mentor_id: i32) -> Result<Option<i32>, AppError> {
    sqlx::query_scalar::<_, Option<i32>>("SELECT max_students FROM mentors WHERE id = $1 FOR UPDATE")
        .bind(mentor_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::not_found("Mentor"))
}

async fn ensure_capacity(
    conn: &mut PgConnection,
    mentor_id: i32,
    capacity: Option<i32>,
) -> Result<(), AppError> {
    let Some(max_students) = capacity else {
        return Ok(());
    };

    let assigned = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM mentor_assignments WHERE mentor_id = $1",
    )
    .bind(mentor_id)
    .fetch_one(&mut *conn)
    .await?;

    if assigned >= i64::from(max_students) {
        return Err(AppError::Conflict(format!(
            "Mentor has reached the maximum of {max_students} students"
        )));
    }
    Ok(())
}

async fn insert(
    conn: &mut PgConnection,
    mentor_id: i32,
    registration_number: &str,
) -> Result<Assignment, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        r#"
        INSERT INTO mentor_assignments (mentor_id, registration_number)
        VALUES ($1, $2)
        RETURNING id, mentor_id, registration_number, assigned_at
        "#,
    )
    .bind(mentor_id)
    .bind(registration_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(assignment)
}

async fn find(conn: &mut PgConnection, registration_number: &str) -> Result<Assignment, AppError> {
    let assignment = sqlx::query_as::<_, Assignment>(
        r#"
        SELECT id, mentor_id, registration_number, assigned_at
        FROM mentor_assignments
        WHERE registration_number = $1
        "#,
    )
    .bind(registration_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(assignment)
}
