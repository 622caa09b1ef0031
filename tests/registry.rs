//! 需要 Postgres：`DATABASE_URL=... cargo test -- --ignored`

mod common;

use std::time::Duration;

use common::{create_user, mentor, student};
use internship_portal::{
    assignment::{AssignmentRegistry, Transition},
    auth::Role,
    error::AppError,
    models::{Evaluation, NewEvaluation, NewStudent, NewUser, Student, User},
};
use sqlx::PgPool;

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn assign_then_resolve(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let m = mentor(&mut conn, "m1@staff.example", None).await;
    student(&mut conn, "R100").await;

    let outcome = AssignmentRegistry::assign(&mut conn, m.id, "R100").await.unwrap();
    assert_eq!(outcome.transition, Transition::Created);
    assert_eq!(
        AssignmentRegistry::resolve(&mut *conn, "R100").await.unwrap(),
        Some(m.id)
    );
    assert!(AssignmentRegistry::authorize(&mut *conn, m.id, "R100").await.unwrap());

    let projected = Student::find_by_registration_number(&mut conn, "R100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(projected.mentor_id, Some(m.id));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn second_mentor_conflicts(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = mentor(&mut conn, "a@staff.example", None).await;
    let b = mentor(&mut conn, "b@staff.example", None).await;
    student(&mut conn, "R100").await;

    AssignmentRegistry::assign(&mut conn, a.id, "R100").await.unwrap();
    let again = AssignmentRegistry::assign(&mut conn, a.id, "R100").await.unwrap();
    assert_eq!(again.transition, Transition::Unchanged);

    let err = AssignmentRegistry::assign(&mut conn, b.id, "R100").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(
        AssignmentRegistry::resolve(&mut *conn, "R100").await.unwrap(),
        Some(a.id)
    );
    assert!(!AssignmentRegistry::authorize(&mut *conn, b.id, "R100").await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn missing_parties_are_not_found(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let m = mentor(&mut conn, "m@staff.example", None).await;
    student(&mut conn, "R100").await;

    let err = AssignmentRegistry::assign(&mut conn, m.id, "R999").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let err = AssignmentRegistry::assign(&mut conn, m.id + 100, "R100").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(
        AssignmentRegistry::resolve(&mut *conn, "R100").await.unwrap(),
        None
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn capacity_is_enforced(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let m = mentor(&mut conn, "m@staff.example", Some(1)).await;
    student(&mut conn, "R100").await;
    student(&mut conn, "R101").await;

    AssignmentRegistry::assign(&mut conn, m.id, "R100").await.unwrap();
    let err = AssignmentRegistry::assign(&mut conn, m.id, "R101").await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(
        AssignmentRegistry::students_of(&mut *conn, m.id).await.unwrap(),
        vec!["R100".to_string()]
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn reassign_and_unassign(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = mentor(&mut conn, "a@staff.example", None).await;
    let b = mentor(&mut conn, "b@staff.example", None).await;
    student(&mut conn, "R100").await;

    AssignmentRegistry::assign(&mut conn, a.id, "R100").await.unwrap();
    let moved = AssignmentRegistry::reassign(&mut conn, b.id, "R100").await.unwrap();
    assert_eq!(moved.transition, Transition::Moved { from: a.id });
    assert_eq!(
        AssignmentRegistry::resolve(&mut *conn, "R100").await.unwrap(),
        Some(b.id)
    );
    assert_eq!(AssignmentRegistry::list(&mut *conn).await.unwrap().len(), 1);

    let removed = AssignmentRegistry::unassign(&mut conn, "R100").await.unwrap();
    assert_eq!(removed.mentor_id, b.id);
    let err = AssignmentRegistry::unassign(&mut conn, "R100").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn duplicates_are_conflicts(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    student(&mut conn, "R100").await;

    let err: AppError = User::create(
        &mut conn,
        NewUser {
            email: "r100@students.example",
            password_hash: "x",
            first_name: None,
            last_name: None,
            role: Role::Student,
        },
    )
    .await
    .unwrap_err()
    .into();
    assert!(matches!(err, AppError::Conflict(ref msg) if msg == "Email already registered"));

    let other = create_user(&mut conn, "other@students.example", Role::Student).await;
    let err: AppError = Student::create(
        &mut conn,
        NewStudent {
            user_id: other.id,
            name: "Other".into(),
            registration_number: "R100".into(),
            batch: "2025".into(),
            department: None,
            phone: None,
            address: None,
            section: None,
            program: None,
        },
    )
    .await
    .unwrap_err()
    .into();
    assert!(
        matches!(err, AppError::Conflict(ref msg) if msg == "Registration number already exists")
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn registration_number_is_immutable(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    student(&mut conn, "R100").await;

    let result = sqlx::query("UPDATE students SET registration_number = 'R200' WHERE registration_number = 'R100'")
        .execute(&mut *conn)
        .await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn mentor_write_blocks_concurrent_reassign(pool: PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    let a = mentor(&mut conn, "a@staff.example", None).await;
    let b = mentor(&mut conn, "b@staff.example", None).await;
    student(&mut conn, "R100").await;
    AssignmentRegistry::assign(&mut conn, a.id, "R100").await.unwrap();
    drop(conn);

    let mut mentor_tx = pool.begin().await.unwrap();
    assert!(
        AssignmentRegistry::authorize_for_update(&mut mentor_tx, a.id, "R100")
            .await
            .unwrap()
    );

    let admin_pool = pool.clone();
    let reassign = tokio::spawn(async move {
        let mut tx = admin_pool.begin().await.unwrap();
        let outcome = AssignmentRegistry::reassign(&mut tx, b.id, "R100")
            .await
            .unwrap();
        tx.commit().await.unwrap();
        outcome
    });

    // 改派需等待导师事务释放学生行锁
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!reassign.is_finished());

    Evaluation::create(
        &mut mentor_tx,
        NewEvaluation {
            registration_number: "R100".into(),
            mentor_id: a.id,
            evaluation_type: "midterm".into(),
            marks: 80.0,
            feedback: None,
            remarks: None,
        },
    )
    .await
    .unwrap();
    mentor_tx.commit().await.unwrap();

    let outcome = reassign.await.unwrap();
    assert_eq!(outcome.transition, Transition::Moved { from: a.id });

    // 改派生效后，原导师的写路径检查不再通过
    let mut tx = pool.begin().await.unwrap();
    assert!(
        !AssignmentRegistry::authorize_for_update(&mut tx, a.id, "R100")
            .await
            .unwrap()
    );
    let err = AssignmentRegistry::authorize_for_update(&mut tx, a.id, "R999")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
