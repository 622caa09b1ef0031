#![allow(dead_code)]

use internship_portal::{
    auth::Role,
    models::{Mentor, NewMentor, NewStudent, NewUser, Student, User},
};
use sqlx::PgConnection;

pub async fn create_user(conn: &mut PgConnection, email: &str, role: Role) -> User {
    User::create(
        conn,
        NewUser {
            email,
            password_hash: "not-a-real-hash",
            first_name: None,
            last_name: None,
            role,
        },
    )
    .await
    .unwrap()
}

pub async fn mentor(conn: &mut PgConnection, email: &str, max_students: Option<i32>) -> Mentor {
    let user = create_user(conn, email, Role::Mentor).await;
    Mentor::create(
        conn,
        NewMentor {
            user_id: user.id,
            name: email.to_string(),
            department: "CSE".into(),
            designation: None,
            max_students,
            phone: None,
        },
    )
    .await
    .unwrap()
}

pub async fn student(conn: &mut PgConnection, registration_number: &str) -> Student {
    let email = format!("{}@students.example", registration_number.to_lowercase());
    let user = create_user(conn, &email, Role::Student).await;
    Student::create(
        conn,
        NewStudent {
            user_id: user.id,
            name: registration_number.to_string(),
            registration_number: registration_number.to_string(),
            batch: "2025".into(),
            department: None,
            phone: None,
            address: None,
            section: None,
            program: None,
        },
    )
    .await
    .unwrap()
}

/// 无签名会话令牌
pub fn bearer(user_id: i32, role: Role) -> String {
    format!("Bearer token:{user_id}:{role}:s1")
}
