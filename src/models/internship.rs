use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InternshipType {
    #[serde(rename = "in-house")]
    InHouse,
    #[serde(rename = "external")]
    External,
}

impl InternshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InternshipType::InHouse => "in-house",
            InternshipType::External => "external",
        }
    }
}

impl fmt::Display for InternshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown internship type `{0}`")]
pub struct UnknownInternshipType(pub String);

impl FromStr for InternshipType {
    type Err = UnknownInternshipType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in-house" => Ok(InternshipType::InHouse),
            "external" => Ok(InternshipType::External),
            other => Err(UnknownInternshipType(other.to_string())),
        }
    }
}

impl TryFrom<String> for InternshipType {
    type Error = UnknownInternshipType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Internship {
    pub id: i32,
    pub registration_number: String,
    pub company_name: String,
    #[sqlx(try_from = "String")]
    pub internship_type: InternshipType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub stipend: Option<f64>,
    pub location: Option<String>,
    pub hr_contact: Option<String>,
    pub hr_email: Option<String>,
    pub mentor_approval: Option<bool>,
    pub approved_by: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct InternshipDetails {
    pub company_name: String,
    pub internship_type: InternshipType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub stipend: Option<f64>,
    pub location: Option<String>,
    pub hr_contact: Option<String>,
    pub hr_email: Option<String>,
}

impl Internship {
    /// 每个学生只能提交一次，重复提交触发唯一约束
    pub async fn create(
        conn: &mut PgConnection,
        registration_number: &str,
        details: InternshipDetails,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Internship>(
            r#"
            INSERT INTO internships
                (registration_number, company_name, internship_type, start_date, end_date,
                 stipend, location, hr_contact, hr_email)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, registration_number, company_name, internship_type, start_date,
                      end_date, stipend, location, hr_contact, hr_email, mentor_approval,
                      approved_by, created_at
            "#,
        )
        .bind(registration_number)
        .bind(details.company_name)
        .bind(details.internship_type.as_str())
        .bind(details.start_date)
        .bind(details.end_date)
        .bind(details.stipend)
        .bind(details.location)
        .bind(details.hr_contact)
        .bind(details.hr_email)
        .fetch_one(&mut *conn)
        .await
    }

    /// 学生修改后审批状态清空，需要导师重新确认
    pub async fn update(
        conn: &mut PgConnection,
        registration_number: &str,
        details: InternshipDetails,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Internship>(
            r#"
            UPDATE internships
            SET company_name = $2,
                internship_type = $3,
                start_date = $4,
                end_date = $5,
                stipend = $6,
                location = $7,
                hr_contact = $8,
                hr_email = $9,
                mentor_approval = NULL,
                approved_by = NULL
            WHERE registration_number = $1
            RETURNING id, registration_number, company_name, internship_type, start_date,
                      end_date, stipend, location, hr_contact, hr_email, mentor_approval,
                      approved_by, created_at
            "#,
        )
        .bind(registration_number)
        .bind(details.company_name)
        .bind(details.internship_type.as_str())
        .bind(details.start_date)
        .bind(details.end_date)
        .bind(details.stipend)
        .bind(details.location)
        .bind(details.hr_contact)
        .bind(details.hr_email)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn find_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Internship>(
            r#"
            SELECT id, registration_number, company_name, internship_type, start_date,
                   end_date, stipend, location, hr_contact, hr_email, mentor_approval,
                   approved_by, created_at
            FROM internships
            WHERE registration_number = $1
            "#,
        )
        .bind(registration_number)
        .fetch_optional(&mut *conn)
        .await
    }

    pub async fn set_approval(
        conn: &mut PgConnection,
        registration_number: &str,
        mentor_id: i32,
        approved: bool,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Internship>(
            r#"
            UPDATE internships
            SET mentor_approval = $3, approved_by = $2
            WHERE registration_number = $1
            RETURNING id, registration_number, company_name, internship_type, start_date,
                      end_date, stipend, location, hr_contact, hr_email, mentor_approval,
                      approved_by, created_at
            "#,
        )
        .bind(registration_number)
        .bind(mentor_id)
        .bind(approved)
        .fetch_optional(&mut *conn)
        .await
    }
}
