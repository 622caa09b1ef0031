use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    FromRow, PgConnection, Postgres,
    postgres::PgArguments,
    query::QueryAs,
};

/// 学生家长信息
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Parent {
    pub id: i32,
    pub registration_number: String,

    pub father_name: Option<String>,
    pub father_is_entrepreneur: bool,
    pub father_is_family_business: bool,
    pub father_is_public_sector: bool,
    pub father_is_professional: bool,
    pub father_is_govt_employee: bool,
    pub father_is_private_company: bool,
    pub father_organization: Option<String>,
    pub father_designation: Option<String>,
    pub father_mobile_no: Option<String>,
    pub father_email: Option<String>,

    pub mother_name: Option<String>,
    pub mother_is_entrepreneur: bool,
    pub mother_is_family_business: bool,
    pub mother_is_public_sector: bool,
    pub mother_is_professional: bool,
    pub mother_is_govt_employee: bool,
    pub mother_is_private_company: bool,
    pub mother_is_home_maker: bool,
    pub mother_organization: Option<String>,
    pub mother_designation: Option<String>,
    pub mother_mobile_no: Option<String>,
    pub mother_email: Option<String>,

    pub business_card_image: Option<String>,
    pub communication_address: Option<String>,
    pub permanent_address: Option<String>,
    pub pin_code: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// 创建或修改家长信息的字段，`None` 表示未提供。
///
/// 创建时未提供的标志位为 `false`；修改时未提供的字段保持原值。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentChanges {
    pub father_name: Option<String>,
    pub father_is_entrepreneur: Option<bool>,
    pub father_is_family_business: Option<bool>,
    pub father_is_public_sector: Option<bool>,
    pub father_is_professional: Option<bool>,
    pub father_is_govt_employee: Option<bool>,
    pub father_is_private_company: Option<bool>,
    pub father_organization: Option<String>,
    pub father_designation: Option<String>,
    pub father_mobile_no: Option<String>,
    pub father_email: Option<String>,

    pub mother_name: Option<String>,
    pub mother_is_entrepreneur: Option<bool>,
    pub mother_is_family_business: Option<bool>,
    pub mother_is_public_sector: Option<bool>,
    pub mother_is_professional: Option<bool>,
    pub mother_is_govt_employee: Option<bool>,
    pub mother_is_private_company: Option<bool>,
    pub mother_is_home_maker: Option<bool>,
    pub mother_organization: Option<String>,
    pub mother_designation: Option<String>,
    pub mother_mobile_no: Option<String>,
    pub mother_email: Option<String>,

    pub business_card_image: Option<String>,
    pub communication_address: Option<String>,
    pub permanent_address: Option<String>,
    pub pin_code: Option<String>,
}

// 按 $2..$28 的顺序绑定
fn bind_changes<'q>(
    query: QueryAs<'q, Postgres, Parent, PgArguments>,
    changes: ParentChanges,
) -> QueryAs<'q, Postgres, Parent, PgArguments> {
    query
        .bind(changes.father_name)
        .bind(changes.father_is_entrepreneur)
        .bind(changes.father_is_family_business)
        .bind(changes.father_is_public_sector)
        .bind(changes.father_is_professional)
        .bind(changes.father_is_govt_employee)
        .bind(changes.father_is_private_company)
        .bind(changes.father_organization)
        .bind(changes.father_designation)
        .bind(changes.father_mobile_no)
        .bind(changes.father_email)
        .bind(changes.mother_name)
        .bind(changes.mother_is_entrepreneur)
        .bind(changes.mother_is_family_business)
        .bind(changes.mother_is_public_sector)
        .bind(changes.mother_is_professional)
        .bind(changes.mother_is_govt_employee)
        .bind(changes.mother_is_private_company)
        .bind(changes.mother_is_home_maker)
        .bind(changes.mother_organization)
        .bind(changes.mother_designation)
        .bind(changes.mother_mobile_no)
        .bind(changes.mother_email)
        .bind(changes.business_card_image)
        .bind(changes.communication_address)
        .bind(changes.permanent_address)
        .bind(changes.pin_code)
}

impl Parent {
    pub async fn find_for_student(
        conn: &mut PgConnection,
        registration_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Parent>("SELECT * FROM parents WHERE registration_number = $1")
            .bind(registration_number)
            .fetch_optional(&mut *conn)
            .await
    }

    /// 每个学生一条，重复创建触发唯一约束
    pub async fn create(
        conn: &mut PgConnection,
        registration_number: &str,
        changes: ParentChanges,
    ) -> Result<Self, sqlx::Error> {
        let query = sqlx::query_as::<_, Parent>(
            r#"
            INSERT INTO parents (
                registration_number,
                father_name, father_is_entrepreneur, father_is_family_business,
                father_is_public_sector, father_is_professional, father_is_govt_employee,
                father_is_private_company, father_organization, father_designation,
                father_mobile_no, father_email,
                mother_name, mother_is_entrepreneur, mother_is_family_business,
                mother_is_public_sector, mother_is_professional, mother_is_govt_employee,
                mother_is_private_company, mother_is_home_maker, mother_organization,
                mother_designation, mother_mobile_no, mother_email,
                business_card_image, communication_address, permanent_address, pin_code
            )
            VALUES (
                $1,
                $2, COALESCE($3, FALSE), COALESCE($4, FALSE),
                COALESCE($5, FALSE), COALESCE($6, FALSE), COALESCE($7, FALSE),
                COALESCE($8, FALSE), $9, $10,
                $11, $12,
                $13, COALESCE($14, FALSE), COALESCE($15, FALSE),
                COALESCE($16, FALSE), COALESCE($17, FALSE), COALESCE($18, FALSE),
                COALESCE($19, FALSE), COALESCE($20, FALSE), $21,
                $22, $23, $24,
                $25, $26, $27, $28
            )
            RETURNING *
            "#,
        )
        .bind(registration_number);

        let parent = bind_changes(query, changes).fetch_one(&mut *conn).await?;
        tracing::info!(registration_number, "Created parent record");
        Ok(parent)
    }

    pub async fn update(
        conn: &mut PgConnection,
        registration_number: &str,
        changes: ParentChanges,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = sqlx::query_as::<_, Parent>(
            r#"
            UPDATE parents
            SET father_name = COALESCE($2, father_name),
                father_is_entrepreneur = COALESCE($3, father_is_entrepreneur),
                father_is_family_business = COALESCE($4, father_is_family_business),
                father_is_public_sector = COALESCE($5, father_is_public_sector),
                father_is_professional = COALESCE($6, father_is_professional),
                father_is_govt_employee = COALESCE($7, father_is_govt_employee),
                father_is_private_company = COALESCE($8, father_is_private_company),
                father_organization = COALESCE($9, father_organization),
                father_designation = COALESCE($10, father_designation),
                father_mobile_no = COALESCE($11, father_mobile_no),
                father_email = COALESCE($12, father_email),
                mother_name = COALESCE($13, mother_name),
                mother_is_entrepreneur = COALESCE($14, mother_is_entrepreneur),
                mother_is_family_business = COALESCE($15, mother_is_family_business),
                mother_is_public_sector = COALESCE($16, mother_is_public_sector),
                mother_is_professional = COALESCE($17, mother_is_professional),
                mother_is_govt_employee = COALESCE($18, mother_is_govt_employee),
                mother_is_private_company = COALESCE($19, mother_is_private_company),
                mother_is_home_maker = COALESCE($20, mother_is_home_maker),
                mother_organization = COALESCE($21, mother_organization),
                mother_designation = COALESCE($22, mother_designation),
                mother_mobile_no = COALESCE($23, mother_mobile_no),
                mother_email = COALESCE($24, mother_email),
                business_card_image = COALESCE($25, business_card_image),
                communication_address = COALESCE($26, communication_address),
                permanent_address = COALESCE($27, permanent_address),
                pin_code = COALESCE($28, pin_code),
                updated_at = NOW()
            WHERE registration_number = $1
            RETURNING *
            "#,
        )
        .bind(registration_number);

        bind_changes(query, changes)
            .fetch_optional(&mut *conn)
            .await
    }
}
