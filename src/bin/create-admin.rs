//! 创建管理员账号。管理员无法通过注册接口创建，只能由此工具生成。

use std::process::ExitCode;

use clap::Parser;
use internship_portal::{
    auth::Role,
    error::AppError,
    models::{NewUser, User},
    utils::{hash_password, optional_text, validate_email, validate_password},
};
use sqlx::postgres::PgPoolOptions;

#[derive(Parser)]
#[command(name = "create-admin")]
#[command(about = "Create an admin account for the internship portal", long_about = None)]
struct Cli {
    /// Postgres connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    #[arg(long)]
    email: String,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long)]
    first_name: Option<String>,

    #[arg(long)]
    last_name: Option<String>,

    /// bcrypt cost factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST)]
    bcrypt_cost: u32,

    /// Run pending migrations before creating the account
    #[arg(long)]
    migrate: bool,
}

async fn run(cli: Cli) -> Result<User, AppError> {
    let email = cli.email.trim().to_lowercase();
    validate_email(&email)?;
    validate_password(&cli.password)?;
    let password_hash = hash_password(&cli.password, cli.bcrypt_cost)?;

    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&cli.database_url)
        .await?;

    if cli.migrate {
        sqlx::migrate!("./migrations").run(&pool).await?;
    }

    let first_name = optional_text(cli.first_name);
    let last_name = optional_text(cli.last_name);

    let mut tx = pool.begin().await?;
    let user = User::create(
        &mut tx,
        NewUser {
            email: &email,
            password_hash: &password_hash,
            first_name: first_name.as_deref(),
            last_name: last_name.as_deref(),
            role: Role::Admin,
        },
    )
    .await?;
    tx.commit().await?;

    Ok(user)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .init();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(user) => {
            println!(
                "Created admin {} <{}> with id {}",
                user.display_name(),
                user.email,
                user.id
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to create admin: {e}");
            ExitCode::FAILURE
        }
    }
}
