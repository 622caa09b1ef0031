use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    /// HS256 密钥；为空时只接受无签名令牌
    pub token_secret: Option<String>,
    pub signed_tokens: bool,
    pub token_ttl_secs: u64,
    /// 开发模式身份回退，生产环境必须关闭
    pub dev_identity_fallback: bool,
    pub bcrypt_cost: u32,
    pub redis_url: Option<String>,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: String::new(),
            database_max_connections: 10,
            server_host: "0.0.0.0".into(),
            server_port: 3000,
            api_base_uri: String::new(),
            token_secret: None,
            signed_tokens: false,
            token_ttl_secs: 24 * 3600,
            dev_identity_fallback: false,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            redis_url: None,
            rate_limit_window_secs: 60,
            rate_limit_requests: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let token_ttl_secs = env::var("TOKEN_TTL_HOURS")
            .ok()
            .and_then(|v| parse_ttl_hours(&v))
            .unwrap_or(defaults.token_ttl_secs);

        Ok(Config {
            database_url: env::var("DATABASE_URL")?,
            database_max_connections: parse_var(
                "DATABASE_MAX_CONNECTIONS",
                defaults.database_max_connections,
            ),
            server_host: env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parse_var("SERVER_PORT", defaults.server_port),
            api_base_uri: env::var("API_BASE_URI")
                .map(|uri| normalize_base_uri(&uri))
                .unwrap_or(defaults.api_base_uri),
            token_secret: non_empty_var("TOKEN_SECRET"),
            signed_tokens: flag_var("SIGNED_TOKENS"),
            token_ttl_secs,
            dev_identity_fallback: flag_var("DEV_IDENTITY_FALLBACK"),
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost),
            redis_url: non_empty_var("REDIS_URL"),
            rate_limit_window_secs: parse_var("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
        })
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

/// 统一为 `/prefix` 形式，根路径视为空
fn normalize_base_uri(uri: &str) -> String {
    let trimmed = uri.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// `24` 或 `24h`，换算为秒，过大时取上限
fn parse_ttl_hours(value: &str) -> Option<u64> {
    let hours = value.trim().trim_end_matches('h').parse::<u64>().ok()?;
    Some(hours.saturating_mul(3600))
}

fn parse_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn flag_var(key: &str) -> bool {
    parse_flag(env::var(key).ok().as_deref())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_fail_closed() {
        let config = Config::default();
        assert!(!config.dev_identity_fallback);
        assert!(!config.signed_tokens);
        assert!(config.token_secret.is_none());
        assert!(config.redis_url.is_none());
        assert_eq!(config.token_ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn base_uri_is_normalized() {
        assert_eq!(normalize_base_uri(""), "");
        assert_eq!(normalize_base_uri("/"), "");
        assert_eq!(normalize_base_uri("api/v1/"), "/api/v1");
        assert_eq!(normalize_base_uri("/api"), "/api");
    }

    #[test]
    fn ttl_hours_convert_to_seconds() {
        assert_eq!(parse_ttl_hours("24"), Some(86_400));
        assert_eq!(parse_ttl_hours(" 2h "), Some(7_200));
        assert_eq!(parse_ttl_hours("18446744073709551615"), Some(u64::MAX));
        assert_eq!(parse_ttl_hours("day"), None);
        assert_eq!(parse_ttl_hours("-1"), None);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag(Some("true")));
        assert!(parse_flag(Some(" TRUE ")));
        assert!(parse_flag(Some("1")));
        assert!(parse_flag(Some("on")));
        assert!(!parse_flag(Some("false")));
        assert!(!parse_flag(Some("")));
        assert!(!parse_flag(None));
    }
}
