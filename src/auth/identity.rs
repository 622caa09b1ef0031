use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::token::{DEFAULT_SESSION, ParsedToken, TokenError};

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Mentor,
    Student,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Mentor => "mentor",
            Role::Student => "student",
        }
    }

    /// 用于错误提示的首字母大写形式
    pub fn title(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Mentor => "Mentor",
            Role::Student => "Student",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "mentor" => Ok(Role::Mentor),
            "student" => Ok(Role::Student),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// 请求调用方身份，由认证中间件写入请求扩展
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i32,
    pub role: Role,
    pub session_id: String,
}

impl Identity {
    pub fn new(user_id: i32, role: Role, session_id: impl Into<String>) -> Self {
        Self {
            user_id,
            role,
            session_id: session_id.into(),
        }
    }
}

/// 开发环境身份回退。
///
/// 令牌缺失或无法解析时返回固定身份（默认 `1/admin/default`），
/// 只在显式开启 `DEV_IDENTITY_FALLBACK` 时由认证中间件使用。
#[derive(Debug, Clone)]
pub struct DevelopmentIdentityProvider {
    fallback: Identity,
}

impl Default for DevelopmentIdentityProvider {
    fn default() -> Self {
        Self {
            fallback: Identity::new(1, Role::Admin, DEFAULT_SESSION),
        }
    }
}

impl DevelopmentIdentityProvider {
    pub fn with_fallback(fallback: Identity) -> Self {
        Self { fallback }
    }

    pub fn resolve(&self, parsed: Result<ParsedToken, TokenError>) -> Identity {
        match parsed {
            Ok(ParsedToken::Identity(identity)) => identity,
            Ok(ParsedToken::BareId(user_id)) => {
                tracing::warn!(
                    user_id,
                    role = %self.fallback.role,
                    "Bare user id token, using development role"
                );
                Identity::new(user_id, self.fallback.role, DEFAULT_SESSION)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    user_id = self.fallback.user_id,
                    "Token rejected, using development identity"
                );
                self.fallback.clone()
            }
        }
    }
}
