//! 会话令牌编解码。
//!
//! 无签名格式为 `token:<user_id>:<role>:<session_id>`，同时接受
//! `<user_id>:<role>` 与纯数字用户ID。配置了 `TOKEN_SECRET` 时还接受
//! 携带相同字段的 HS256 JWT。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use super::identity::{Identity, Role};
use crate::config::Config;

pub const TOKEN_TAG: &str = "token";
pub const DEFAULT_SESSION: &str = "default";
const DELIMITER: char = ':';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Authentication token is missing")]
    Missing,
    #[error("Malformed token: {0}")]
    Malformed(String),
    #[error("Unknown role in token: {0}")]
    UnknownRole(String),
    #[error("Token does not carry a role")]
    MissingRole,
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token: {0}")]
    Invalid(String),
}

/// 解析结果：完整身份，或只有用户ID的裸令牌
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedToken {
    Identity(Identity),
    BareId(i32),
}

#[derive(Debug, Serialize, Deserialize)]
struct SignedClaims {
    user_id: i32,
    role: Role,
    session_id: String,
    iat: i64,
    exp: i64,
}

/// 登录或刷新时签发的令牌
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

#[derive(Clone)]
pub struct TokenCodec {
    secret: Option<Arc<str>>,
    sign: bool,
    ttl: Duration,
}

impl TokenCodec {
    /// 只处理无签名格式
    pub fn unsigned() -> Self {
        Self {
            secret: None,
            sign: false,
            ttl: Duration::from_secs(24 * 3600),
        }
    }

    /// 签发 HS256 JWT，同时仍可解析无签名格式
    pub fn signed(secret: &str, ttl: Duration) -> Self {
        Self {
            secret: Some(Arc::from(secret)),
            sign: true,
            ttl,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let secret: Option<Arc<str>> = config.token_secret.as_deref().map(Arc::from);
        if config.signed_tokens && secret.is_none() {
            tracing::warn!("SIGNED_TOKENS is set but TOKEN_SECRET is empty, issuing unsigned tokens");
        }
        Self {
            sign: config.signed_tokens && secret.is_some(),
            secret,
            ttl: config.token_ttl(),
        }
    }

    pub fn issues_signed(&self) -> bool {
        self.sign
    }

    /// 生成会话ID：`session_<user_id>_<role>_<unix秒>`
    pub fn session_id(user_id: i32, role: Role) -> String {
        format!("session_{}_{}_{}", user_id, role, Utc::now().timestamp())
    }

    pub fn issue(
        &self,
        user_id: i32,
        role: Role,
        session_id: Option<String>,
    ) -> Result<IssuedToken, TokenError> {
        let session_id = session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| Self::session_id(user_id, role));
        let identity = Identity::new(user_id, role, session_id);

        match (&self.secret, self.sign) {
            (Some(secret), true) => {
                let (token, expires_at) = self.encode_signed(&identity, secret)?;
                Ok(IssuedToken {
                    token,
                    identity,
                    expires_at: Some(expires_at),
                })
            }
            _ => Ok(IssuedToken {
                token: Self::encode_tagged(&identity),
                identity,
                expires_at: None,
            }),
        }
    }

    pub fn encode_tagged(identity: &Identity) -> String {
        format!(
            "{TOKEN_TAG}{DELIMITER}{}{DELIMITER}{}{DELIMITER}{}",
            identity.user_id, identity.role, identity.session_id
        )
    }

    fn encode_signed(&self, identity: &Identity, secret: &str) -> Result<(String, i64), TokenError> {
        let now = Utc::now().timestamp();
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = now.saturating_add(ttl);
        let claims = SignedClaims {
            user_id: identity.user_id,
            role: identity.role,
            session_id: identity.session_id.clone(),
            iat: now,
            exp: expires_at,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| TokenError::Invalid(e.to_string()))?;
        Ok((token, expires_at))
    }

    fn decode_signed(&self, raw: &str, secret: &str) -> Result<Identity, TokenError> {
        let data = decode::<SignedClaims>(
            raw,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e.to_string()),
        })?;
        let claims = data.claims;
        Ok(Identity::new(claims.user_id, claims.role, claims.session_id))
    }

    /// 按形状解析令牌，不做角色补全
    pub fn parse(&self, raw: &str) -> Result<ParsedToken, TokenError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TokenError::Missing);
        }

        if looks_like_jwt(raw) {
            return match &self.secret {
                Some(secret) => self.decode_signed(raw, secret).map(ParsedToken::Identity),
                None => Err(TokenError::Malformed(
                    "signed token received but no secret is configured".into(),
                )),
            };
        }

        let parts: Vec<&str> = raw.splitn(4, DELIMITER).collect();
        match parts.as_slice() {
            [TOKEN_TAG, user_id, role] => tagged_identity(user_id, role, DEFAULT_SESSION),
            [TOKEN_TAG, user_id, role, session] => tagged_identity(user_id, role, session),
            [TOKEN_TAG] | [TOKEN_TAG, _] => Err(TokenError::Malformed(
                "tagged token needs a user id and a role".into(),
            )),
            [user_id, role] => tagged_identity(user_id, role, DEFAULT_SESSION),
            [user_id] => parse_user_id(user_id).map(ParsedToken::BareId),
            _ => Err(TokenError::Malformed("unrecognised token shape".into())),
        }
    }

    /// 严格解码：任何无法得到完整身份的令牌都被拒绝
    pub fn decode(&self, raw: &str) -> Result<Identity, TokenError> {
        match self.parse(raw)? {
            ParsedToken::Identity(identity) => Ok(identity),
            ParsedToken::BareId(_) => Err(TokenError::MissingRole),
        }
    }
}

fn looks_like_jwt(raw: &str) -> bool {
    !raw.contains(DELIMITER) && raw.split('.').count() == 3
}

fn parse_user_id(raw: &str) -> Result<i32, TokenError> {
    raw.parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| TokenError::Malformed(format!("invalid user id `{raw}`")))
}

fn tagged_identity(user_id: &str, role: &str, session: &str) -> Result<ParsedToken, TokenError> {
    let user_id = parse_user_id(user_id)?;
    let role = role
        .parse::<Role>()
        .map_err(|e| TokenError::UnknownRole(e.0))?;
    let session = if session.is_empty() {
        DEFAULT_SESSION
    } else {
        session
    };
    Ok(ParsedToken::Identity(Identity::new(user_id, role, session)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_documented_example() {
        let codec = TokenCodec::unsigned();
        let identity = codec.decode("token:7:mentor:s1").unwrap();
        assert_eq!(identity, Identity::new(7, Role::Mentor, "s1"));
    }

    #[test]
    fn tagged_round_trip() {
        let codec = TokenCodec::unsigned();
        for identity in [
            Identity::new(1, Role::Admin, "default"),
            Identity::new(42, Role::Student, "session_42_student_1700000000"),
            Identity::new(i32::MAX, Role::Mentor, "with:colons:inside"),
        ] {
            let token = TokenCodec::encode_tagged(&identity);
            assert_eq!(codec.decode(&token).unwrap(), identity);
        }
    }

    #[test]
    fn issue_generates_session_id() {
        let codec = TokenCodec::unsigned();
        let issued = codec.issue(5, Role::Student, None).unwrap();
        assert!(issued.identity.session_id.starts_with("session_5_student_"));
        assert!(issued.token.starts_with("token:5:student:session_5_student_"));
        assert!(issued.expires_at.is_none());
        assert_eq!(codec.decode(&issued.token).unwrap(), issued.identity);
    }

    #[test]
    fn accepts_short_shapes() {
        let codec = TokenCodec::unsigned();
        assert_eq!(
            codec.decode("token:3:admin").unwrap(),
            Identity::new(3, Role::Admin, DEFAULT_SESSION)
        );
        assert_eq!(
            codec.decode("12:student").unwrap(),
            Identity::new(12, Role::Student, DEFAULT_SESSION)
        );
        assert_eq!(codec.parse("99").unwrap(), ParsedToken::BareId(99));
    }

    #[test]
    fn strict_decode_fails_closed() {
        let codec = TokenCodec::unsigned();
        assert_eq!(codec.decode(""), Err(TokenError::Missing));
        assert_eq!(codec.decode("   "), Err(TokenError::Missing));
        assert_eq!(codec.decode("99"), Err(TokenError::MissingRole));
        assert!(matches!(codec.decode("token:abc:admin"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.decode("token:7"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.decode("token:-1:admin"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.decode("dev_token"), Err(TokenError::Malformed(_))));
        assert!(matches!(codec.decode("7:mentor:extra"), Err(TokenError::Malformed(_))));
        assert_eq!(
            codec.decode("token:7:superuser:s1"),
            Err(TokenError::UnknownRole("superuser".into()))
        );
    }

    #[test]
    fn signed_round_trip() {
        let codec = TokenCodec::signed("test-secret", Duration::from_secs(3600));
        let issued = codec.issue(7, Role::Mentor, Some("s1".into())).unwrap();
        assert!(!issued.token.starts_with(TOKEN_TAG));
        assert!(issued.expires_at.is_some());
        assert_eq!(
            codec.decode(&issued.token).unwrap(),
            Identity::new(7, Role::Mentor, "s1")
        );
        // 签名模式下仍接受无签名格式
        assert_eq!(
            codec.decode("token:7:mentor:s1").unwrap(),
            Identity::new(7, Role::Mentor, "s1")
        );
    }

    #[test]
    fn huge_ttl_saturates_expiry() {
        let codec = TokenCodec::signed("test-secret", Duration::from_secs(u64::MAX));
        let issued = codec.issue(7, Role::Mentor, Some("s1".into())).unwrap();
        assert_eq!(issued.expires_at, Some(i64::MAX));
        assert_eq!(
            codec.decode(&issued.token).unwrap(),
            Identity::new(7, Role::Mentor, "s1")
        );
    }

    #[test]
    fn signed_token_rejected_with_wrong_secret() {
        let issuer = TokenCodec::signed("secret-a", Duration::from_secs(3600));
        let verifier = TokenCodec::signed("secret-b", Duration::from_secs(3600));
        let issued = issuer.issue(7, Role::Mentor, None).unwrap();
        assert!(matches!(verifier.decode(&issued.token), Err(TokenError::Invalid(_))));
        assert!(matches!(
            TokenCodec::unsigned().decode(&issued.token),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn expired_signed_token_rejected() {
        let secret = "test-secret";
        let now = Utc::now().timestamp();
        let claims = SignedClaims {
            user_id: 7,
            role: Role::Mentor,
            session_id: "s1".into(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();
        let codec = TokenCodec::signed(secret, Duration::from_secs(3600));
        assert_eq!(codec.decode(&token), Err(TokenError::Expired));
    }

    #[test]
    fn from_config_requires_secret_for_signing() {
        let config = Config {
            signed_tokens: true,
            ..Config::default()
        };
        assert!(!TokenCodec::from_config(&config).issues_signed());

        let config = Config {
            signed_tokens: true,
            token_secret: Some("s".into()),
            ..Config::default()
        };
        assert!(TokenCodec::from_config(&config).issues_signed());
    }
}
