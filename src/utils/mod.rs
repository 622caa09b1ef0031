use std::fmt::Display;

use bcrypt::{hash, verify};
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnpqrstuvwxyz23456789!@#$%&*";
pub const GENERATED_PASSWORD_LEN: usize = 12;
pub const MIN_PASSWORD_LEN: usize = 6;

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password.as_bytes(), cost)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password.as_bytes(), hash)
}

/// 生成随机初始密码
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .filter_map(|_| PASSWORD_ALPHABET.choose(&mut rng))
        .map(|b| *b as char)
        .collect()
}

/// 新的重置令牌（明文只返回给调用方，库中只保存摘要）
pub fn new_reset_token() -> String {
    Uuid::new_v4().simple().to_string()
}

pub fn digest_reset_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}

// 请求字段校验

pub fn required<T>(value: Option<T>, field: &'static str) -> Result<T, AppError> {
    value.ok_or(AppError::MissingField(field))
}

/// 去除首尾空白后不能为空
pub fn required_text(value: Option<String>, field: &'static str) -> Result<String, AppError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::MissingField(field)),
    }
}

/// 可选文本：空串视为未提供
pub fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn ensure_range<T>(value: T, min: T, max: T, field: &str) -> Result<T, AppError>
where
    T: PartialOrd + Display + Copy,
{
    if value < min || value > max {
        return Err(AppError::Validation(format!(
            "{field} must be between {min} and {max}"
        )));
    }
    Ok(value)
}

pub fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("Invalid email address".into()))
    }
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub mod error_codes {
    pub const VALIDATION_ERROR: i32 = 1000;
    pub const CONFLICT: i32 = 1001;
    pub const AUTH_FAILED: i32 = 1002;
    pub const PERMISSION_DENIED: i32 = 1003;
    pub const NOT_FOUND: i32 = 1004;
    pub const RATE_LIMIT: i32 = 1005;
    pub const INTERNAL_ERROR: i32 = 5000;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies() {
        let hashed = hash_password("s3cret!", 4).unwrap();
        assert!(verify_password("s3cret!", &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn generated_password_uses_alphabet() {
        let password = generate_password(GENERATED_PASSWORD_LEN);
        assert_eq!(password.len(), GENERATED_PASSWORD_LEN);
        assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        assert_ne!(password, generate_password(GENERATED_PASSWORD_LEN));
    }

    #[test]
    fn reset_token_digest_is_stable_hex() {
        let token = new_reset_token();
        assert_eq!(token.len(), 32);
        let digest = digest_reset_token(&token);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, digest_reset_token(&token));
        assert_ne!(digest, digest_reset_token(&new_reset_token()));
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(
            required_text(Some("  R100 ".into()), "registration_number").unwrap(),
            "R100"
        );
        assert!(matches!(
            required_text(Some("   ".into()), "name"),
            Err(AppError::MissingField("name"))
        ));
        assert!(matches!(
            required::<i32>(None, "mentor_id"),
            Err(AppError::MissingField("mentor_id"))
        ));
        assert_eq!(optional_text(Some(" ".into())), None);
    }

    #[test]
    fn range_check_is_inclusive() {
        assert_eq!(ensure_range(100.0, 0.0, 100.0, "marks").unwrap(), 100.0);
        assert_eq!(ensure_range(1, 1, 5, "rating").unwrap(), 1);
        let err = ensure_range(6, 1, 5, "rating").unwrap_err();
        assert_eq!(err.to_string(), "rating must be between 1 and 5");
    }

    #[test]
    fn email_and_password_rules() {
        assert!(validate_email("a@b.io").is_ok());
        assert!(validate_email("nobody").is_err());
        assert!(validate_email("@b.io").is_err());
        assert!(validate_email("a@localhost").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password("12345").is_err());
    }
}
