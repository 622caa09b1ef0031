// 身份认证模块
// 会话令牌编解码与调用方身份

pub mod identity;
pub mod token;

pub use identity::{DevelopmentIdentityProvider, Identity, Role, UnknownRole};
pub use token::{IssuedToken, ParsedToken, TokenCodec, TokenError};
