use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use redis::AsyncCommands;

use crate::error::AppError;

/// 基于 Redis 计数器的固定窗口限流，按客户端IP计数
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, window: Duration, max_requests: u32) -> Self {
        Self {
            redis,
            window,
            max_requests,
        }
    }

    /// 返回本窗口内的请求计数
    async fn hit(&self, ip: &str) -> redis::RedisResult<u64> {
        let key = format!("rate_limit:{}", ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        // INCR + EXPIRE 实现计数器
        let count: u64 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, self.window.as_secs() as i64).await?;
        }
        Ok(count)
    }

    pub async fn check(&self, ip: &str) -> Result<(), AppError> {
        match self.hit(ip).await {
            Ok(count) if count > u64::from(self.max_requests) => {
                tracing::warn!(ip, count, "Rate limit exceeded");
                Err(AppError::RateLimited(self.window.as_secs()))
            }
            Ok(_) => Ok(()),
            Err(e) => {
                // Redis 不可用时放行
                tracing::warn!(error = %e, "Rate limiter unavailable, allowing request");
                Ok(())
            }
        }
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let remote_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string());
    let ip = client_ip(req.headers(), remote_ip.as_deref());

    limiter.check(&ip).await?;
    Ok(next.run(req).await)
}

/// 依次取 x-real-ip、x-forwarded-for 首项、连接地址
fn client_ip(headers: &HeaderMap, remote_ip: Option<&str>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip)
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_real_ip_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.1"));
        headers.insert("x-forwarded-for", HeaderValue::from_static("10.0.0.2"));
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "10.0.0.1");
    }

    #[test]
    fn falls_back_to_forwarded_then_remote() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static(" 10.0.0.2 , 10.0.0.3"),
        );
        assert_eq!(client_ip(&headers, Some("127.0.0.1")), "10.0.0.2");
        assert_eq!(client_ip(&HeaderMap::new(), Some("127.0.0.1")), "127.0.0.1");
        assert_eq!(client_ip(&HeaderMap::new(), None), "unknown");
    }

    #[tokio::test]
    async fn unreachable_redis_fails_open() {
        let client = redis::Client::open("redis://127.0.0.1:1/").unwrap();
        let limiter = RateLimiter::new(Arc::new(client), Duration::from_secs(60), 1);
        assert!(limiter.check("10.0.0.1").await.is_ok());
    }
}
