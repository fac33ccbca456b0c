//! Rate limiting middleware using governor and `tower_governor`.
//!
//! - `auth_rate_limiter`: login and registration (~10/min per IP)
//! - `otp_rate_limiter`: delivery-code verification (~6/min per IP), so a
//!   six-digit code cannot be brute forced within its lifetime

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderValue, Request, header};
use axum::response::{IntoResponse, Response};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

use crate::error::AppError;

/// Client IP from proxy headers: `CF-Connecting-IP`, then the first
/// `X-Forwarded-For` entry, then `X-Real-IP`. Falls back to the peer address
/// when the server runs with connect info.
#[derive(Clone, Copy)]
pub struct ProxyIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ProxyIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();
        let header_ip = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        };

        header_ip("cf-connecting-ip")
            .or_else(|| header_ip("x-forwarded-for"))
            .or_else(|| header_ip("x-real-ip"))
            .or_else(|| {
                req.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .or_else(|| req.extensions().get::<SocketAddr>().map(SocketAddr::ip))
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ProxyIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// JSON body for limiter rejections, matching every other API error.
fn rejection(err: GovernorError) -> Response {
    match err {
        GovernorError::TooManyRequests { wait_time, .. } => {
            let mut response = AppError::RateLimited.into_response();
            if let Ok(value) = HeaderValue::from_str(&wait_time.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        GovernorError::UnableToExtractKey => {
            AppError::Internal("unable to determine client address".to_owned()).into_response()
        }
        _ => AppError::Internal("rate limiter failure".to_owned()).into_response(),
    }
}

/// Rate limiter for auth endpoints: 1 token every 6 seconds, burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(6)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn auth_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(6)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(6) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection)
}

/// Rate limiter for delivery-code verification: 1 token every 10 seconds,
/// burst of 5.
///
/// # Panics
///
/// Does not panic: `per_second(10)` and `burst_size(5)` are valid positive
/// values for `GovernorConfigBuilder`.
#[must_use]
#[allow(clippy::expect_used)]
pub fn otp_rate_limiter() -> RateLimiterLayer {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ProxyIpKeyExtractor)
        .per_second(10)
        .burst_size(5)
        .finish()
        .expect("rate limiter config with per_second(10) and burst_size(5) is valid");
    GovernorLayer::new(Arc::new(config)).error_handler(rejection)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tower_governor::key_extractor::KeyExtractor;

    use super::*;

    fn request(headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    fn extract(headers: &[(&str, &str)]) -> Option<IpAddr> {
        ProxyIpKeyExtractor.extract(&request(headers)).ok()
    }

    #[test]
    fn test_prefers_cloudflare_header() {
        let ip = extract(&[
            ("x-forwarded-for", "10.0.0.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(ip, Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_first_forwarded_hop() {
        let ip = extract(&[("x-forwarded-for", "198.51.100.2, 10.0.0.1")]);
        assert_eq!(ip, Some("198.51.100.2".parse().unwrap()));
    }

    #[test]
    fn test_no_headers_is_an_error() {
        assert_eq!(extract(&[]), None);
        assert_eq!(extract(&[("x-real-ip", "not-an-ip")]), None);
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let peer: SocketAddr = "192.0.2.44:51234".parse().unwrap();
        let mut req = request(&[]);
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(ProxyIpKeyExtractor.extract(&req).ok(), Some(peer.ip()));

        let mut req = request(&[("x-forwarded-for", "198.51.100.2")]);
        req.extensions_mut().insert(ConnectInfo(peer));
        assert_eq!(
            ProxyIpKeyExtractor.extract(&req).ok(),
            Some("198.51.100.2".parse().unwrap())
        );
    }

    #[tokio::test]
    async fn test_rejections_are_json() {
        let response = rejection(GovernorError::TooManyRequests {
            wait_time: 6,
            headers: None,
        });
        assert_eq!(response.status(), axum::http::StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "6");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Too many requests, please try again later");
    }
}
