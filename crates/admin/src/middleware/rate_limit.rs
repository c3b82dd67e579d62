//! Login throttling using governor and `tower_governor`.
//!
//! Only `POST /auth/login` is limited. The admin runs behind a proxy, so the
//! client address comes from forwarding headers before the socket peer.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

/// Seconds to replenish one login attempt.
pub const LOGIN_REPLENISH_SECONDS: u64 = 6;

/// Login attempts allowed back to back before throttling starts.
pub const LOGIN_BURST: u32 = 5;

/// Key extractor for the operator's address.
///
/// Checks `X-Forwarded-For` (first hop), `X-Real-IP` and `Fly-Client-IP`,
/// then the socket peer. Requests with none of these share one bucket.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let headers = req.headers();

        if let Some(ip) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
        {
            return Ok(ip);
        }

        for name in ["x-real-ip", "fly-client-ip"] {
            if let Some(ip) = headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
            {
                return Ok(ip);
            }
        }

        if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
            return Ok(addr.ip());
        }

        Ok(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }
}

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rate limiter for the login form: a burst of five, then one attempt every
/// six seconds per client address.
///
/// Returns `None` only if governor rejects the quota.
#[must_use]
pub fn login_rate_limiter() -> Option<RateLimiterLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(LOGIN_REPLENISH_SECONDS)
        .burst_size(LOGIN_BURST)
        .finish()?;
    Some(GovernorLayer::new(Arc::new(config)))
}
