//! Who is calling: rate-limit key and advisory device details.

use std::net::IpAddr;
use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::ConnectInfo;
use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::domain::rate_limit::models::RateLimitScope;
use crate::domain::session::models::ClientContext;

/// Client address and user agent of the current request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// First `X-Forwarded-For` entry, else `X-Real-IP`, else the peer address.
    /// Header values that are not IP addresses are ignored.
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let forwarded = header_text(headers, "x-forwarded-for")
            .and_then(|value| value.split(',').next())
            .and_then(parse_ip);

        let ip = forwarded
            .or_else(|| header_text(headers, "x-real-ip").and_then(parse_ip))
            .or_else(|| peer.map(|addr| addr.ip()))
            .map(|ip| ip.to_string());

        Self {
            ip,
            user_agent: header_text(headers, header::USER_AGENT.as_str()).map(str::to_string),
        }
    }

    pub fn rate_limit_key(&self, scope: RateLimitScope) -> String {
        scope.key_for(self.ip.as_deref())
    }

    pub fn context(&self) -> ClientContext {
        ClientContext::new(self.user_agent.clone(), self.ip.clone())
    }
}

fn parse_ip(value: &str) -> Option<IpAddr> {
    value.trim().parse().ok()
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientInfo
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_parts(&parts.headers, peer))
    }
}
