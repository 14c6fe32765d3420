//! Request extractors.
//!
//! [`ClientContext`] captures the caller metadata recorded on refresh token
//! records. [`AuthenticatedUser`] verifies the bearer access token.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, USER_AGENT},
        request::Parts,
    },
};
use uuid::Uuid;

use crate::error::ApiError;
use crate::server::AppState;

const X_FORWARDED_FOR: &str = "x-forwarded-for";
const X_REAL_IP: &str = "x-real-ip";

/// User agent and IP of the calling client. Empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: String,
    pub ip: String,
}

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = header_str(&parts.headers, USER_AGENT.as_str())
            .unwrap_or_default()
            .to_string();

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self {
            user_agent,
            ip: client_ip(&parts.headers, peer),
        })
    }
}

/// Resolves the client IP: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<String>) -> String {
    if let Some(forwarded) = header_str(headers, X_FORWARDED_FOR)
        && let Some(first) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty())
    {
        return first.to_string();
    }
    if let Some(real_ip) = header_str(headers, X_REAL_IP).map(str::trim)
        && !real_ip.is_empty()
    {
        return real_ip.to_string();
    }
    peer.unwrap_or_default()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extracts the token from an `Authorization: Bearer <token>` value.
///
/// # Errors
///
/// Returns `ApiError::Unauthorized` unless the value is exactly the `Bearer`
/// scheme followed by one non-empty token.
pub fn parse_bearer(header: &str) -> Result<&str, ApiError> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(ApiError::unauthorized("invalid authorization header")),
    }
}

/// User whose access token was verified for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let header = header_str(&parts.headers, AUTHORIZATION.as_str())
            .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;
        let token = parse_bearer(header)?;

        let user_id = state.manager.validate_access_token(token)?;
        Ok(Self { user_id })
    }
}
