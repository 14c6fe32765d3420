use authgate_auth::{RefreshTokenRecord, TokenPair};
use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::{AuthenticatedUser, ClientContext};
use crate::server::AppState;

#[derive(Debug, Deserialize)]
pub struct TokenParams {
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshForm {
    refresh_token: Option<String>,
}

/// Active session as listed to its owner. Never includes the token digest.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub user_agent: String,
    pub ip: String,
    #[serde(with = "time::serde::rfc3339")]
    pub issued_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

impl From<RefreshTokenRecord> for SessionView {
    fn from(record: RefreshTokenRecord) -> Self {
        Self {
            id: record.id,
            user_agent: record.user_agent,
            ip: record.ip,
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }
    }
}

pub async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /auth/token?user_id=<uuid>
pub async fn issue_tokens(
    State(state): State<AppState>,
    ctx: ClientContext,
    params: Result<Query<TokenParams>, QueryRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let raw = params
        .ok()
        .and_then(|Query(p)| p.user_id)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("user_id is required"))?;
    let user_id =
        Uuid::parse_str(&raw).map_err(|_| ApiError::bad_request("invalid user_id format"))?;

    let pair = state
        .manager
        .generate_token_pair(user_id, &ctx.user_agent, &ctx.ip)
        .await?;
    Ok(Json(pair))
}

/// POST /auth/token/refresh (form field `refresh_token`)
pub async fn refresh_tokens(
    State(state): State<AppState>,
    ctx: ClientContext,
    form: Result<Form<RefreshForm>, FormRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let refresh_token = form
        .ok()
        .and_then(|Form(f)| f.refresh_token)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("refresh_token is required"))?;

    let pair = state
        .manager
        .refresh_tokens(&refresh_token, &ctx.user_agent, &ctx.ip)
        .await?;
    Ok(Json(pair))
}

/// GET /auth/me
pub async fn current_user(user: AuthenticatedUser) -> Json<Value> {
    Json(json!({ "user_id": user.user_id }))
}

/// POST /auth/logout
pub async fn logout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, ApiError> {
    state.manager.revoke_tokens(user.user_id).await?;
    Ok(Json(json!({ "message": "logged out successfully" })))
}

/// GET /auth/sessions
pub async fn list_sessions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<SessionView>>, ApiError> {
    let sessions = state.manager.list_sessions(user.user_id).await?;
    Ok(Json(sessions.into_iter().map(SessionView::from).collect()))
}
