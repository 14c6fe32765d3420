use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use authgate_auth::{
    MemoryRefreshTokenStorage, NoopAlerter, RefreshTokenStorage, SecurityAlerter, SessionManager,
};
use authgate_auth_postgres::{PoolSettings, PostgresAuthStorage};
use authgate_notifications::{WebhookAlerter, WebhookConfig};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AlertingConfig, AppConfig, StorageBackend, StorageConfig};
use crate::handlers;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<SessionManager>,
}

impl AppState {
    pub fn new(manager: Arc<SessionManager>) -> Self {
        Self { manager }
    }

    /// Wires storage, alerting and the session manager from configuration.
    pub async fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let storage = build_storage(&cfg.storage).await?;
        let alerter = build_alerter(&cfg.alerting)?;
        let manager = SessionManager::from_config(&cfg.auth, storage, alerter)
            .context("failed to initialize session manager")?;
        Ok(Self::new(Arc::new(manager)))
    }
}

async fn build_storage(cfg: &StorageConfig) -> anyhow::Result<Arc<dyn RefreshTokenStorage>> {
    match cfg.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory refresh token storage; sessions are lost on restart");
            Ok(Arc::new(MemoryRefreshTokenStorage::new()))
        }
        StorageBackend::Postgres => {
            let url = cfg
                .postgres
                .url
                .as_deref()
                .context("storage.postgres.url is not set")?;
            let settings = PoolSettings {
                max_connections: cfg.postgres.pool_size,
                acquire_timeout: cfg.postgres.connect_timeout(),
            };
            let storage = PostgresAuthStorage::connect(url, settings)
                .await
                .context("failed to connect to PostgreSQL")?;
            storage
                .ensure_schema()
                .await
                .context("failed to create refresh token schema")?;
            Ok(Arc::new(storage.refresh_token_storage()))
        }
    }
}

fn build_alerter(cfg: &AlertingConfig) -> anyhow::Result<Arc<dyn SecurityAlerter>> {
    let Some(raw) = cfg.webhook_url.as_deref() else {
        tracing::info!("No alert webhook configured; token reuse is only logged");
        return Ok(Arc::new(NoopAlerter));
    };

    let url = url::Url::parse(raw).context("invalid alerting.webhook_url")?;
    tracing::info!(host = url.host_str().unwrap_or(""), "Token reuse alerts go to webhook");
    let alerter = WebhookAlerter::new(WebhookConfig {
        url,
        secret: cfg.webhook_secret.clone(),
        timeout: cfg.timeout,
    })
    .context("failed to build webhook alerter")?;
    Ok(Arc::new(alerter))
}

pub fn build_app(state: AppState, cfg: &AppConfig) -> Router {
    let body_limit = cfg.server.body_limit_bytes;
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/auth/token", post(handlers::issue_tokens))
        .route("/auth/token/refresh", post(handlers::refresh_tokens))
        .route("/auth/me", get(handlers::current_user))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/sessions", get(handlers::list_sessions))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri().path(),
                        http.status_code = Empty,
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
}

pub struct AuthgateServer {
    addr: SocketAddr,
    app: Router,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let config = AppConfig::default();
        Self {
            addr: config.addr(),
            config,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.addr = config.addr();
        self.config = config;
        self
    }

    pub async fn build(self) -> anyhow::Result<AuthgateServer> {
        let state = AppState::from_config(&self.config).await?;
        let app = build_app(state, &self.config);
        Ok(AuthgateServer {
            addr: self.addr,
            app,
        })
    }
}

impl AuthgateServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        tracing::info!(addr = %self.addr, "listening");
        axum::serve(
            listener,
            self.app
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
