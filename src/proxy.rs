//! Same-origin fetch proxy for share pages.
//!
//! `GET /proxy?url=<target>` returns the target's body with its original
//! content type, provided the target host is on the allowlist. Responses carry
//! permissive CORS headers so a browser page can read them.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::share::{BROWSER_USER_AGENT, HTML_ACCEPT};

pub const DEFAULT_ALLOWED_HOSTS: &[&str] =
    &["doubao.com", "chatgpt.com", "chat.openai.com", "gemini.google.com"];

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

#[derive(Clone)]
pub struct ProxyState {
    client: reqwest::Client,
    allowed_hosts: Arc<Vec<String>>,
}

impl ProxyState {
    pub fn new(allowed_hosts: Vec<String>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            allowed_hosts: Arc::new(allowed_hosts),
        })
    }
}

#[derive(Deserialize)]
struct ProxyQuery {
    url: Option<String>,
}

/// Exact match, or any subdomain of an allowed host.
pub fn is_allowed_host(host: &str, allowed: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    allowed.iter().any(|allowed| {
        host == *allowed
            || host
                .strip_suffix(allowed.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

fn error(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

async fn proxy(State(state): State<ProxyState>, Query(query): Query<ProxyQuery>) -> Response {
    let Some(target) = query.url.filter(|url| !url.is_empty()) else {
        return error(StatusCode::BAD_REQUEST, "missing_url");
    };
    let Ok(target) = Url::parse(&target) else {
        return error(StatusCode::BAD_REQUEST, "invalid_url");
    };
    if !matches!(target.scheme(), "http" | "https") {
        return error(StatusCode::BAD_REQUEST, "invalid_protocol");
    }
    if !target
        .host_str()
        .is_some_and(|host| is_allowed_host(host, &state.allowed_hosts))
    {
        warn!(%target, "refusing host outside the allowlist");
        return error(StatusCode::FORBIDDEN, "forbidden_host");
    }

    let upstream = match state
        .client
        .get(target.clone())
        .header(reqwest::header::ACCEPT, HTML_ACCEPT)
        .send()
        .await
    {
        Ok(upstream) => upstream,
        Err(err) => {
            warn!(%target, %err, "upstream unreachable");
            return error(StatusCode::BAD_GATEWAY, "proxy_error");
        }
    };

    let status = upstream.status().as_u16();
    if !upstream.status().is_success() {
        let forwarded = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
        return (
            forwarded,
            Json(json!({ "error": "fetch_failed", "status": status })),
        )
            .into_response();
    }

    let content_type = upstream
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_owned();

    match upstream.text().await {
        Ok(body) => {
            info!(%target, bytes = body.len(), "proxied share page");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CACHE_CONTROL, "no-store".to_owned()),
                ],
                body,
            )
                .into_response()
        }
        Err(err) => {
            warn!(%target, %err, "failed to read upstream body");
            error(StatusCode::BAD_GATEWAY, "proxy_error")
        }
    }
}

async fn preflight() -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
            (header::ACCESS_CONTROL_MAX_AGE, "86400"),
        ],
    )
}

async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "GET, OPTIONS")],
        "Method Not Allowed",
    )
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route(
            "/proxy",
            get(proxy).options(preflight).fallback(method_not_allowed),
        )
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

pub async fn serve(config: &ProxyConfig) -> Result<()> {
    let state = ProxyState::new(config.allowed_hosts.clone())
        .context("Failed to build HTTP client")?;
    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!(addr = %config.bind, hosts = ?config.allowed_hosts, "proxy listening");

    axum::serve(listener, router(state))
        .await
        .context("Proxy server failed")
}
