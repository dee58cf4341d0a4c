use std::collections::BTreeMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Username and password accepted by `/auth`.
pub const AUTH_USER: &str = "user";
pub const AUTH_PASSWORD: &str = "pass";

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/ok", get(ok))
        .route("/json", get(json))
        .route("/bad-json", get(bad_json))
        .route("/status/{code}", get(status))
        .route("/slow/{millis}", get(slow))
        .route("/auth", get(auth))
        .route("/redirect", get(redirect))
        .route("/echo", any(echo))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn ok() -> &'static str {
    "ok"
}

async fn json() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "b": 2 }))
}

async fn bad_json() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], "{not json")
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (status, status.canonical_reason().unwrap_or_default()).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn slow(Path(millis): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(millis)).await;
    "slow"
}

async fn auth(headers: HeaderMap) -> StatusCode {
    // "user:pass"
    const EXPECTED: &str = "Basic dXNlcjpwYXNz";
    let authorization = headers.get(header::AUTHORIZATION);
    match authorization.and_then(|v| v.to_str().ok()) {
        Some(EXPECTED) => StatusCode::NO_CONTENT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

async fn redirect() -> Redirect {
    Redirect::to("/ok")
}

async fn echo(
    method: Method,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let mut seen = BTreeMap::new();
    for (name, value) in &headers {
        let value = value.to_str().unwrap_or_default();
        seen.entry(name.as_str().to_string())
            .and_modify(|existing: &mut String| {
                existing.push_str(", ");
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }
    Json(Echo {
        method: method.to_string(),
        query,
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
