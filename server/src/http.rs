use crate::env::{self, Env};
use axum::Json;
use axum::http::{HeaderValue, Method};
use axum::response::IntoResponse;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};

pub fn build_cors(config: &Env) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if !config.mode.is_production() {
        cors = cors.allow_origin(Any);
    } else if let Some(origin) = config
        .access_control_allowed_origin
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|s| HeaderValue::from_str(s).ok())
    {
        cors = cors.allow_origin(origin);
    }

    cors
}

pub async fn get_version() -> impl IntoResponse {
    Json(json!({
        "version": env::version(),
    }))
}
