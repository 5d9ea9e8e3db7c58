use crate::error::ServerError;
use crate::session::Authenticated;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use log::info;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub(crate) struct UserPayload {
    username: String,
    password: String,
}

#[derive(Deserialize)]
pub(crate) struct NotifyPayload {
    message: String,
}

pub(crate) async fn list_users(
    State(state): State<AppState>,
    _auth: Authenticated,
) -> Result<impl IntoResponse, ServerError> {
    let users = state.db.list_users().await?;
    Ok(Json(users))
}

pub(crate) async fn create_user(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, ServerError> {
    let user = state
        .db
        .create_user(payload.username.trim(), &payload.password)
        .await?;
    info!("user {} created", user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

pub(crate) async fn update_user(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<i64>,
    Json(payload): Json<UserPayload>,
) -> Result<impl IntoResponse, ServerError> {
    if !state
        .db
        .update_user(id, payload.username.trim(), &payload.password)
        .await?
    {
        return Err(ServerError::NotFound);
    }

    info!("user {id} updated");
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn delete_user(
    State(state): State<AppState>,
    _auth: Authenticated,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ServerError> {
    if !state.db.delete_user(id).await? {
        return Err(ServerError::NotFound);
    }

    info!("user {id} deleted");
    Ok(Json(json!({ "success": true })))
}

pub(crate) async fn notify(
    State(state): State<AppState>,
    _auth: Authenticated,
    Json(payload): Json<NotifyPayload>,
) -> impl IntoResponse {
    let success = state.sms.send(&payload.message).await;
    Json(json!({ "success": success }))
}

#[cfg(test)]
mod tests {
    use crate::db::UserStore;
    use crate::db::memory::MemoryUsers;
    use crate::server::build_router;
    use crate::session::SessionData;
    use crate::state::{AppState, state_with_users};
    use axum::body::Body;
    use axum::http::header::{CONTENT_TYPE, COOKIE};
    use axum::http::{Request, StatusCode};
    use portier_common::gate::{AUTHENTICATED_FLAG, Session};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn admitted(state: &AppState) -> String {
        let mut session = SessionData::default();
        session.set_flag(AUTHENTICATED_FLAG);
        format!("portier_sid={}", state.sessions.issue(None, session))
    }

    fn json_request(method: &str, uri: &str, cookie: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(COOKIE, cookie)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_crud() {
        let users = Arc::new(MemoryUsers::with_user("alice", "hunter2"));
        let state = state_with_users(users.clone());
        let cookie = admitted(&state);
        let app = build_router(state);

        let created = app
            .clone()
            .oneshot(json_request("POST", "/api/users", &cookie, r#"{"username":" bob ","password":"pw"}"#))
            .await
            .unwrap();
        assert_eq!(created.status(), StatusCode::CREATED);
        assert!(users.verify_credentials("bob", "pw").await.unwrap().is_some());

        let updated = app
            .clone()
            .oneshot(json_request("PUT", "/api/users/2", &cookie, r#"{"username":"robert","password":"pw2"}"#))
            .await
            .unwrap();
        assert_eq!(updated.status(), StatusCode::OK);
        assert!(users.verify_credentials("robert", "pw2").await.unwrap().is_some());

        let deleted = app
            .clone()
            .oneshot(json_request("DELETE", "/api/users/2", &cookie, ""))
            .await
            .unwrap();
        assert_eq!(deleted.status(), StatusCode::OK);

        let missing = app
            .oneshot(json_request("DELETE", "/api/users/2", &cookie, ""))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(users.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_user_rejects_blank_password() {
        let state = state_with_users(Arc::new(MemoryUsers::default()));
        let cookie = admitted(&state);

        let response = build_router(state)
            .oneshot(json_request("POST", "/api/users", &cookie, r#"{"username":"bob","password":""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
