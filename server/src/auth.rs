use crate::error::ServerError;
use crate::session::{SessionData, expired_session_cookie, session_cookie, session_id_from_headers};
use crate::state::AppState;
use askama::Template;
use axum::Form;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::response::{Html, IntoResponse, Redirect, Response};
use log::{info, warn};
use portier_common::gate::{AUTHENTICATED_FLAG, Destination, Session};
use serde::Deserialize;

const LOGGED_USERNAME_CHARS: usize = 64;

#[derive(Template)]
#[template(path = "login.html")]
pub(crate) struct LoginTemplate;

#[derive(Deserialize)]
pub(crate) struct LoginForm {
    username: String,
    password: String,
}

pub(crate) async fn login_page() -> Result<Html<String>, ServerError> {
    Ok(Html(LoginTemplate.render()?))
}

/// Checks form credentials. Success issues a new admitted session.
pub(crate) async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let user = match state.db.verify_credentials(&form.username, &form.password).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            let shown: String = form.username.chars().take(LOGGED_USERNAME_CHARS).collect();
            warn!("invalid credentials for {shown:?}");
            return Redirect::to(Destination::Login.path()).into_response();
        }
        Err(err) => return err.into_response(),
    };

    let mut session = SessionData::default();
    session.set_flag(AUTHENTICATED_FLAG);
    session.username = Some(user.username.clone());
    let session_id = state
        .sessions
        .issue(session_id_from_headers(&headers), session);

    info!("user {:?} logged in", user.username);

    (
        [(SET_COOKIE, session_cookie(session_id))],
        Redirect::to(Destination::Dashboard.path()),
    )
        .into_response()
}

pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Some(session_id) = session_id_from_headers(&headers) {
        if state.sessions.destroy(&session_id) {
            info!("session {session_id} closed");
        }
    }

    (
        [(SET_COOKIE, expired_session_cookie())],
        Redirect::to(Destination::Login.path()),
    )
}
