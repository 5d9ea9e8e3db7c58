use crate::session::{SessionData, SessionStore, session_cookie, session_id_from_headers};
use axum::extract::{FromRequestParts, State};
use axum::http::HeaderMap;
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Redirect, Response};
use axum_client_ip::ClientIp;
use log::debug;
use portier_common::gate::{self, AccessVerdict};
use portier_common::ip::RequestMetadata;
use std::convert::Infallible;

/// Address metadata of the current request.
///
/// Never rejects: a peer address the configured source cannot provide is
/// simply left out.
pub(crate) struct ClientMetadata(pub(crate) RequestMetadata);

impl<S> FromRequestParts<S> for ClientMetadata
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let peer = match ClientIp::from_request_parts(parts, state).await {
            Ok(ClientIp(ip)) => Some(ip),
            Err(_) => {
                debug!("peer address unavailable");
                None
            }
        };

        Ok(ClientMetadata(RequestMetadata::from_headers(
            &parts.headers,
            peer,
        )))
    }
}

/// Protected entry point: admits private-network clients to the dashboard.
///
/// Admission always issues a new session id. Denied requests get no session.
pub(crate) async fn access_gate(
    State(sessions): State<SessionStore>,
    ClientMetadata(meta): ClientMetadata,
    headers: HeaderMap,
) -> Response {
    let mut pending = SessionData::default();
    let verdict = gate::evaluate(&meta, &mut pending);
    let redirect = Redirect::to(verdict.destination().path());

    match verdict {
        AccessVerdict::Admitted => {
            let session_id = sessions.issue(session_id_from_headers(&headers), pending);
            debug!("issued session {session_id}");
            ([(SET_COOKIE, session_cookie(session_id))], redirect).into_response()
        }
        AccessVerdict::Denied => redirect.into_response(),
    }
}
