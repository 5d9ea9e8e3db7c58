use axum::extract::{FromRef, FromRequestParts};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::response::Redirect;
use dashmap::DashMap;
use portier_common::gate::{AUTHENTICATED_FLAG, Destination, Session};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub(crate) static SESSION_COOKIE: &str = "portier_sid";

#[derive(Debug, Clone)]
pub(crate) struct SessionData {
    flags: HashSet<&'static str>,
    pub(crate) username: Option<String>,
    last_seen: Instant,
}

impl Default for SessionData {
    fn default() -> Self {
        Self {
            flags: HashSet::new(),
            username: None,
            last_seen: Instant::now(),
        }
    }
}

impl SessionData {
    pub(crate) fn is_authenticated(&self) -> bool {
        self.flags.contains(AUTHENTICATED_FLAG)
    }
}

impl Session for SessionData {
    fn set_flag(&mut self, key: &'static str) {
        self.flags.insert(key);
    }
}

/// Sessions of every connected client, keyed by the cookie id.
#[derive(Clone, Default)]
pub(crate) struct SessionStore {
    inner: Arc<DashMap<Uuid, SessionData>>,
}

impl SessionStore {
    /// Stores `data` under a newly generated id, dropping `replaced`.
    ///
    /// Ids are never reused across a privilege change, so a client cannot
    /// plant an id that later becomes authenticated.
    pub(crate) fn issue(&self, replaced: Option<Uuid>, data: SessionData) -> Uuid {
        if let Some(previous) = replaced {
            self.inner.remove(&previous);
        }

        let id = Uuid::new_v4();
        self.inner.insert(id, SessionData {
            last_seen: Instant::now(),
            ..data
        });
        id
    }

    pub(crate) fn is_authenticated(&self, id: &Uuid) -> bool {
        match self.inner.get_mut(id) {
            Some(mut data) => {
                data.last_seen = Instant::now();
                data.is_authenticated()
            }
            None => false,
        }
    }

    pub(crate) fn username(&self, id: &Uuid) -> Option<String> {
        self.inner.get(id).and_then(|data| data.username.clone())
    }

    pub(crate) fn destroy(&self, id: &Uuid) -> bool {
        self.inner.remove(id).is_some()
    }

    /// Drops sessions idle for longer than `idle`. Returns how many went.
    pub(crate) fn sweep(&self, idle: Duration) -> usize {
        let before = self.inner.len();
        self.inner
            .retain(|_, data| data.last_seen.elapsed() <= idle);
        before.saturating_sub(self.inner.len())
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }
}

pub(crate) fn session_id_from_headers(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(axum::http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

pub(crate) fn session_cookie(id: Uuid) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax")
}

pub(crate) fn expired_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Extractor for requests carrying an admitted session.
///
/// Anything else is redirected to the login surface.
pub(crate) struct Authenticated {
    pub(crate) session_id: Uuid,
}

impl<S> FromRequestParts<S> for Authenticated
where
    SessionStore: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sessions = SessionStore::from_ref(state);

        match session_id_from_headers(&parts.headers) {
            Some(session_id) if sessions.is_authenticated(&session_id) => {
                Ok(Authenticated { session_id })
            }
            _ => Err(Redirect::to(Destination::Login.path())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn admitted() -> SessionData {
        let mut data = SessionData::default();
        data.set_flag(AUTHENTICATED_FLAG);
        data
    }

    #[test]
    fn test_issue_stores_new_session() {
        let store = SessionStore::default();
        let id = store.issue(None, admitted());

        assert_eq!(store.len(), 1);
        assert!(store.is_authenticated(&id));
    }

    #[test]
    fn test_issue_replaces_presented_id() {
        let store = SessionStore::default();
        let planted = store.issue(None, SessionData::default());
        let id = store.issue(Some(planted), admitted());

        assert_ne!(id, planted);
        assert!(!store.is_authenticated(&planted));
        assert!(store.is_authenticated(&id));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_issue_with_unknown_id() {
        let store = SessionStore::default();
        let stale = Uuid::new_v4();
        let id = store.issue(Some(stale), SessionData::default());

        assert_ne!(id, stale);
        assert!(!store.is_authenticated(&id));
    }

    #[test]
    fn test_username() {
        let store = SessionStore::default();
        let mut data = admitted();
        data.username = Some("alice".to_string());
        let id = store.issue(None, data);

        assert_eq!(store.username(&id).as_deref(), Some("alice"));
        assert_eq!(store.username(&Uuid::new_v4()), None);
    }

    #[test]
    fn test_destroy() {
        let store = SessionStore::default();
        let id = store.issue(None, SessionData::default());
        assert!(store.destroy(&id));
        assert!(!store.destroy(&id));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_sweep_drops_idle_sessions() {
        let store = SessionStore::default();
        store.issue(None, SessionData::default());
        store.issue(None, admitted());

        assert_eq!(store.sweep(Duration::from_secs(3600)), 0);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(store.sweep(Duration::from_millis(5)), 2);
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn test_session_id_from_headers() {
        let id = Uuid::new_v4();
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_str(&format!("theme=dark; {SESSION_COOKIE}={id}")).unwrap(),
        );
        assert_eq!(session_id_from_headers(&headers), Some(id));
    }

    #[test]
    fn test_session_id_from_headers_rejects_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_id_from_headers(&headers), None);

        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("portier_sid=not-a-uuid"),
        );
        assert_eq!(session_id_from_headers(&headers), None);
    }

    #[test]
    fn test_session_cookie_format() {
        let id = Uuid::nil();
        assert_eq!(
            session_cookie(id),
            "portier_sid=00000000-0000-0000-0000-000000000000; Path=/; HttpOnly; SameSite=Lax"
        );
        assert!(expired_session_cookie().ends_with("Max-Age=0"));
    }
}
