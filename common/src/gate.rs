use std::sync::LazyLock;

use log::{debug, info, warn};
use regex::Regex;

use crate::ip::RequestMetadata;

/// Session key set once a request has been admitted.
pub const AUTHENTICATED_FLAG: &str = "user";

/// Cheap textual shape of a private-range prefix, applied to the raw
/// forwarding header before any parsing.
static PRIVATE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(192\.168\.|10\.|172\.(1[6-9]|2[0-9]|3[0-1]))")
        .expect("private prefix regex is valid")
});

/// Mutable session the gate writes its admission flag into.
pub trait Session {
    fn set_flag(&mut self, key: &'static str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessVerdict {
    Admitted,
    Denied,
}

impl AccessVerdict {
    pub fn destination(self) -> Destination {
        match self {
            AccessVerdict::Admitted => Destination::Dashboard,
            AccessVerdict::Denied => Destination::Login,
        }
    }
}

/// Where the client is sent once the verdict is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Destination {
    Login,
    Dashboard,
}

impl Destination {
    pub fn path(self) -> &'static str {
        match self {
            Destination::Login => "/login",
            Destination::Dashboard => "/dashboard",
        }
    }
}

/// Outcome of the forwarding header check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpoofCheck {
    /// Header absent, empty, or shaped like a private address.
    Passed,
    /// Header present but not private-looking. Terminal.
    Blocked,
}

/// Inspects the raw `X-Forwarded-For` text.
///
/// Absence is not evidence of spoofing: only a present, non-empty value that
/// does not start with a private prefix blocks.
pub fn inspect_forwarded(forwarded_for: Option<&str>) -> SpoofCheck {
    match forwarded_for {
        None | Some("") => SpoofCheck::Passed,
        Some(value) if PRIVATE_PREFIX.is_match(value) => SpoofCheck::Passed,
        Some(_) => SpoofCheck::Blocked,
    }
}

/// Decides whether a request comes from the private network.
///
/// Never fails: malformed input resolves to [`AccessVerdict::Denied`].
/// On admission the [`AUTHENTICATED_FLAG`] is set on `session`, which is
/// idempotent.
pub fn evaluate<S>(meta: &RequestMetadata, session: &mut S) -> AccessVerdict
where
    S: Session + ?Sized,
{
    if inspect_forwarded(meta.forwarded_for.as_deref()) == SpoofCheck::Blocked {
        warn!(
            "blocked forwarded header {:?} from peer {:?}",
            meta.forwarded_for.as_deref().unwrap_or_default(),
            meta.peer_addr.as_deref().unwrap_or("unknown")
        );
        return AccessVerdict::Denied;
    }

    let address = meta.client_address();
    debug!("resolved client address {address}");

    if address.is_private() {
        session.set_flag(AUTHENTICATED_FLAG);
        info!("admitted {address}");
        AccessVerdict::Admitted
    } else {
        info!("denied {address}");
        AccessVerdict::Denied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MemorySession {
        flags: HashMap<&'static str, u32>,
    }

    impl Session for MemorySession {
        fn set_flag(&mut self, key: &'static str) {
            self.flags.insert(key, 1);
        }
    }

    fn meta(forwarded_for: Option<&str>, peer: Option<&str>) -> RequestMetadata {
        RequestMetadata {
            client_ip: None,
            forwarded_for: forwarded_for.map(str::to_string),
            peer_addr: peer.map(str::to_string),
        }
    }

    #[test]
    fn test_public_forwarded_header_is_blocked() {
        assert_eq!(inspect_forwarded(Some("8.8.8.8")), SpoofCheck::Blocked);
        assert_eq!(inspect_forwarded(Some(" 10.0.0.1")), SpoofCheck::Blocked);
        assert_eq!(inspect_forwarded(Some("172.32.0.1")), SpoofCheck::Blocked);
        assert_eq!(inspect_forwarded(Some("unknown")), SpoofCheck::Blocked);
    }

    #[test]
    fn test_absent_or_empty_forwarded_header_passes() {
        assert_eq!(inspect_forwarded(None), SpoofCheck::Passed);
        assert_eq!(inspect_forwarded(Some("")), SpoofCheck::Passed);
    }

    #[test]
    fn test_private_looking_forwarded_header_passes() {
        for value in ["10.0.0.1", "192.168.1.1, 8.8.8.8", "172.16.0.1", "172.31.9.9"] {
            assert_eq!(inspect_forwarded(Some(value)), SpoofCheck::Passed, "{value}");
        }
    }

    #[test]
    fn test_textual_guard_is_looser_than_classification() {
        let mut session = MemorySession::default();
        let request = meta(Some("10.999.999.999"), Some("8.8.8.8"));

        assert_eq!(inspect_forwarded(request.forwarded_for.as_deref()), SpoofCheck::Passed);
        assert_eq!(evaluate(&request, &mut session), AccessVerdict::Denied);
        assert!(session.flags.is_empty());
    }

    #[test]
    fn test_blocked_header_denies_regardless_of_peer() {
        let mut session = MemorySession::default();
        let verdict = evaluate(&meta(Some("8.8.8.8"), Some("192.168.1.10")), &mut session);

        assert_eq!(verdict, AccessVerdict::Denied);
        assert_eq!(verdict.destination(), Destination::Login);
        assert!(session.flags.is_empty());
    }

    #[test]
    fn test_private_peer_without_header_is_admitted() {
        let mut session = MemorySession::default();
        let verdict = evaluate(&meta(None, Some("192.168.1.10")), &mut session);
        assert_eq!(verdict, AccessVerdict::Admitted);

        let mut session = MemorySession::default();
        let verdict = evaluate(&meta(None, Some("172.20.5.5")), &mut session);
        assert_eq!(verdict, AccessVerdict::Admitted);
        assert_eq!(verdict.destination().path(), "/dashboard");
        assert!(session.flags.contains_key(AUTHENTICATED_FLAG));
    }

    #[test]
    fn test_public_peer_without_header_is_denied() {
        let mut session = MemorySession::default();
        let verdict = evaluate(&meta(None, Some("8.8.8.8")), &mut session);

        assert_eq!(verdict, AccessVerdict::Denied);
        assert_eq!(verdict.destination().path(), "/login");
        assert!(!session.flags.contains_key(AUTHENTICATED_FLAG));
    }

    #[test]
    fn test_forwarded_header_outranks_peer() {
        let mut session = MemorySession::default();
        let verdict = evaluate(&meta(Some("10.0.0.1"), Some("8.8.8.8")), &mut session);
        assert_eq!(verdict, AccessVerdict::Admitted);

        // the client-reported field outranks both
        let mut session = MemorySession::default();
        let request = RequestMetadata {
            client_ip: Some("203.0.113.5".to_string()),
            ..meta(Some("10.0.0.1"), Some("192.168.0.1"))
        };
        assert_eq!(evaluate(&request, &mut session), AccessVerdict::Denied);
    }

    #[test]
    fn test_unresolvable_address_is_denied() {
        let mut session = MemorySession::default();
        assert_eq!(
            evaluate(&RequestMetadata::default(), &mut session),
            AccessVerdict::Denied
        );
        assert_eq!(evaluate(&meta(None, Some("")), &mut session), AccessVerdict::Denied);
        assert!(session.flags.is_empty());
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let request = meta(Some("192.168.4.4"), Some("192.168.4.4"));
        let mut session = MemorySession::default();

        let first = evaluate(&request, &mut session);
        let flags_after_first = session.flags.clone();
        let second = evaluate(&request, &mut session);

        assert_eq!(first, second);
        assert_eq!(session.flags, flags_after_first);
        assert_eq!(session.flags.len(), 1);
    }
}
