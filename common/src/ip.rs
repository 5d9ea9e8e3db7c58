use std::fmt::{Display, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use log::debug;

/// Closed integer intervals of the three reserved private IPv4 blocks.
const PRIVATE_RANGES: [(u32, u32); 3] = [
    (
        u32::from_be_bytes([10, 0, 0, 0]),
        u32::from_be_bytes([10, 255, 255, 255]),
    ),
    (
        u32::from_be_bytes([172, 16, 0, 0]),
        u32::from_be_bytes([172, 31, 255, 255]),
    ),
    (
        u32::from_be_bytes([192, 168, 0, 0]),
        u32::from_be_bytes([192, 168, 255, 255]),
    ),
];

pub static CLIENT_IP_HEADER: &str = "client-ip";
pub static X_FORWARDED_FOR: &str = "x-forwarded-for";

/// A request metadata field the client address may be read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressSource {
    /// Address the client reports about itself (`Client-IP`).
    ClientReported,
    /// Proxy chain recorded by intermediaries (`X-Forwarded-For`).
    ForwardedFor,
    /// Address of the transport peer.
    PeerTransport,
}

/// Probe order, most trusted first.
pub const ADDRESS_SOURCES: [AddressSource; 3] = [
    AddressSource::ClientReported,
    AddressSource::ForwardedFor,
    AddressSource::PeerTransport,
];

/// Raw, unvalidated address metadata of a single request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    pub client_ip: Option<String>,
    pub forwarded_for: Option<String>,
    pub peer_addr: Option<String>,
}

impl RequestMetadata {
    pub fn field(&self, source: AddressSource) -> Option<&str> {
        match source {
            AddressSource::ClientReported => self.client_ip.as_deref(),
            AddressSource::ForwardedFor => self.forwarded_for.as_deref(),
            AddressSource::PeerTransport => self.peer_addr.as_deref(),
        }
    }

    /// Builds the metadata from request headers and the peer address.
    ///
    /// Repeated headers are joined with commas, the way proxies fold them.
    /// Values that are not valid UTF-8 are kept lossily so they still count
    /// as present.
    pub fn from_headers(headers: &axum::http::HeaderMap, peer: Option<IpAddr>) -> Self {
        Self {
            client_ip: joined_header(headers, CLIENT_IP_HEADER),
            forwarded_for: joined_header(headers, X_FORWARDED_FOR),
            peer_addr: peer.map(|ip| ip.to_string()),
        }
    }

    /// Resolves the client address by walking [`ADDRESS_SOURCES`] in order.
    pub fn client_address(&self) -> ClientAddress {
        resolve(ADDRESS_SOURCES.iter().map(|source| self.field(*source)))
    }
}

fn joined_header(headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    let values: Vec<String> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}

/// Returns the first valid IP literal found in `fields`.
///
/// Empty or missing fields are skipped. Each field is split on commas and
/// its trimmed segments are tried in order. Falls back to
/// [`ClientAddress::UNKNOWN`] when nothing parses.
pub fn resolve<'a, I>(fields: I) -> ClientAddress
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    for raw in fields.into_iter().flatten() {
        if raw.is_empty() {
            continue;
        }

        for segment in raw.split(',') {
            let segment = segment.trim();
            match ClientAddress::parse(segment) {
                Some(address) => return address,
                None => debug!("skipping malformed address candidate {segment:?}"),
            }
        }
    }

    ClientAddress::UNKNOWN
}

/// A syntactically valid client address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ClientAddress(IpAddr);

impl ClientAddress {
    /// Used when no address could be determined. Never private.
    pub const UNKNOWN: ClientAddress = ClientAddress(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

    pub fn parse(candidate: &str) -> Option<Self> {
        IpAddr::from_str(candidate).ok().map(Self)
    }

    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Integer form of an IPv4 address, `None` for IPv6.
    pub fn to_bits(&self) -> Option<u32> {
        match self.0 {
            IpAddr::V4(v4) => Some(u32::from(v4)),
            IpAddr::V6(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    /// Whether the address lies inside 10/8, 172.16/12 or 192.168/16.
    ///
    /// IPv6 addresses are never private here.
    pub fn is_private(&self) -> bool {
        let Some(bits) = self.to_bits() else {
            return false;
        };

        PRIVATE_RANGES
            .iter()
            .any(|(low, high)| bits >= *low && bits <= *high)
    }
}

impl Display for ClientAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ClientAddress {
    type Err = std::net::AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        IpAddr::from_str(s).map(Self)
    }
}
