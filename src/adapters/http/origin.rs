//! Client network details for audit entries and rate limit keys.
//!
//! The client address comes either from the TCP peer or from one header
//! written by a trusted edge proxy. Headers a client can set on its own,
//! such as `X-Forwarded-For` without a proxy in front, are never consulted.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRef, FromRequestParts};
use axum::http::header::{HeaderName, InvalidHeaderName};
use axum::http::request::Parts;
use axum::http::{Extensions, HeaderMap};

use crate::domain::billing::RequestOrigin;

/// Key used when no client address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Where the client address is taken from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ClientIpSource {
    /// The socket peer from `ConnectInfo`.
    #[default]
    PeerAddress,
    /// A header set by the proxy in front of the service, e.g.
    /// `CF-Connecting-IP`. For list-valued headers the rightmost hop is used,
    /// since that is the one the proxy appended. Requests without the header
    /// fall back to the peer address.
    TrustedHeader(HeaderName),
}

impl ClientIpSource {
    /// `None` or a blank name selects the peer address.
    pub fn from_header(name: Option<&str>) -> Result<Self, InvalidHeaderName> {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => Ok(Self::TrustedHeader(HeaderName::from_bytes(name.as_bytes())?)),
            None => Ok(Self::PeerAddress),
        }
    }

    pub fn client_ip(&self, headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
        if let Self::TrustedHeader(name) = self {
            let proxied = headers
                .get_all(name)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .last()
                .and_then(|value| value.rsplit(',').map(str::trim).find(|ip| !ip.is_empty()));
            if let Some(ip) = proxied {
                return Some(ip.to_string());
            }
        }

        extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
    }

    /// Rate limit key for a request.
    pub fn client_key(&self, headers: &HeaderMap, extensions: &Extensions) -> String {
        self.client_ip(headers, extensions)
            .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
    }
}

/// Extractor capturing IP and user agent of the caller.
#[derive(Debug, Clone, Default)]
pub struct ClientOrigin(pub RequestOrigin);

#[axum::async_trait]
impl<S> FromRequestParts<S> for ClientOrigin
where
    S: Send + Sync,
    ClientIpSource: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ip_address =
            ClientIpSource::from_ref(state).client_ip(&parts.headers, &parts.extensions);
        let user_agent = parts
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string);

        Ok(ClientOrigin(RequestOrigin {
            ip_address,
            user_agent,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn from_peer(headers: &[(&str, &str)], peer: &str) -> Parts {
        let mut p = parts(headers);
        let addr: SocketAddr = peer.parse().unwrap();
        p.extensions.insert(ConnectInfo(addr));
        p
    }

    fn cloudflare() -> ClientIpSource {
        ClientIpSource::from_header(Some("CF-Connecting-IP")).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Peer address
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn peer_address_is_the_default() {
        let p = from_peer(&[], "192.0.2.10:4444");
        assert_eq!(
            ClientIpSource::default().client_key(&p.headers, &p.extensions),
            "192.0.2.10"
        );
    }

    #[test]
    fn forwarding_headers_from_the_client_are_ignored() {
        let source = ClientIpSource::PeerAddress;
        let keys: Vec<String> = (0..10)
            .map(|i| {
                let xff = format!("10.0.0.{}", i);
                let p = from_peer(
                    &[("X-Forwarded-For", &xff), ("X-Real-IP", &xff)],
                    "203.0.113.9:5000",
                );
                source.client_key(&p.headers, &p.extensions)
            })
            .collect();

        assert!(keys.iter().all(|k| k == "203.0.113.9"), "{:?}", keys);
    }

    #[test]
    fn missing_peer_is_unknown() {
        let p = parts(&[("X-Forwarded-For", "198.51.100.4")]);
        assert_eq!(
            ClientIpSource::PeerAddress.client_key(&p.headers, &p.extensions),
            UNKNOWN_CLIENT
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Trusted proxy header
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn trusted_header_wins_over_peer() {
        let p = from_peer(&[("CF-Connecting-IP", "198.51.100.4")], "10.1.1.1:443");
        assert_eq!(cloudflare().client_key(&p.headers, &p.extensions), "198.51.100.4");
    }

    #[test]
    fn list_valued_trusted_header_uses_rightmost_hop() {
        let source = ClientIpSource::from_header(Some("X-Forwarded-For")).unwrap();
        let p = from_peer(&[("X-Forwarded-For", "10.0.0.99, 198.51.100.4")], "10.1.1.1:443");
        assert_eq!(source.client_key(&p.headers, &p.extensions), "198.51.100.4");
    }

    #[test]
    fn absent_trusted_header_falls_back_to_peer() {
        let p = from_peer(&[("X-Forwarded-For", "10.0.0.1")], "192.0.2.10:4444");
        assert_eq!(cloudflare().client_key(&p.headers, &p.extensions), "192.0.2.10");
    }

    #[test]
    fn blank_header_name_selects_peer() {
        assert_eq!(
            ClientIpSource::from_header(Some("  ")).unwrap(),
            ClientIpSource::PeerAddress
        );
        assert_eq!(ClientIpSource::from_header(None).unwrap(), ClientIpSource::PeerAddress);
        assert!(ClientIpSource::from_header(Some("bad header")).is_err());
    }

    // ══════════════════════════════════════════════════════════════
    // Extractor
    // ══════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn origin_captures_ip_and_user_agent() {
        let mut p = from_peer(&[("X-Forwarded-For", "10.0.0.1")], "198.51.100.4:5000");
        p.headers
            .insert("user-agent", HeaderValue::from_static("curl/8.5"));

        let ClientOrigin(origin) =
            ClientOrigin::from_request_parts(&mut p, &ClientIpSource::PeerAddress)
                .await
                .unwrap();
        assert_eq!(origin.ip_address.as_deref(), Some("198.51.100.4"));
        assert_eq!(origin.user_agent.as_deref(), Some("curl/8.5"));
    }
}
