//! HTTP header ↔ call metadata mapping.
//!
//! Inbound, selected request headers become outgoing call metadata. Outbound
//! prefixes are shared with the response renderer.

use std::net::SocketAddr;

use http::header::{AUTHORIZATION, HOST};
use http::HeaderMap;

use crate::rpc::MetadataMap;

/// Request headers with this prefix are forwarded with the prefix stripped;
/// header metadata is returned under it.
pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";
/// Trailer metadata is returned as HTTP trailers under this prefix.
pub const METADATA_TRAILER_PREFIX: &str = "grpc-trailer-";
/// Permanent HTTP headers are forwarded under this prefix.
pub const GATEWAY_HEADER_PREFIX: &str = "grpcgateway-";

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// IANA permanent message headers, lowercase.
const PERMANENT_HEADERS: &[&str] = &[
    "accept",
    "accept-charset",
    "accept-language",
    "accept-ranges",
    "age",
    "allow",
    "alt-svc",
    "alternates",
    "cache-control",
    "content-encoding",
    "content-language",
    "content-location",
    "content-md5",
    "content-range",
    "cookie",
    "date",
    "etag",
    "expect",
    "expires",
    "from",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-range",
    "if-unmodified-since",
    "keep-alive",
    "last-modified",
    "link",
    "location",
    "max-forwards",
    "origin",
    "pragma",
    "proxy-authenticate",
    "proxy-authorization",
    "range",
    "referer",
    "retry-after",
    "server",
    "set-cookie",
    "upgrade",
    "user-agent",
    "via",
    "warning",
    "www-authenticate",
];

fn is_permanent(name: &str) -> bool {
    PERMANENT_HEADERS.contains(&name)
}

/// Call metadata forwarded for one request.
///
/// - `Authorization` → `authorization`
/// - `Grpc-Metadata-<k>` → `<k>`
/// - `X-Request-Id` → `x-request-id`
/// - permanent headers → `grpcgateway-<name>`
/// - `x-forwarded-host` from `X-Forwarded-Host` or `Host`
/// - `x-forwarded-for` extended with the peer address
pub fn incoming_metadata(headers: &HeaderMap, peer: Option<SocketAddr>) -> MetadataMap {
    let mut metadata = MetadataMap::new();

    for (name, value) in headers {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let key = name.as_str();

        if *name == AUTHORIZATION {
            metadata.append(key, value);
        } else if let Some(stripped) = key.strip_prefix(METADATA_HEADER_PREFIX) {
            if !stripped.is_empty() {
                metadata.append(stripped, value);
            }
        } else if key == X_REQUEST_ID {
            metadata.append(key, value);
        } else if is_permanent(key) {
            metadata.append(format!("{GATEWAY_HEADER_PREFIX}{key}"), value);
        }
    }

    let header_str = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    if let Some(host) = header_str(X_FORWARDED_HOST).or_else(|| header_str(HOST.as_str())) {
        metadata.append(X_FORWARDED_HOST, host);
    }

    let forwarded_for = match (header_str(X_FORWARDED_FOR), peer) {
        (Some(chain), Some(peer)) => Some(format!("{chain}, {}", peer.ip())),
        (None, Some(peer)) => Some(peer.ip().to_string()),
        (Some(chain), None) => Some(chain.to_string()),
        (None, None) => None,
    };
    if let Some(value) = forwarded_for {
        metadata.append(X_FORWARDED_FOR, value);
    }

    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_forwarding_rules() {
        let map = headers(&[
            ("authorization", "Bearer t0k"),
            ("grpc-metadata-tenant", "acme"),
            ("x-request-id", "req-1"),
            ("user-agent", "curl/8"),
            ("content-type", "application/json"),
            ("x-custom", "dropped"),
        ]);
        let md = incoming_metadata(&map, None);

        assert_eq!(md.get_first("authorization"), Some("Bearer t0k"));
        assert_eq!(md.get_first("tenant"), Some("acme"));
        assert_eq!(md.get_first("x-request-id"), Some("req-1"));
        assert_eq!(md.get_first("grpcgateway-user-agent"), Some("curl/8"));
        assert!(md.get("content-type").is_none());
        assert!(md.get("x-custom").is_none());
        assert!(md.get("grpcgateway-x-custom").is_none());
    }

    #[test]
    fn test_forwarded_host_prefers_explicit_header() {
        let md = incoming_metadata(&headers(&[("host", "gw.local")]), None);
        assert_eq!(md.get_first("x-forwarded-host"), Some("gw.local"));

        let md = incoming_metadata(
            &headers(&[("host", "gw.local"), ("x-forwarded-host", "public.example")]),
            None,
        );
        assert_eq!(md.get_first("x-forwarded-host"), Some("public.example"));
    }

    #[test]
    fn test_forwarded_for_appends_peer() {
        let peer: SocketAddr = "10.1.2.3:5555".parse().unwrap();

        let md = incoming_metadata(&HeaderMap::new(), Some(peer));
        assert_eq!(md.get_first("x-forwarded-for"), Some("10.1.2.3"));

        let md = incoming_metadata(&headers(&[("x-forwarded-for", "203.0.113.9")]), Some(peer));
        assert_eq!(md.get_first("x-forwarded-for"), Some("203.0.113.9, 10.1.2.3"));
    }
}
