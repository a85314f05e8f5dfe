//! Header manipulation across the proxy boundary.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers in both directions
//! - Append the caller to X-Forwarded-For
//! - Point Host at the upstream
//! - Keep the `Trailer` announcement where trailer fields are relayed
//!
//! # Design Decisions
//! - Headers named in `Connection` are hop-by-hop too (RFC 9110 §7.6.1)
//! - Existing X-Forwarded-For values are kept byte for byte, so multi-hop
//!   chains stay auditable
//! - hyper only writes trailer fields named in `Trailer`, and an HTTP/1.1
//!   caller only receives them after sending `TE: trailers`

use std::net::IpAddr;

use axum::http::header::{
    CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER, TRANSFER_ENCODING,
    UPGRADE,
};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Connection-scoped headers that are never forwarded.
pub static HOP_BY_HOP: [HeaderName; 9] = [
    CONNECTION,
    HeaderName::from_static("proxy-connection"),
    HeaderName::from_static("keep-alive"),
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(&CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(&name);
    }
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Append `client` to X-Forwarded-For, keeping any values already present.
pub fn append_forwarded_for(headers: &mut HeaderMap, client: IpAddr) {
    let mut chain: Vec<u8> = Vec::new();
    for prior in headers.get_all(&X_FORWARDED_FOR) {
        if prior.is_empty() {
            continue;
        }
        chain.extend_from_slice(prior.as_bytes());
        chain.extend_from_slice(b", ");
    }
    chain.extend_from_slice(client.to_string().as_bytes());

    match HeaderValue::from_bytes(&chain) {
        Ok(value) => {
            headers.insert(X_FORWARDED_FOR.clone(), value);
        }
        Err(e) => {
            tracing::warn!(error = %e, "Dropping unrepresentable X-Forwarded-For value");
        }
    }
}

/// Whether the sender of `headers` accepts trailer fields (`TE: trailers`).
pub fn accepts_trailers(headers: &HeaderMap) -> bool {
    headers
        .get_all(TE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|coding| coding.split(';').next())
        .any(|coding| coding.trim().eq_ignore_ascii_case("trailers"))
}

fn trailer_announcement(headers: &HeaderMap) -> Vec<HeaderValue> {
    headers.get_all(TRAILER).iter().cloned().collect()
}

fn restore_trailer_announcement(headers: &mut HeaderMap, announced: Vec<HeaderValue>) {
    for value in announced {
        headers.append(TRAILER, value);
    }
}

/// Prepare inbound headers for the upstream.
///
/// The request's own `Trailer` announcement is kept so its trailer fields
/// reach the upstream.
pub fn rewrite_request_headers(headers: &mut HeaderMap, upstream_host: &HeaderValue, client: IpAddr) {
    let announced = trailer_announcement(headers);
    strip_hop_by_hop(headers);
    restore_trailer_announcement(headers, announced);
    headers.insert(HOST, upstream_host.clone());
    append_forwarded_for(headers, client);
}

/// Prepare upstream response headers for the caller.
///
/// `Trailer` survives only when the caller accepts trailers; otherwise the
/// trailer fields are dropped and the announcement would be false.
pub fn rewrite_response_headers(headers: &mut HeaderMap, caller_accepts_trailers: bool) {
    let announced = if caller_accepts_trailers {
        trailer_announcement(headers)
    } else {
        Vec::new()
    };
    strip_hop_by_hop(headers);
    restore_trailer_announcement(headers, announced);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn strips_fixed_hop_by_hop_set() {
        let mut map = headers(&[
            ("connection", "keep-alive"),
            ("keep-alive", "timeout=5"),
            ("proxy-authorization", "Basic Zm9vOmJhcg=="),
            ("proxy-authenticate", "Basic"),
            ("proxy-connection", "keep-alive"),
            ("te", "trailers"),
            ("trailer", "Expires"),
            ("transfer-encoding", "chunked"),
            ("upgrade", "websocket"),
            ("x-trace", "abc"),
        ]);

        strip_hop_by_hop(&mut map);

        assert_eq!(map.len(), 1);
        assert_eq!(map["x-trace"], "abc");
    }

    #[test]
    fn strips_headers_named_in_connection() {
        let mut map = headers(&[
            ("connection", "close, X-Internal-Hop"),
            ("connection", " x-other "),
            ("x-internal-hop", "1"),
            ("x-other", "2"),
            ("x-kept", "3"),
        ]);

        strip_hop_by_hop(&mut map);

        assert!(map.get("x-internal-hop").is_none());
        assert!(map.get("x-other").is_none());
        assert_eq!(map["x-kept"], "3");
    }

    #[test]
    fn keeps_multi_valued_end_to_end_headers_in_order() {
        let mut map = headers(&[("accept", "text/html"), ("accept", "application/json")]);
        strip_hop_by_hop(&mut map);
        let values: Vec<_> = map.get_all("accept").iter().collect();
        assert_eq!(values, ["text/html", "application/json"]);
    }

    #[test]
    fn forwarded_for_is_set_when_absent() {
        let mut map = HeaderMap::new();
        append_forwarded_for(&mut map, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 7)));
        assert_eq!(map[&X_FORWARDED_FOR], "192.0.2.7");
    }

    #[test]
    fn forwarded_for_appends_to_existing_chain() {
        let mut map = headers(&[
            ("x-forwarded-for", "10.0.0.1, 10.0.0.2"),
            ("x-forwarded-for", "10.0.0.3"),
        ]);
        append_forwarded_for(&mut map, IpAddr::V4(Ipv4Addr::LOCALHOST));

        let values: Vec<_> = map.get_all(&X_FORWARDED_FOR).iter().collect();
        assert_eq!(values, ["10.0.0.1, 10.0.0.2, 10.0.0.3, 127.0.0.1"]);
    }

    #[test]
    fn forwarded_for_keeps_non_ascii_prior_values() {
        let mut map = HeaderMap::new();
        map.insert(
            X_FORWARDED_FOR.clone(),
            HeaderValue::from_bytes(b"10.0.0.1, \xe9x").unwrap(),
        );
        append_forwarded_for(&mut map, IpAddr::V4(Ipv4Addr::LOCALHOST));

        assert_eq!(map.get_all(&X_FORWARDED_FOR).iter().count(), 1);
        assert_eq!(map[&X_FORWARDED_FOR].as_bytes(), b"10.0.0.1, \xe9x, 127.0.0.1");
    }

    #[test]
    fn detects_trailer_acceptance() {
        assert!(accepts_trailers(&headers(&[("te", "trailers")])));
        assert!(accepts_trailers(&headers(&[("te", "gzip;q=0.5, Trailers")])));
        assert!(!accepts_trailers(&headers(&[("te", "gzip")])));
        assert!(!accepts_trailers(&HeaderMap::new()));
    }

    #[test]
    fn request_rewrite_keeps_trailer_announcement() {
        let mut map = headers(&[("trailer", "X-Sum"), ("te", "trailers")]);
        let upstream = HeaderValue::from_static("upstream.test:9000");

        rewrite_request_headers(&mut map, &upstream, IpAddr::V4(Ipv4Addr::LOCALHOST));

        assert_eq!(map[TRAILER], "X-Sum");
        assert!(map.get(TE).is_none());
    }

    #[test]
    fn response_trailer_announcement_follows_caller() {
        let upstream = headers(&[("trailer", "X-Checksum"), ("keep-alive", "timeout=5")]);

        let mut accepted = upstream.clone();
        rewrite_response_headers(&mut accepted, true);
        assert_eq!(accepted[TRAILER], "X-Checksum");
        assert!(accepted.get("keep-alive").is_none());

        let mut refused = upstream;
        rewrite_response_headers(&mut refused, false);
        assert!(refused.get(TRAILER).is_none());
    }

    #[test]
    fn request_rewrite_overrides_host() {
        let mut map = headers(&[("host", "proxy.example:9090"), ("connection", "upgrade"), ("upgrade", "h2c")]);
        let upstream = HeaderValue::from_static("upstream.test:9000");

        rewrite_request_headers(&mut map, &upstream, IpAddr::V4(Ipv4Addr::LOCALHOST));

        assert_eq!(map[HOST], "upstream.test:9000");
        assert_eq!(map.get_all(HOST).iter().count(), 1);
        assert!(map.get(UPGRADE).is_none());
        assert_eq!(map[&X_FORWARDED_FOR], "127.0.0.1");
    }
}
