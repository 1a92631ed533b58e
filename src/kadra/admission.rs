//! IP admission gate.
//!
//! Runs before authentication or routing for page requests: resolves the
//! client IP from proxy headers, checks it against the active allowlist
//! (exact addresses and IPv4 CIDR blocks) and short-circuits non-matching
//! requests with a blank page. The API, static-asset and login namespaces
//! are exempt so the allowlist check never depends on itself being passed.
//!
//! Header-based resolution trusts the deployment topology to let only a
//! known reverse proxy set forwarding headers; that guarantee lives at the
//! infrastructure boundary, not here.

use crate::hasura::{self, Hasura};
use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::net::Ipv4Addr;
use tracing::{debug, warn};

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const CF_CONNECTING_IP: &str = "cf-connecting-ip";

const SESSION_COOKIE: &str = "authToken";
const LOGIN_PATH: &str = "/login";

/// Paths reachable regardless of client IP. The gate itself needs the data
/// layer over the network, so the API namespace must stay open.
const EXEMPT_PREFIXES: &[&str] = &["/api/", "/_next/", "/static/", "/favicon.ico"];
const EXEMPT_PAGES: &[&str] = &[LOGIN_PATH, "/hasura-test"];

/// Denied requests get a 200 with an empty white page, not an error status,
/// so a prober cannot tell IP filtering exists. Monitors will report "OK"
/// for blocked traffic; that trade is deliberate.
const BLANK_PAGE: &str = "<!DOCTYPE html>
<html>
<head>
  <title></title>
  <style>
    body {
      margin: 0;
      padding: 0;
      background-color: white;
      width: 100%;
      height: 100vh;
    }
  </style>
</head>
<body></body>
</html>";

/// Admission middleware: deny non-allowlisted origins, then redirect
/// session-less page requests to the login page.
pub async fn gate(Extension(hasura): Extension<Hasura>, request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    if is_exempt(&path) {
        return next.run(request).await;
    }

    let ip = client_ip(request.headers());

    let allowed = match hasura::allowlist::active(&hasura).await {
        Ok(entries) => ip_allowed(&ip, &entries),
        Err(err) => {
            // Fail closed: an unreadable allowlist admits nobody.
            warn!(%ip, error = %err, "allowlist fetch failed, denying request");
            false
        }
    };

    if !allowed {
        debug!(%ip, %path, "client not allowlisted");
        return blank_page();
    }

    if !has_session(request.headers()) && path != "/" {
        return Redirect::to(LOGIN_PATH).into_response();
    }

    next.run(request).await
}

fn blank_page() -> Response {
    (
        StatusCode::OK,
        [("content-type", "text/html")],
        BLANK_PAGE,
    )
        .into_response()
}

pub(crate) fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|p| path.starts_with(p))
        || EXEMPT_PAGES.iter().any(|p| path == *p)
}

/// Resolve the client IP from proxy headers, first present wins:
/// `x-forwarded-for` (first entry), `x-real-ip`, `cf-connecting-ip`,
/// loopback as the fallback. The IPv6 loopback literal normalizes to its
/// IPv4 equivalent.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    if let Some(forwarded) = header_str(headers, FORWARDED_FOR) {
        if let Some(first) = forwarded.split(',').next() {
            let ip = first.trim();
            if !ip.is_empty() {
                return normalize_loopback(ip);
            }
        }
    }

    if let Some(real_ip) = header_str(headers, REAL_IP) {
        let ip = real_ip.trim();
        if !ip.is_empty() {
            return normalize_loopback(ip);
        }
    }

    if let Some(cf_ip) = header_str(headers, CF_CONNECTING_IP) {
        let ip = cf_ip.trim();
        if !ip.is_empty() {
            return normalize_loopback(ip);
        }
    }

    Ipv4Addr::LOCALHOST.to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn normalize_loopback(ip: &str) -> String {
    if ip == "::1" {
        Ipv4Addr::LOCALHOST.to_string()
    } else {
        ip.to_string()
    }
}

/// Check one IP against all active entries: exact text match first, then
/// CIDR containment. Malformed entries match nothing and evaluation
/// continues with the rest.
pub(crate) fn ip_allowed(ip: &str, entries: &[String]) -> bool {
    if entries.iter().any(|entry| entry == ip) {
        return true;
    }

    entries.iter().any(|entry| cidr_match(ip, entry))
}

/// IPv4 CIDR containment: `(network & mask) == (ip & mask)` with
/// `mask = u32::MAX << (32 - prefix)`.
///
/// Defined boundaries: an entry without `/` requires exact equality; a
/// prefix that fails to parse or exceeds 32 matches nothing; prefix 0
/// matches every IPv4 address; octets parse strictly.
pub(crate) fn cidr_match(ip: &str, entry: &str) -> bool {
    let Some((network, prefix)) = entry.split_once('/') else {
        return ip == entry;
    };

    let Ok(prefix) = prefix.trim().parse::<u8>() else {
        return false;
    };

    if prefix > 32 {
        return false;
    }

    let (Some(network), Some(ip)) = (parse_ipv4(network), parse_ipv4(ip)) else {
        return false;
    };

    let mask = if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix))
    };

    network & mask == ip & mask
}

pub(crate) fn parse_ipv4(text: &str) -> Option<u32> {
    text.trim().parse::<Ipv4Addr>().map(u32::from).ok()
}

/// A request carries a session when either the auth cookie or the
/// Authorization header is present.
fn has_session(headers: &HeaderMap) -> bool {
    if headers.contains_key(AUTHORIZATION) {
        return true;
    }

    cookie_value(headers, SESSION_COOKIE).is_some()
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = header_str(headers, "cookie")?;

    cookies.split(';').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        if key.trim() == name && !value.trim().is_empty() {
            Some(value.trim().to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn forwarded_for_takes_first_entry() {
        let map = headers(&[
            ("x-forwarded-for", "10.0.0.9, 70.1.1.1"),
            ("x-real-ip", "70.2.2.2"),
            ("cf-connecting-ip", "70.3.3.3"),
        ]);
        assert_eq!(client_ip(&map), "10.0.0.9");
    }

    #[test]
    fn real_ip_wins_without_forwarded_for() {
        let map = headers(&[("x-real-ip", "70.2.2.2"), ("cf-connecting-ip", "70.3.3.3")]);
        assert_eq!(client_ip(&map), "70.2.2.2");
    }

    #[test]
    fn cf_connecting_ip_is_last_resort_header() {
        let map = headers(&[("cf-connecting-ip", "70.3.3.3")]);
        assert_eq!(client_ip(&map), "70.3.3.3");
    }

    #[test]
    fn no_headers_defaults_to_loopback() {
        assert_eq!(client_ip(&HeaderMap::new()), "127.0.0.1");
    }

    #[test]
    fn ipv6_loopback_normalizes() {
        let map = headers(&[("x-forwarded-for", "::1")]);
        assert_eq!(client_ip(&map), "127.0.0.1");

        let map = headers(&[("x-real-ip", "::1")]);
        assert_eq!(client_ip(&map), "127.0.0.1");
    }

    #[test]
    fn cidr_slash_24_contains_host() {
        assert!(cidr_match("203.0.113.5", "203.0.113.0/24"));
    }

    #[test]
    fn cidr_slash_25_boundary() {
        // /25 covers .0-.127 only.
        assert!(cidr_match("203.0.113.5", "203.0.113.0/25"));
        assert!(!cidr_match("203.0.113.200", "203.0.113.0/25"));
    }

    #[test]
    fn cidr_slash_32_is_single_host() {
        assert!(cidr_match("198.51.100.7", "198.51.100.7/32"));
        assert!(!cidr_match("198.51.100.8", "198.51.100.7/32"));
    }

    #[test]
    fn cidr_slash_zero_matches_everything() {
        assert!(cidr_match("8.8.8.8", "0.0.0.0/0"));
        assert!(cidr_match("203.0.113.5", "10.0.0.0/0"));
    }

    #[test]
    fn cidr_rejects_out_of_range_prefix() {
        assert!(!cidr_match("203.0.113.5", "203.0.113.0/33"));
        assert!(!cidr_match("203.0.113.5", "203.0.113.0/99"));
        assert!(!cidr_match("203.0.113.5", "203.0.113.0/-1"));
        assert!(!cidr_match("203.0.113.5", "203.0.113.0/x"));
    }

    #[test]
    fn cidr_rejects_malformed_network() {
        assert!(!cidr_match("203.0.113.5", "not-an-ip/24"));
        assert!(!cidr_match("203.0.113.5", "203.0.113/24"));
        assert!(!cidr_match("203.0.113.5", "203.0.113.300/24"));
    }

    #[test]
    fn exact_entry_matches_only_itself() {
        let entries = vec!["198.51.100.7".to_string()];
        assert!(ip_allowed("198.51.100.7", &entries));
        assert!(!ip_allowed("198.51.100.8", &entries));
        assert!(!ip_allowed("198.51.100.70", &entries));
    }

    #[test]
    fn empty_allowlist_denies_everyone() {
        assert!(!ip_allowed("127.0.0.1", &[]));
        assert!(!ip_allowed("203.0.113.5", &[]));
    }

    #[test]
    fn malformed_entry_is_skipped_not_fatal() {
        let entries = vec![
            "not-an-ip/24".to_string(),
            "203.0.113.0/24".to_string(),
        ];
        assert!(ip_allowed("203.0.113.5", &entries));
        assert!(!ip_allowed("198.51.100.7", &entries));
    }

    #[test]
    fn exempt_paths() {
        assert!(is_exempt("/api/login"));
        assert!(is_exempt("/api/health"));
        assert!(is_exempt("/_next/static/chunk.js"));
        assert!(is_exempt("/static/logo.png"));
        assert!(is_exempt("/favicon.ico"));
        assert!(is_exempt("/login"));
        assert!(is_exempt("/hasura-test"));

        assert!(!is_exempt("/"));
        assert!(!is_exempt("/admin/users"));
        assert!(!is_exempt("/login/nested"));
    }

    #[test]
    fn session_detection() {
        assert!(has_session(&headers(&[("authorization", "Bearer abc")])));
        assert!(has_session(&headers(&[("cookie", "authToken=abc; theme=dark")])));
        assert!(has_session(&headers(&[("cookie", "theme=dark;authToken=abc")])));

        assert!(!has_session(&HeaderMap::new()));
        assert!(!has_session(&headers(&[("cookie", "theme=dark")])));
        assert!(!has_session(&headers(&[("cookie", "authToken=")])));
    }
}
