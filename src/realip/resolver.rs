//! Real client address resolution.
//!
//! Sources are tried in a fixed order and the first one that yields an IP
//! literal wins:
//!
//! ```text
//! X-Forwarded-For (scanned per RealIpMode)
//!     → X-Real-IP
//!     → transport peer address
//! ```
//!
//! Header values are client controlled, so every malformed candidate is
//! skipped rather than reported. An empty string means "unresolved".

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request};

use super::mode::RealIpMode;

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";

/// What the resolver needs to see of an inbound request.
pub trait RealIpSource {
    /// Case-insensitive header lookup. Values that are not valid UTF-8 count as absent.
    fn header(&self, name: &str) -> Option<&str>;

    /// Transport peer address, `host:port` or `[host]:port`.
    fn remote_addr(&self) -> Option<String>;
}

/// The peer address comes from axum's `ConnectInfo<SocketAddr>` extension.
impl<B> RealIpSource for Request<B> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn remote_addr(&self) -> Option<String> {
        self.extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.to_string())
    }
}

/// A borrowed view over headers and a raw peer address string.
#[derive(Debug, Clone)]
pub struct PeerRequest<'a> {
    headers: &'a HeaderMap,
    remote_addr: String,
}

impl<'a> PeerRequest<'a> {
    pub fn new(headers: &'a HeaderMap, remote_addr: impl Into<String>) -> Self {
        Self {
            headers,
            remote_addr: remote_addr.into(),
        }
    }
}

impl RealIpSource for PeerRequest<'_> {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn remote_addr(&self) -> Option<String> {
        Some(self.remote_addr.clone())
    }
}

/// Resolve the originating client address as a canonical IP literal.
///
/// Returns an empty string when nothing resolves, including when `request` is `None`.
pub fn resolve_real_ip<R>(request: Option<&R>, mode: RealIpMode) -> String
where
    R: RealIpSource + ?Sized,
{
    request
        .and_then(|request| resolve_client_ip(request, mode))
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

/// Typed form of [`resolve_real_ip`].
pub fn resolve_client_ip<R>(request: &R, mode: RealIpMode) -> Option<IpAddr>
where
    R: RealIpSource + ?Sized,
{
    request
        .header(X_FORWARDED_FOR)
        .and_then(|chain| scan_forwarded_for(chain, mode))
        .or_else(|| request.header(X_REAL_IP).and_then(parse_ip_token))
        .or_else(|| request.remote_addr().as_deref().and_then(parse_ip_token))
}

/// First parseable entry of a comma separated chain, scanning in `mode` order.
pub fn scan_forwarded_for(chain: &str, mode: RealIpMode) -> Option<IpAddr> {
    let mut tokens = chain.split(',');
    match mode {
        RealIpMode::Left => tokens.find_map(parse_ip_token),
        RealIpMode::Right => tokens.rev().find_map(parse_ip_token),
    }
}

/// Normalize one candidate token into an IP address.
///
/// Accepts bare IPv4/IPv6, `ipv4:port`, `[ipv6]:port` and `[ipv6]`, optionally
/// wrapped in double quotes and whitespace.
pub fn parse_ip_token(token: &str) -> Option<IpAddr> {
    let token = strip_quotes(token.trim()).trim();
    if token.is_empty() {
        return None;
    }

    if let Some(ip) = parse_ip(token) {
        return Some(ip);
    }

    if let Some((host, _port)) = split_host_port(token) {
        if let Some(ip) = parse_ip(strip_brackets(host).trim()) {
            return Some(ip);
        }
    }

    parse_ip(strip_brackets(token))
}

fn parse_ip(s: &str) -> Option<IpAddr> {
    s.parse::<IpAddr>().ok().map(|ip| ip.to_canonical())
}

fn strip_quotes(s: &str) -> &str {
    let s = s.strip_prefix('"').unwrap_or(s);
    s.strip_suffix('"').unwrap_or(s)
}

fn strip_brackets(s: &str) -> &str {
    let s = s.strip_prefix('[').unwrap_or(s);
    s.strip_suffix(']').unwrap_or(s)
}

/// Split `host:port` or `[host]:port`. The port is not validated.
fn split_host_port(s: &str) -> Option<(&str, &str)> {
    if let Some(rest) = s.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        let port = tail.strip_prefix(':')?;
        if host.contains('[') || port.contains([':', '[', ']']) {
            return None;
        }
        return Some((host, port));
    }

    let (host, port) = s.rsplit_once(':')?;
    if host.contains([':', '[', ']']) || port.contains([']', '[']) {
        return None;
    }
    Some((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn request(xff: Option<&str>, x_real_ip: Option<&str>, remote_addr: &str) -> Request<()> {
        let mut builder = Request::builder();
        if let Some(xff) = xff {
            builder = builder.header("X-Forwarded-For", xff);
        }
        if let Some(x_real_ip) = x_real_ip {
            builder = builder.header("X-Real-IP", x_real_ip);
        }
        let mut req = builder.body(()).unwrap();
        let addr: SocketAddr = remote_addr.parse().unwrap();
        req.extensions_mut().insert(ConnectInfo(addr));
        req
    }

    #[test]
    fn falls_back_to_remote_addr_in_every_mode() {
        let req = request(None, None, "4.4.4.4:56789");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "4.4.4.4");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Left), "4.4.4.4");
    }

    #[test]
    fn right_mode_prefers_nearest_hop() {
        let req = request(Some("1.1.1.1, 2.2.2.2"), None, "10.0.0.1:12345");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "2.2.2.2");
    }

    #[test]
    fn left_mode_prefers_originating_client() {
        let req = request(Some("1.1.1.1, 2.2.2.2"), None, "10.0.0.1:12345");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Left), "1.1.1.1");
    }

    #[test]
    fn unparseable_chain_falls_through_to_x_real_ip() {
        let req = request(Some("unknown, -,"), Some("3.3.3.3"), "10.0.0.1:12345");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "3.3.3.3");
    }

    #[test]
    fn bad_x_real_ip_falls_through_to_remote_addr() {
        let req = request(Some("garbage"), Some("also garbage"), "[2001:db8::7]:443");
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "2001:db8::7");
    }

    #[test]
    fn tolerant_token_forms() {
        let req = request(
            Some("  bad-token  , \"5.5.5.5:1234\", [2001:db8::1]:443 "),
            None,
            "10.0.0.1:12345",
        );
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "2001:db8::1");
        // Left skips the bad token and unwraps the quoted host:port.
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Left), "5.5.5.5");
    }

    #[test]
    fn absent_request_is_unresolved() {
        assert_eq!(resolve_real_ip::<Request<()>>(None, RealIpMode::Right), "");
    }

    #[test]
    fn request_without_peer_address_is_unresolved() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "");
    }

    #[test]
    fn resolution_is_idempotent() {
        let req = request(Some("1.1.1.1, 2.2.2.2"), Some("3.3.3.3"), "10.0.0.1:1");
        let first = resolve_real_ip(Some(&req), RealIpMode::Left);
        let second = resolve_real_ip(Some(&req), RealIpMode::Left);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_mode_string_behaves_like_right() {
        let req = request(Some("1.1.1.1, 2.2.2.2"), None, "10.0.0.1:12345");
        let mode = RealIpMode::parse("middle");
        assert_eq!(
            resolve_real_ip(Some(&req), mode),
            resolve_real_ip(Some(&req), RealIpMode::Right)
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("9.9.9.9"));
        let req = PeerRequest::new(&headers, "10.0.0.1:12345");
        assert_eq!(req.header("X-REAL-IP"), Some("9.9.9.9"));
        assert_eq!(resolve_real_ip(Some(&req), RealIpMode::Right), "9.9.9.9");
    }

    #[test]
    fn parse_ip_token_forms() {
        let cases = [
            ("", None),
            ("   ", None),
            ("\"\"", None),
            ("unknown", None),
            ("-", None),
            ("1.2.3.4", Some("1.2.3.4")),
            (" 1.2.3.4 ", Some("1.2.3.4")),
            ("\"1.2.3.4\"", Some("1.2.3.4")),
            ("1.2.3.4:80", Some("1.2.3.4")),
            ("1.2.3.4:", Some("1.2.3.4")),
            ("::1", Some("::1")),
            ("[::1]", Some("::1")),
            ("[::1]:8080", Some("::1")),
            ("2001:DB8:0:0:0:0:0:1", Some("2001:db8::1")),
            ("\"[2001:db8::1]:443\"", Some("2001:db8::1")),
            ("::ffff:192.0.2.1", Some("192.0.2.1")),
            ("1.2.3.4:80:90", None),
            ("[1.2.3.4", Some("1.2.3.4")),
            ("[[::1]:80", None),
            ("[::1]]:80", None),
            ("256.1.1.1", None),
            ("example.com:80", None),
        ];

        for (token, expected) in cases {
            assert_eq!(
                parse_ip_token(token).map(|ip| ip.to_string()).as_deref(),
                expected,
                "token {token:?}"
            );
        }
    }

    #[test]
    fn nested_brackets_are_rejected() {
        assert_eq!(split_host_port("[[::1]:80"), None);
        assert_eq!(split_host_port("[::1]:80"), Some(("::1", "80")));
        assert_eq!(
            scan_forwarded_for("[[::1]:80, 9.9.9.9", RealIpMode::Left),
            Some("9.9.9.9".parse().unwrap())
        );
    }

    #[test]
    fn scan_skips_empty_entries() {
        assert_eq!(
            scan_forwarded_for(",,7.7.7.7,,", RealIpMode::Left),
            Some("7.7.7.7".parse().unwrap())
        );
        assert_eq!(scan_forwarded_for("", RealIpMode::Right), None);
    }
}
