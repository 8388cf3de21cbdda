//! Request classification.
//!
//! # Responsibilities
//! - Map method, path and upgrade headers to exactly one handler kind
//! - Stay pure: no I/O, no state reads, so routing is unit-testable
//!
//! # Design Decisions
//! - Tagged enum instead of virtual dispatch; the server matches on it
//! - `/burst` is told apart by its `requestType` query parameter, the way
//!   downstream miners address a wallet node
//! - Paths that do not look like a file (no extension) are unroutable
//!   rather than asset probes, so scanners get a quiet 404

use axum::http::{header, HeaderMap, Method, Uri};

use crate::http::forward::UpstreamTarget;

/// The handler a request is routed to. Selection is a pure function of
/// method, path and upgrade headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    /// Local JSON snapshot of the current block.
    MiningInfo,
    /// Nonce submission and capacity announcement path.
    SubmitNonce,
    /// Verbatim relay to the named upstream.
    Forward(UpstreamTarget),
    /// WebSocket upgrade for live UI updates.
    Upgrade,
    /// Index page with template substitution.
    Root,
    /// Static file under the web root.
    Asset,
    /// Request the gateway refuses to interpret.
    BadRequest,
    /// No handler claims the path.
    NotFound,
}

impl HandlerKind {
    /// Stable label for metrics and access logs.
    pub fn label(&self) -> &'static str {
        match self {
            HandlerKind::MiningInfo => "mining_info",
            HandlerKind::SubmitNonce => "submit_nonce",
            HandlerKind::Forward(UpstreamTarget::Pool) => "forward_pool",
            HandlerKind::Forward(UpstreamTarget::Wallet) => "forward_wallet",
            HandlerKind::Upgrade => "upgrade",
            HandlerKind::Root => "root",
            HandlerKind::Asset => "asset",
            HandlerKind::BadRequest => "bad_request",
            HandlerKind::NotFound => "not_found",
        }
    }
}

/// Path of the WebSocket endpoint.
pub const UPGRADE_PATH: &str = "/ws";

/// Path prefix shared by the mining API.
const BURST_PATH: &str = "/burst";

/// Classify one inbound request.
pub fn classify(method: &Method, uri: &Uri, headers: &HeaderMap) -> HandlerKind {
    let path = uri.path();

    // A path we cannot even decode is answered with a clean 400 instead of
    // being guessed at.
    if percent_decode(path).is_none() {
        return HandlerKind::BadRequest;
    }

    if path == UPGRADE_PATH {
        if method == Method::GET && wants_websocket(headers) {
            return HandlerKind::Upgrade;
        }
        return HandlerKind::BadRequest;
    }

    if path == BURST_PATH {
        return match query_first(uri, "requestType").as_deref() {
            Some("getMiningInfo") => HandlerKind::MiningInfo,
            Some("submitNonce") => HandlerKind::SubmitNonce,
            // Anything else a miner asks of a wallet node is relayed.
            _ => HandlerKind::Forward(UpstreamTarget::Wallet),
        };
    }

    if method != Method::GET {
        return HandlerKind::NotFound;
    }

    if path == "/" {
        return HandlerKind::Root;
    }

    // Only file-shaped paths are treated as asset reads.
    if looks_like_file(path) {
        return HandlerKind::Asset;
    }

    HandlerKind::NotFound
}

/// First occurrence of a query parameter, form-decoded.
pub fn query_first(uri: &Uri, name: &str) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Decode percent-escapes, rejecting truncated or non-hex sequences and
/// escapes that do not form valid UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn wants_websocket(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

fn looks_like_file(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .map(|segment| segment.contains('.'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(uri: &str) -> HandlerKind {
        classify(&Method::GET, &uri.parse().unwrap(), &HeaderMap::new())
    }

    #[test]
    fn test_burst_request_types() {
        assert_eq!(get("/burst?requestType=getMiningInfo"), HandlerKind::MiningInfo);
        assert_eq!(
            get("/burst?requestType=submitNonce&accountId=123&nonce=456"),
            HandlerKind::SubmitNonce
        );
        assert_eq!(
            get("/burst?requestType=getBlocks"),
            HandlerKind::Forward(UpstreamTarget::Wallet)
        );
        assert_eq!(get("/burst"), HandlerKind::Forward(UpstreamTarget::Wallet));
    }

    #[test]
    fn test_submit_nonce_accepts_post() {
        let kind = classify(
            &Method::POST,
            &"/burst?requestType=submitNonce".parse().unwrap(),
            &HeaderMap::new(),
        );
        assert_eq!(kind, HandlerKind::SubmitNonce);
    }

    #[test]
    fn test_first_query_occurrence_wins() {
        let uri: Uri = "/burst?requestType=submitNonce&requestType=getMiningInfo"
            .parse()
            .unwrap();
        assert_eq!(query_first(&uri, "requestType").as_deref(), Some("submitNonce"));
    }

    #[test]
    fn test_upgrade_needs_websocket_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::UPGRADE, "websocket".parse().unwrap());
        assert_eq!(
            classify(&Method::GET, &UPGRADE_PATH.parse().unwrap(), &headers),
            HandlerKind::Upgrade
        );
        assert_eq!(get(UPGRADE_PATH), HandlerKind::BadRequest);
    }

    #[test]
    fn test_root_and_assets() {
        assert_eq!(get("/"), HandlerKind::Root);
        assert_eq!(get("/css/style.css"), HandlerKind::Asset);
        assert_eq!(get("/logo.png"), HandlerKind::Asset);
        assert_eq!(get("/nope"), HandlerKind::NotFound);
    }

    #[test]
    fn test_non_get_is_unroutable() {
        let kind = classify(
            &Method::POST,
            &"/style.css".parse().unwrap(),
            &HeaderMap::new(),
        );
        assert_eq!(kind, HandlerKind::NotFound);
    }

    #[test]
    fn test_invalid_escape_is_bad_request() {
        assert_eq!(get("/%zz"), HandlerKind::BadRequest);
        assert_eq!(get("/%e0%80"), HandlerKind::BadRequest);
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("plain").as_deref(), Some("plain"));
        assert_eq!(
            percent_decode("a%20plot%2Efile").as_deref(),
            Some("a plot.file")
        );
        assert_eq!(percent_decode("%2"), None);
        assert_eq!(percent_decode("%gg"), None);
    }
}
