//! Nonce submission handling.
//!
//! # Responsibilities
//! - Record capacity announced alongside a submission
//! - Parse the submission fields from headers and query string
//! - Route complete submissions to the scoring pipeline and relay its JSON
//! - Repurpose incomplete submissions as capacity announcements to the pool
//!
//! # Design Decisions
//! - Fields are presence-tagged: absent and unparsable are both `None`,
//!   and a literal zero counts as absent for branch selection so zero
//!   sentinels from old miners keep forwarding
//! - The audit log line is written before the branch is taken; it is the
//!   only trail covering every submission attempt
//! - The scoring wait is bounded; on expiry the miner gets a synthesized
//!   failure body instead of a hung connection

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, Uri};
use axum::response::Response;

use crate::http::dispatcher::{percent_decode, query_first};
use crate::http::forward::{self, UpstreamTarget};
use crate::http::response;
use crate::http::server::AppState;
use crate::miner::{deadline_format, SubmissionCandidate};
use crate::observability::metrics;
use crate::registry::Account;

/// Hash identifying a miner's plot set, URI-encoded.
pub const X_PLOTS_HASH: HeaderName = HeaderName::from_static("x-plotshash");
/// Capacity in gigabytes behind a plot set, decimal.
pub const X_CAPACITY: HeaderName = HeaderName::from_static("x-capacity");
/// Plot file a nonce was found in, URI-encoded.
pub const X_PLOTFILE: HeaderName = HeaderName::from_static("x-plotfile");
/// Deadline computed by the submitting miner, decimal seconds.
pub const X_DEADLINE: HeaderName = HeaderName::from_static("x-deadline");

/// Submission fields as parsed from one request.
///
/// A field is present only when its source parses as an unsigned integer;
/// callers can tell "absent" from any present value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubmissionParams {
    pub account_id: Option<u64>,
    pub nonce: Option<u64>,
    pub deadline: Option<u64>,
    pub plot_id: String,
    pub plots_hash: Option<String>,
    pub declared_capacity: Option<u64>,
}

impl SubmissionParams {
    /// Parse headers and query string. Never fails; missing or malformed
    /// pieces leave their field absent.
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Self {
        let plots_hash = decoded_header(headers, &X_PLOTS_HASH);
        let declared_capacity = u64_header(headers, &X_CAPACITY);

        let account_id = query_first(uri, "accountId").and_then(|raw| raw.parse().ok());
        let nonce = query_first(uri, "nonce").and_then(|raw| raw.parse().ok());
        let deadline = u64_header(headers, &X_DEADLINE);

        let plot_id = decoded_header(headers, &X_PLOTFILE)
            .or_else(|| plots_hash.clone())
            .unwrap_or_else(|| "unknown".to_string());

        Self {
            account_id,
            nonce,
            deadline,
            plot_id,
            plots_hash,
            declared_capacity,
        }
    }

    /// True when account, nonce and deadline are all present and non-zero.
    pub fn is_complete(&self) -> bool {
        fn present(field: Option<u64>) -> bool {
            matches!(field, Some(value) if value != 0)
        }
        present(self.account_id) && present(self.nonce) && present(self.deadline)
    }
}

/// Handle one submission request end to end.
pub async fn handle(state: AppState, request: Request<Body>) -> Response {
    let params = SubmissionParams::from_request(request.uri(), request.headers());

    // Capacity announcements ride along with every submission. A pair that
    // does not parse is dropped without affecting the rest of the flow.
    match (&params.plots_hash, params.declared_capacity) {
        (Some(hash), Some(capacity)) => state.plots.set(hash.clone(), capacity),
        (Some(hash), None) => {
            tracing::debug!(hash = %hash, "Capacity header from miner is not a number");
        }
        _ => {}
    }

    let account = state.accounts.resolve(params.account_id.unwrap_or(0));
    refresh_account_name(&state, &account);

    // Every submission attempt leaves this line, whichever branch wins.
    tracing::info!(
        deadline = %deadline_format(params.deadline.unwrap_or(0)),
        nonce = params.nonce.unwrap_or(0),
        account = %account.display_name(),
        plot = %params.plot_id,
        "Got nonce forward request"
    );

    if params.is_complete() {
        metrics::record_submission("local");
        score_locally(&state, &params).await
    } else {
        metrics::record_submission("announce");
        announce_capacity(&state, request).await
    }
}

/// Branch A: hand the candidate to the scoring pipeline and relay its
/// verdict. The body size is unknown until scoring finishes, so the
/// response is chunked.
async fn score_locally(state: &AppState, params: &SubmissionParams) -> Response {
    let candidate = SubmissionCandidate {
        // is_complete() checked all three fields.
        nonce: params.nonce.unwrap_or(0),
        account_id: params.account_id.unwrap_or(0),
        deadline: params.deadline.unwrap_or(0),
        height: state.miner.height(),
        plot_id: params.plot_id.clone(),
    };

    let verdict = state.pipeline.submit(candidate);

    match tokio::time::timeout(state.submission_timeout, verdict).await {
        Ok(Ok(outcome)) => {
            state.connections.publish(outcome.json.clone());
            response::chunked_ok(outcome.json, Some("application/json"))
        }
        Ok(Err(_)) => {
            tracing::error!(
                nonce = params.nonce.unwrap_or(0),
                "Scoring pipeline dropped the submission"
            );
            response::empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(_) => {
            tracing::warn!(
                nonce = params.nonce.unwrap_or(0),
                timeout_secs = state.submission_timeout.as_secs(),
                "Scoring did not finish in time"
            );
            let fallback = serde_json::json!({
                "result": "failure",
                "reason": "scoring timed out",
            })
            .to_string();
            response::chunked_ok(fallback, Some("application/json"))
        }
    }
}

/// Branch B: overwrite the capacity header with the total of everything
/// announced so far and relay the request to the pool.
async fn announce_capacity(state: &AppState, request: Request<Body>) -> Response {
    let total = state.plots.total();

    let (mut parts, body) = request.into_parts();
    parts.headers.insert(X_CAPACITY, HeaderValue::from(total));
    let request = Request::from_parts(parts, body);

    match state.upstreams.create_session(UpstreamTarget::Pool) {
        Some(session) => forward::forward(session, request).await,
        None => {
            tracing::debug!("No pool upstream configured, capacity announcement dropped");
            response::empty(StatusCode::BAD_GATEWAY)
        }
    }
}

/// Ask the wallet for a name the registry does not have yet. Fire and
/// forget; the current request never waits on it.
fn refresh_account_name(state: &AppState, account: &Account) {
    if account.id == 0 || !account.name.is_empty() || !state.wallet.is_active() {
        return;
    }
    if state.accounts.get(account.id).is_some() {
        return;
    }

    let wallet = state.wallet.clone();
    let accounts = state.accounts.clone();
    let id = account.id;
    tokio::spawn(async move {
        match wallet.get_account_name(id).await {
            Ok(Some(name)) => accounts.insert(Account::with_name(id, name)),
            Ok(None) => accounts.insert(Account::new(id)),
            Err(e) => tracing::debug!(account = id, error = %e, "Account name lookup failed"),
        }
    });
}

fn decoded_header(headers: &HeaderMap, name: &HeaderName) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    percent_decode(raw)
}

fn u64_header(headers: &HeaderMap, name: &HeaderName) -> Option<u64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit_uri(query: &str) -> Uri {
        format!("/burst?requestType=submitNonce&{}", query)
            .parse()
            .unwrap()
    }

    #[test]
    fn test_complete_submission_parses_all_fields() {
        let mut headers = HeaderMap::new();
        headers.insert(X_DEADLINE, "789".parse().unwrap());

        let params =
            SubmissionParams::from_request(&submit_uri("accountId=123&nonce=456"), &headers);
        assert_eq!(params.account_id, Some(123));
        assert_eq!(params.nonce, Some(456));
        assert_eq!(params.deadline, Some(789));
        assert_eq!(params.plot_id, "unknown");
        assert!(params.is_complete());
    }

    #[test]
    fn test_missing_or_malformed_fields_are_absent() {
        let params = SubmissionParams::from_request(
            &submit_uri("accountId=not-a-number&nonce=456"),
            &HeaderMap::new(),
        );
        assert_eq!(params.account_id, None);
        assert_eq!(params.deadline, None);
        assert!(!params.is_complete());
    }

    #[test]
    fn test_zero_counts_as_absent_for_branching() {
        let mut headers = HeaderMap::new();
        headers.insert(X_DEADLINE, "0".parse().unwrap());

        let params =
            SubmissionParams::from_request(&submit_uri("accountId=123&nonce=456"), &headers);
        assert_eq!(params.deadline, Some(0));
        assert!(!params.is_complete());
    }

    #[test]
    fn test_first_query_occurrence_wins() {
        let params = SubmissionParams::from_request(
            &submit_uri("accountId=1&accountId=2&nonce=9"),
            &HeaderMap::new(),
        );
        assert_eq!(params.account_id, Some(1));
    }

    #[test]
    fn test_plot_id_precedence() {
        let uri = submit_uri("accountId=1&nonce=2");

        let mut headers = HeaderMap::new();
        headers.insert(X_PLOTS_HASH, "cafebabe".parse().unwrap());
        let params = SubmissionParams::from_request(&uri, &headers);
        assert_eq!(params.plot_id, "cafebabe");

        headers.insert(X_PLOTFILE, "drive%2Fplots%2F123_0_8192".parse().unwrap());
        let params = SubmissionParams::from_request(&uri, &headers);
        assert_eq!(params.plot_id, "drive/plots/123_0_8192");

        let params = SubmissionParams::from_request(&uri, &HeaderMap::new());
        assert_eq!(params.plot_id, "unknown");
    }

    #[test]
    fn test_malformed_capacity_pair_leaves_capacity_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(X_PLOTS_HASH, "cafebabe".parse().unwrap());
        headers.insert(X_CAPACITY, "a-lot".parse().unwrap());

        let params = SubmissionParams::from_request(&submit_uri("accountId=1"), &headers);
        assert_eq!(params.plots_hash.as_deref(), Some("cafebabe"));
        assert_eq!(params.declared_capacity, None);
    }
}
