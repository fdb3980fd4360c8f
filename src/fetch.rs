// Remote payload retrieval. Every call is blocking, bounded by a timeout and
// fails closed: a timeout or a non-success status is an error, never an empty
// payload.

use std::time::Duration;

use log::info;
use reqwest::blocking::{Client, Response};
use reqwest::header;
use serde_json::Value;
use snafu::ResultExt;

use crate::ingest::{FetchSnafu, HttpClientSnafu, IngestResult, RawPayload};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

fn client() -> IngestResult<Client> {
    Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .context(HttpClientSnafu {})
}

/// Downloads a resource. The response content type is kept as a parsing hint
/// for the resolver.
pub fn fetch_url(url: &str) -> IngestResult<RawPayload> {
    info!("fetch_url: {}", url);
    let response = client()?
        .get(url)
        .send()
        .and_then(Response::error_for_status)
        .context(FetchSnafu { url })?;
    payload_from_response(url, response)
}

/// POSTs a JSON-stat query document (`{"query": [...], "response":
/// {"format": "JSON-STAT2"}}`) and returns the raw response payload.
pub fn post_stat_query(url: &str, query: &Value) -> IngestResult<RawPayload> {
    info!("post_stat_query: {}", url);
    let response = client()?
        .post(url)
        .header(header::ACCEPT, "application/json")
        .json(query)
        .send()
        .and_then(Response::error_for_status)
        .context(FetchSnafu { url })?;
    payload_from_response(url, response)
}

fn payload_from_response(url: &str, response: Response) -> IngestResult<RawPayload> {
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_lowercase());
    let bytes = response.bytes().context(FetchSnafu { url })?.to_vec();
    Ok(RawPayload {
        bytes,
        content_type,
        name: Some(url.to_string()),
    })
}
