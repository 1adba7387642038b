use std::time::Duration;

use tracing::{debug, info};

use super::ApiDocument;
use crate::error::{ProbeError, Result};

/// Default timeout for fetching a document.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Download and parse an OpenAPI/Swagger document (JSON or YAML).
pub async fn fetch_document(url: &str, timeout: Duration) -> Result<ApiDocument> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| fetch_error(url, e.to_string()))?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "application/json, application/yaml")
        .send()
        .await
        .map_err(|e| fetch_error(url, describe(&e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(fetch_error(
            url,
            format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        ));
    }

    let body = response
        .text()
        .await
        .map_err(|e| fetch_error(url, describe(&e)))?;
    debug!(url, bytes = body.len(), "document downloaded");

    let doc = ApiDocument::parse_str(&body).map_err(|e| fetch_error(url, e.to_string()))?;
    info!(url, version = %doc.version.label(), "document loaded");
    Ok(doc)
}

fn describe(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timeout - document endpoint took too long to respond".into()
    } else if e.is_connect() || e.is_request() {
        "network error - unable to reach document endpoint".into()
    } else {
        e.to_string()
    }
}

fn fetch_error(url: &str, message: String) -> ProbeError {
    ProbeError::Fetch {
        url: url.to_string(),
        message,
    }
}
