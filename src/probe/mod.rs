//! Executor: turns one test case into one HTTP request and classifies the
//! response.

pub mod classify;
pub mod result;
pub mod transport;

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

use crate::model::{Endpoint, ParameterLocation};
use crate::plan::TestCase;
use crate::rules::ProbeValue;

pub use classify::{classify, Classification};
pub use result::{Outcome, TestResult, EXPECTED_BEHAVIOR};
pub use transport::{
    HttpTransport, ProbeRequest, ProbeResponse, Transport, TransportError, TransportErrorKind,
    REQUEST_TIMEOUT,
};

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{([^{}]+)\}").expect("valid regex"));

/// Sends probes through a `Transport` and classifies what comes back.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
}

impl Executor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Execute one test case. Never fails: transport problems become an
    /// inconclusive result.
    pub async fn execute(&self, case: &TestCase, endpoint: &Endpoint, base_url: &str) -> TestResult {
        let response = match build_request(case, endpoint, base_url) {
            Ok(request) => {
                debug!(test_id = %case.id, method = %request.method, url = %request.url, "sending probe");
                self.transport.send(&request).await
            }
            Err(e) => Err(e),
        };

        let classification = classify(case.rule, response.as_ref());
        let (status, transport_error) = match &response {
            Ok(r) => (Some(r.status), None),
            Err(e) => (None, Some(e.message.clone())),
        };
        debug!(
            test_id = %case.id,
            status = ?status,
            outcome = %classification.outcome,
            "probe classified"
        );

        let remediation = (classification.outcome == Outcome::Fail)
            .then(|| case.rule.remediation(&case.parameter.name));

        TestResult {
            id: case.id.clone(),
            endpoint_id: case.endpoint_id.clone(),
            rule: case.rule,
            rule_name: case.rule.name().to_string(),
            parameter_name: case.parameter.name.clone(),
            test_value: case.value.clone(),
            expected_behavior: EXPECTED_BEHAVIOR.to_string(),
            status,
            transport_error,
            outcome: classification.outcome,
            severity: classification.severity,
            message: classification.message,
            remediation,
            timestamp: Utc::now(),
        }
    }
}

/// Build the request for a test case, placing the probe value where the
/// parameter's location says it belongs.
pub fn build_request(
    case: &TestCase,
    endpoint: &Endpoint,
    base_url: &str,
) -> Result<ProbeRequest, TransportError> {
    let param = &case.parameter;
    let path_value = match param.location {
        ParameterLocation::Path => Some(case.value.as_param_text().unwrap_or_default()),
        _ => None,
    };

    let mut url = join_url(base_url, &endpoint.path, &param.name, path_value.as_deref())?;
    let mut headers = Vec::new();
    let mut body = None;

    match param.location {
        ParameterLocation::Path => {}
        ParameterLocation::Query => {
            if let Some(text) = case.value.as_param_text() {
                url.query_pairs_mut().append_pair(&param.name, &text);
            }
        }
        ParameterLocation::Header => {
            if let Some(text) = case.value.as_param_text() {
                headers.push((param.name.clone(), text));
            }
        }
        ParameterLocation::Cookie => {
            if let Some(text) = case.value.as_param_text() {
                headers.push(("Cookie".to_string(), format!("{}={}", param.name, text)));
            }
        }
        ParameterLocation::Body => {
            let mut payload = Map::new();
            if let ProbeValue::Json(value) = &case.value {
                payload.insert(param.name.clone(), value.clone());
            }
            body = Some(Value::Object(payload));
        }
    }

    Ok(ProbeRequest {
        method: endpoint.method,
        url,
        headers,
        body,
    })
}

/// Append the path template to the base URL, substituting `{name}` with
/// `value` (percent-encoded as a single segment). Other path tokens are kept
/// literally.
fn join_url(
    base_url: &str,
    template: &str,
    name: &str,
    value: Option<&str>,
) -> Result<Url, TransportError> {
    let invalid = |message: String| TransportError {
        kind: TransportErrorKind::InvalidRequest,
        message,
    };

    if base_url.trim().is_empty() {
        return Err(invalid("no base URL configured".into()));
    }
    let mut url =
        Url::parse(base_url.trim()).map_err(|e| invalid(format!("invalid base URL '{base_url}': {e}")))?;

    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| invalid(format!("base URL '{base_url}' cannot carry a path")))?;
        segments.pop_if_empty();
        for segment in template.split('/').filter(|s| !s.is_empty()) {
            let substituted = PATH_TOKEN.replace_all(segment, |caps: &regex::Captures<'_>| {
                match value {
                    Some(v) if &caps[1] == name => v.to_string(),
                    _ => caps[0].to_string(),
                }
            });
            segments.push(&substituted);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HttpMethod, Parameter, Schema, SchemaType};
    use crate::rules::RuleId;
    use crate::rules::Severity;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    fn endpoint(path: &str, method: HttpMethod) -> Endpoint {
        Endpoint {
            id: Endpoint::identity(method, path),
            method,
            path: path.into(),
            summary: String::new(),
            description: String::new(),
            tags: vec![],
            parameters: vec![],
            request_body: None,
            responses: vec![],
            security: vec![],
        }
    }

    fn case(name: &str, location: ParameterLocation, rule: RuleId, value: ProbeValue) -> TestCase {
        TestCase {
            id: format!("E_{rule}_{name}_0"),
            endpoint_id: "E".into(),
            rule,
            parameter: Parameter {
                name: name.into(),
                location,
                required: true,
                schema: Schema::of_type(SchemaType::Integer),
                description: String::new(),
            },
            value_index: 0,
            value,
        }
    }

    /// Records requests and answers with a fixed status.
    struct FixedTransport {
        status: Result<u16, TransportError>,
        seen: Mutex<Vec<ProbeRequest>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.status.clone().map(|status| ProbeResponse { status })
        }
    }

    fn executor(status: Result<u16, TransportError>) -> (Executor, Arc<FixedTransport>) {
        let transport = Arc::new(FixedTransport {
            status,
            seen: Mutex::new(Vec::new()),
        });
        (Executor::new(transport.clone()), transport)
    }

    #[test]
    fn path_value_replaces_token_and_is_encoded() {
        let ep = endpoint("/users/{id}/orders/{orderId}", HttpMethod::Get);
        let c = case("id", ParameterLocation::Path, RuleId::NoString, ProbeValue::text("!@#$"));
        let req = build_request(&c, &ep, "http://localhost:3000/api/").unwrap();
        assert_eq!(
            req.url.as_str(),
            "http://localhost:3000/api/users/!@%23$/orders/%7BorderId%7D"
        );
    }

    #[test]
    fn null_path_value_leaves_empty_segment() {
        let ep = endpoint("/users/{id}", HttpMethod::Get);
        let c = case("id", ParameterLocation::Path, RuleId::RequiredCheck, ProbeValue::null());
        let req = build_request(&c, &ep, "http://h").unwrap();
        assert_eq!(req.url.as_str(), "http://h/users/");
    }

    #[test]
    fn query_and_header_values() {
        let ep = endpoint("/search", HttpMethod::Get);
        let q = case("q", ParameterLocation::Query, RuleId::Whitespace, ProbeValue::text("  "));
        let req = build_request(&q, &ep, "http://h").unwrap();
        assert_eq!(req.url.as_str(), "http://h/search?q=++");
        assert!(req.body.is_none());

        let h = case("X-Limit", ParameterLocation::Header, RuleId::NoString, ProbeValue::text("abc"));
        let req = build_request(&h, &ep, "http://h").unwrap();
        assert_eq!(req.headers, vec![("X-Limit".to_string(), "abc".to_string())]);

        let absent = case("q", ParameterLocation::Query, RuleId::RequiredCheck, ProbeValue::Absent);
        let req = build_request(&absent, &ep, "http://h").unwrap();
        assert_eq!(req.url.query(), None);
    }

    #[test]
    fn body_value_is_single_key_object() {
        let ep = endpoint("/users", HttpMethod::Post);
        let c = case("age", ParameterLocation::Body, RuleId::MaxNumber, ProbeValue::integer(131));
        let req = build_request(&c, &ep, "http://h").unwrap();
        assert_eq!(req.body, Some(json!({"age": 131})));

        let absent = case("age", ParameterLocation::Body, RuleId::RequiredCheck, ProbeValue::Absent);
        let req = build_request(&absent, &ep, "http://h").unwrap();
        assert_eq!(req.body, Some(json!({})));
    }

    #[test]
    fn missing_base_url_is_invalid_request() {
        let ep = endpoint("/users", HttpMethod::Get);
        let c = case("q", ParameterLocation::Query, RuleId::NoString, ProbeValue::text("abc"));
        let err = build_request(&c, &ep, "").unwrap_err();
        assert_eq!(err.kind, TransportErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn rejected_probe_passes() {
        let (exec, transport) = executor(Ok(400));
        let ep = endpoint("/users/{id}", HttpMethod::Get);
        let c = case("id", ParameterLocation::Path, RuleId::NoString, ProbeValue::text("abc"));
        let result = exec.execute(&c, &ep, "http://h").await;
        assert_eq!(result.outcome, Outcome::Pass);
        assert_eq!(result.status, Some(400));
        assert!(result.remediation.is_none());
        assert_eq!(transport.seen.lock().unwrap()[0].url.as_str(), "http://h/users/abc");
    }

    #[tokio::test]
    async fn accepted_probe_fails_with_remediation() {
        let (exec, _) = executor(Ok(200));
        let ep = endpoint("/users/{id}", HttpMethod::Get);
        let c = case("id", ParameterLocation::Path, RuleId::NoString, ProbeValue::text("abc"));
        let result = exec.execute(&c, &ep, "http://h").await;
        assert_eq!(result.outcome, Outcome::Fail);
        assert_eq!(result.severity, Some(Severity::High));
        assert!(result.remediation.is_some_and(|r| !r.is_empty()));
        assert_eq!(result.expected_behavior, EXPECTED_BEHAVIOR);
    }

    #[tokio::test]
    async fn transport_failure_is_recorded() {
        let (exec, _) = executor(Err(TransportError {
            kind: TransportErrorKind::Connect,
            message: "connection refused".into(),
        }));
        let ep = endpoint("/users", HttpMethod::Get);
        let c = case("q", ParameterLocation::Query, RuleId::NoString, ProbeValue::text("abc"));
        let result = exec.execute(&c, &ep, "http://h").await;
        assert_eq!(result.outcome, Outcome::Inconclusive);
        assert_eq!(result.status, None);
        assert_eq!(result.transport_error.as_deref(), Some("connection refused"));
    }
}
