//! Request execution against a live GraphQL endpoint.
//!
//! Uses `ureq` for synchronous HTTP requests. The explorer only ever has one
//! request in flight, so there is no need for an async runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};
use crate::outcome::Response;

/// `user-agent` header sent with every request.
pub const USER_AGENT: &str = concat!("gql-probe/", env!("CARGO_PKG_VERSION"));

/// Executes request text and returns the decoded GraphQL response.
pub trait Transport {
    fn execute(&self, request: &str) -> TransportResult<Response>;
}

/// POSTs `{"query": ...}` as JSON over HTTP.
pub struct HttpTransport {
    url: String,
    headers: BTreeMap<String, String>,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(url: impl Into<String>, headers: BTreeMap<String, String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers,
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &str) -> TransportResult<Response> {
        let mut call = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .set("User-Agent", USER_AGENT);
        for (name, value) in &self.headers {
            call = call.set(name, value);
        }

        let response = match call.send_json(serde_json::json!({ "query": request })) {
            Ok(response) => response,
            // GraphQL servers report validation errors with 4xx statuses; the
            // body is still a regular response.
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(transport)) => {
                return Err(TransportError::Request {
                    url: self.url.clone(),
                    message: transport.to_string(),
                });
            }
        };

        let status = response.status();
        let body = response.into_string().map_err(|e| TransportError::Decode {
            status,
            message: e.to_string(),
        })?;
        decode(status, &body)
    }
}

/// Parse a response body, attaching the HTTP status.
pub fn decode(status: u16, body: &str) -> TransportResult<Response> {
    let mut response: Response = serde_json::from_str(body).map_err(|e| TransportError::Decode {
        status,
        message: e.to_string(),
    })?;
    response.status = status;
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_errors_with_paths() {
        let body = r#"{
            "data": { "customer": null },
            "errors": [{ "message": "Not found", "path": ["customer"], "locations": [] }],
            "extensions": { "cost": 3 }
        }"#;
        let response = decode(200, body).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.has_errors());
        assert_eq!(response.errors.as_ref().unwrap()[0].message, "Not found");
        assert_eq!(response.extensions, Some(serde_json::json!({ "cost": 3 })));
    }

    #[test]
    fn keeps_non_success_status() {
        let response = decode(400, r#"{ "errors": [{ "message": "bad" }] }"#).unwrap();
        assert_eq!(response.status, 400);
        assert!(response.data.is_none());
    }

    #[test]
    fn tolerates_errors_without_message() {
        let body = r#"{ "data": { "hello": "world" }, "errors": [{ "path": ["hello"] }] }"#;
        let response = decode(200, body).unwrap();
        assert_eq!(response.data, Some(serde_json::json!({ "hello": "world" })));
        let errors = response.errors.unwrap();
        assert_eq!(errors[0].message, "");
        assert!(errors[0].path_equals(&["hello".to_string()]));
    }

    #[test]
    fn rejects_non_json_bodies() {
        let err = decode(502, "<html>Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, TransportError::Decode { status: 502, .. }));
    }

    #[test]
    fn unreachable_host_is_a_request_error() {
        let transport = HttpTransport::new(
            "http://127.0.0.1:9/graphql",
            BTreeMap::new(),
            Duration::from_millis(200),
        );
        let err = transport.execute("{ hello }").unwrap_err();
        assert!(matches!(err, TransportError::Request { .. }));
    }

    #[test]
    fn user_agent_names_the_tool() {
        assert!(USER_AGENT.starts_with("gql-probe/"));
    }
}
