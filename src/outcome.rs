//! Execution outcomes: what a request returned and whether it failed.

use serde::{Deserialize, Serialize};

use crate::document::Document;

/// One segment of a GraphQL error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(u64),
    Key(String),
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathSegment::Index(i) => write!(f, "{i}"),
            PathSegment::Key(k) => f.write_str(k),
        }
    }
}

/// An error reported by the server in the `errors` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseError {
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
}

impl ResponseError {
    /// Whether the reported path is exactly `path` (list indices included).
    pub fn path_equals(&self, path: &[String]) -> bool {
        let reported = self.path.as_deref().unwrap_or_default();
        reported.len() == path.len()
            && reported
                .iter()
                .zip(path)
                .all(|(segment, name)| segment.to_string() == *name)
    }
}

/// A decoded GraphQL response as delivered by a transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_deserializing)]
    pub status: u16,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<ResponseError>>,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

impl Response {
    /// Default failure rule: the response reports at least one error.
    pub fn has_errors(&self) -> bool {
        self.errors.as_ref().is_some_and(|e| !e.is_empty())
    }
}

/// One executed request and what came back. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    /// The request text as sent.
    pub operation: String,
    /// The structural form of the request, reused to reach nested endpoints.
    pub document: Document,
    /// HTTP status, or 0 if the request never completed.
    pub status: u16,
    pub elapsed_ms: u64,
    pub failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<ResponseError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_error: Option<String>,
}

impl Outcome {
    /// Outcome of a request the server answered.
    pub fn from_response(document: Document, response: Response, elapsed_ms: u64, failed: bool) -> Self {
        Self {
            operation: document.to_string(),
            document,
            status: response.status,
            elapsed_ms,
            failed,
            data: response.data,
            errors: response.errors,
            extensions: response.extensions,
            transport_error: None,
        }
    }

    /// Outcome of a request that failed below the GraphQL layer.
    pub fn from_transport_error(document: Document, message: String, elapsed_ms: u64) -> Self {
        Self {
            operation: document.to_string(),
            document,
            status: 0,
            elapsed_ms,
            failed: true,
            data: None,
            errors: None,
            extensions: None,
            transport_error: Some(message),
        }
    }

    /// A successful outcome carrying `data`, mostly useful in tests.
    pub fn with_data(document: Document, data: serde_json::Value) -> Self {
        let response = Response {
            status: 200,
            data: Some(data),
            ..Default::default()
        };
        Self::from_response(document, response, 0, false)
    }

    /// Reported errors, empty if none.
    pub fn errors(&self) -> &[ResponseError] {
        self.errors.as_deref().unwrap_or_default()
    }

    /// One-line summary for logs.
    pub fn summary(&self) -> String {
        if !self.failed {
            return "OK".to_string();
        }
        if let Some(message) = &self.transport_error {
            return format!("FAILED {} {message}", self.status);
        }
        let messages: Vec<&str> = self.errors().iter().map(|e| e.message.as_str()).collect();
        if messages.is_empty() {
            format!("FAILED {}", self.status)
        } else {
            format!("FAILED {} {}", self.status, messages.join("; "))
        }
    }
}
