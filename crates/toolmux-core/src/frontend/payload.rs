//! Network payload parsing and response envelopes

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Prefix accepted in front of plain-text queries
pub const QUERY_PREFIX: &str = "QUERY:";

/// One parsed client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub query: String,
    /// Provider to use when a tool has no known owner
    pub preferred_provider: Option<String>,
    /// Explicit conversation token
    pub session: Option<String>,
}

impl QueryRequest {
    fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            preferred_provider: None,
            session: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("Empty query")]
    Empty,
}

fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value.filter(|v| !v.is_null()).map(string_form)
}

/// Interpret one inbound payload.
///
/// A JSON object with a `query` field wins (`context` is appended,
/// `server` and `session` are picked up). Otherwise a leading `QUERY:` is
/// stripped, and anything else is taken verbatim. Invalid JSON is plain text.
pub fn parse_payload(raw: &str) -> Result<QueryRequest, PayloadError> {
    let raw = raw.trim();

    let request = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) if map.contains_key("query") => {
            let mut query = optional_string(map.get("query")).unwrap_or_default();
            if let Some(context) = optional_string(map.get("context")) {
                query = format!("{}\n\nContext: {}", query, context);
            }
            QueryRequest {
                query,
                preferred_provider: optional_string(map.get("server")),
                session: optional_string(map.get("session")),
            }
        }
        _ => match raw.strip_prefix(QUERY_PREFIX) {
            Some(rest) => QueryRequest::text(rest.trim()),
            None => QueryRequest::text(raw),
        },
    };

    if request.query.trim().is_empty() {
        return Err(PayloadError::Empty);
    }
    Ok(request)
}

/// Seconds since the epoch, fractional
pub fn timestamp() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

/// The single JSON object written back per request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    Success { data: String, timestamp: f64 },
    Error { error: String, timestamp: f64 },
}

impl Response {
    pub fn success(data: impl Into<String>) -> Self {
        Self::Success {
            data: data.into(),
            timestamp: timestamp(),
        }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        Self::Error {
            error: error.to_string(),
            timestamp: timestamp(),
        }
    }

    /// Newline-terminated wire form
    pub fn to_line(&self) -> serde_json::Result<String> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_with_context_and_server() {
        let request = parse_payload(r#"{"query": "weather?", "context": "in Oslo", "server": "wx"}"#).unwrap();
        assert_eq!(request.query, "weather?\n\nContext: in Oslo");
        assert_eq!(request.preferred_provider.as_deref(), Some("wx"));
        assert_eq!(request.session, None);
    }

    #[test]
    fn test_json_session_token() {
        let request = parse_payload(r#"{"query": "hi", "session": "abc"}"#).unwrap();
        assert_eq!(request.session.as_deref(), Some("abc"));
    }

    #[test]
    fn test_query_prefix() {
        assert_eq!(parse_payload("QUERY: tell me a joke").unwrap().query, "tell me a joke");
    }

    #[test]
    fn test_raw_text_and_bad_json() {
        assert_eq!(parse_payload("plain words\n").unwrap().query, "plain words");
        assert_eq!(parse_payload("{not json").unwrap().query, "{not json");
        assert_eq!(
            parse_payload(r#"{"question": "x"}"#).unwrap().query,
            r#"{"question": "x"}"#
        );
    }

    #[test]
    fn test_empty_queries() {
        assert_eq!(parse_payload("   "), Err(PayloadError::Empty));
        assert_eq!(parse_payload("QUERY:"), Err(PayloadError::Empty));
        assert_eq!(parse_payload(r#"{"query": ""}"#), Err(PayloadError::Empty));
    }

    #[test]
    fn test_response_shape() {
        let line = Response::success("answer").to_line().unwrap();
        assert!(line.ends_with('\n'));

        let value: Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"], "answer");
        assert!(value["timestamp"].as_f64().unwrap() > 0.0);

        let value = serde_json::to_value(Response::error("bad")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "bad");
    }
}
