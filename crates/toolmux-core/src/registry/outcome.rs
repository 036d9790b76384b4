//! Transport-tagged tool results

use serde_json::Value;

/// Raw result of one tool call, tagged by the transport that produced it
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// Full call result from a persistent session (an object with `content`)
    Local(Value),
    /// Content list returned by a transient remote session
    Remote(Vec<Value>),
}

impl ToolOutcome {
    /// Reduce the outcome to the single text blob fed back to the model.
    ///
    /// Local results concatenate the text of every `content` element.
    /// Remote results use the first element only. Anything that does not
    /// fit falls back to its JSON string form.
    pub fn normalize(&self) -> String {
        match self {
            ToolOutcome::Local(result) => match result.get("content") {
                Some(Value::Array(items)) => items.iter().map(text_or_string).collect(),
                _ => result.to_string(),
            },
            ToolOutcome::Remote(items) => match items.first() {
                Some(first) => text_or_string(first),
                None => Value::Array(Vec::new()).to_string(),
            },
        }
    }
}

fn text_or_string(item: &Value) -> String {
    match item.get("text") {
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
        None => item.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_local_concatenates_text() {
        let outcome = ToolOutcome::Local(json!({
            "content": [{ "type": "text", "text": "a" }, { "type": "text", "text": "b" }]
        }));
        assert_eq!(outcome.normalize(), "ab");
    }

    #[test]
    fn test_local_element_without_text() {
        let outcome = ToolOutcome::Local(json!({
            "content": [{ "text": "x" }, { "data": "..." }]
        }));
        assert_eq!(outcome.normalize(), r#"x{"data":"..."}"#);
    }

    #[test]
    fn test_local_without_content_array() {
        let outcome = ToolOutcome::Local(json!({ "value": 3 }));
        assert_eq!(outcome.normalize(), r#"{"value":3}"#);

        let outcome = ToolOutcome::Local(json!({ "content": "plain" }));
        assert_eq!(outcome.normalize(), r#"{"content":"plain"}"#);
    }

    #[test]
    fn test_remote_takes_first_element() {
        let outcome = ToolOutcome::Remote(vec![json!({ "text": "a" }), json!({ "text": "b" })]);
        assert_eq!(outcome.normalize(), "a");
    }

    #[test]
    fn test_remote_first_element_without_text() {
        let outcome = ToolOutcome::Remote(vec![json!({ "uri": "file:///x" })]);
        assert_eq!(outcome.normalize(), r#"{"uri":"file:///x"}"#);
    }

    #[test]
    fn test_remote_empty_uses_string_form() {
        assert_eq!(ToolOutcome::Remote(Vec::new()).normalize(), "[]");
    }
}
