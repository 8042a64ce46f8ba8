//! GraphQL-over-HTTP wire envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body: `{ query, variables }`.
#[derive(Debug, Serialize)]
pub struct GraphQLRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
}

/// Response body: `{ data?, errors? }`.
#[derive(Debug, Default, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQLError>>,
}

/// One entry of the `errors` list.
#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

impl GraphQLError {
    /// Message prefixed with its response path, when there is one.
    pub fn describe(&self) -> String {
        match &self.path {
            Some(path) if !path.is_empty() => {
                let path: Vec<String> = path
                    .iter()
                    .map(|segment| match segment {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                format!("{} (at {})", self.message, path.join("."))
            }
            _ => self.message.clone(),
        }
    }
}
