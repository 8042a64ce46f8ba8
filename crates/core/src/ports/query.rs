//! Port trait for the GraphQL query executor.
//!
//! The executor is the only component that talks to the network. Adapters
//! hand it a [`QueryDocument`] and variables and get back the raw `data`
//! payload together with any partial errors.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{QueryError, QueryResult};

// =============================================================================
// Backends
// =============================================================================

/// Named backend endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackendId {
    /// SubQuery-style indexer (node lists, `equalTo` filters).
    Indexer,
    /// Dictionary squid: flat arrays and runtime metadata.
    Dictionary,
    /// Archive squid: raw blocks, calls and events.
    Archive,
    /// Explorer squid: enriched extrinsics with signer public keys.
    Explorer,
    /// Main squid: per-account transfers.
    Main,
}

impl BackendId {
    pub const ALL: [BackendId; 5] = [
        Self::Indexer,
        Self::Dictionary,
        Self::Archive,
        Self::Explorer,
        Self::Main,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Indexer => "indexer",
            Self::Dictionary => "dictionary",
            Self::Archive => "archive",
            Self::Explorer => "explorer",
            Self::Main => "main",
        }
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown backend '{s}'"))
    }
}

// =============================================================================
// Query Documents
// =============================================================================

/// Line marking where the total count field goes in a list query.
const TOTAL_COUNT_MARKER: &str = "# totalCount";

/// A GraphQL document.
///
/// List queries embed a `# totalCount` comment next to `pageInfo`. It is
/// a no-op comment until [`QueryDocument::with_total_count`] turns it into
/// a real field, so the count is only computed when a caller asks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDocument(Cow<'static, str>);

impl QueryDocument {
    pub const fn new(text: &'static str) -> Self {
        Self(Cow::Borrowed(text))
    }

    /// Build from text assembled at runtime.
    pub fn owned(text: String) -> Self {
        Self(Cow::Owned(text))
    }

    /// Request the total count field (or leave it commented out).
    pub fn with_total_count(self, include: bool) -> Self {
        if include && self.0.contains(TOTAL_COUNT_MARKER) {
            Self(Cow::Owned(self.0.replace(TOTAL_COUNT_MARKER, "totalCount")))
        } else {
            self
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Responses
// =============================================================================

/// Successful executor response.
///
/// `errors` is non-empty when the backend answered with partial data.
#[derive(Debug, Clone, Default)]
pub struct QueryResponse {
    pub data: serde_json::Value,
    pub errors: Vec<String>,
}

impl QueryResponse {
    pub fn new(data: serde_json::Value) -> Self {
        Self {
            data,
            errors: Vec::new(),
        }
    }

    /// Deserialize one top-level field of `data`.
    ///
    /// A missing field reads as `null`, so `Option<T>` targets yield `None`.
    /// If the field cannot be read and the backend reported errors, those
    /// errors are surfaced instead of a shape mismatch.
    pub fn take_field<T: DeserializeOwned>(&mut self, name: &str) -> QueryResult<T> {
        let value = self
            .data
            .get_mut(name)
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null);

        serde_json::from_value(value).map_err(|e| {
            if self.errors.is_empty() {
                QueryError::InvalidResponse(format!("field '{name}': {e}"))
            } else {
                QueryError::Backend {
                    messages: self.errors.clone(),
                }
            }
        })
    }
}

// =============================================================================
// Executor
// =============================================================================

/// Executes GraphQL documents against named backends.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `document` with `variables` against `backend`.
    async fn execute(
        &self,
        backend: BackendId,
        document: &QueryDocument,
        variables: serde_json::Value,
    ) -> QueryResult<QueryResponse>;
}
