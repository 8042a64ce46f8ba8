//! HTTP query executor.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};
use url::Url;

use chainlens_core::error::{QueryError, QueryResult};
use chainlens_core::metrics::{QueryTimer, record_query, record_query_error};
use chainlens_core::ports::{BackendId, QueryDocument, QueryExecutor, QueryResponse};

use crate::types::{GraphQLRequest, GraphQLResponse};

/// Maximum number of body characters kept in an HTTP error.
const MAX_ERROR_BODY: usize = 512;

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint URL per backend. Backends without one cannot be queried.
    pub endpoints: HashMap<BackendId, Url>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: HashMap::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    pub fn with_endpoint(mut self, backend: BackendId, url: Url) -> Self {
        self.endpoints.insert(backend, url);
        self
    }

    pub fn endpoint(&self, backend: BackendId) -> Option<&Url> {
        self.endpoints.get(&backend)
    }
}

/// [`QueryExecutor`] posting `{query, variables}` to the configured endpoints.
///
/// No retries: every failure is reported to the caller as-is.
pub struct HttpExecutor {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpExecutor {
    pub fn new(config: ClientConfig) -> QueryResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| QueryError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn send(
        &self,
        endpoint: &Url,
        document: &QueryDocument,
        variables: &serde_json::Value,
    ) -> QueryResult<QueryResponse> {
        let request = GraphQLRequest {
            query: document.as_str(),
            variables,
        };

        let response = self
            .client
            .post(endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        classify(status, &body)
    }
}

#[async_trait]
impl QueryExecutor for HttpExecutor {
    #[instrument(skip(self, document, variables), fields(backend = %backend))]
    async fn execute(
        &self,
        backend: BackendId,
        document: &QueryDocument,
        variables: serde_json::Value,
    ) -> QueryResult<QueryResponse> {
        let endpoint = self
            .config
            .endpoint(backend)
            .ok_or_else(|| QueryError::EndpointMissing(backend.to_string()))?;

        record_query(backend.as_str());
        let _timer = QueryTimer::new(backend.as_str());

        let result = self.send(endpoint, document, &variables).await;
        match &result {
            Ok(response) if !response.errors.is_empty() => {
                warn!(errors = ?response.errors, "Partial response");
            }
            Ok(_) => debug!("Query succeeded"),
            Err(e) => {
                record_query_error(backend.as_str(), e.kind());
                warn!(error = %e, "Query failed");
            }
        }
        result
    }
}

/// Map an HTTP status and body to a query outcome.
///
/// - `data` on a 2xx response is a success, with any `errors` attached
/// - an `errors` list without usable `data`, or on a non-2xx response, is
///   a backend error carrying every message
/// - anything else on a non-2xx response is an HTTP error
fn classify(status: u16, body: &str) -> QueryResult<QueryResponse> {
    let success = (200..300).contains(&status);

    let Ok(GraphQLResponse { data, errors }) = serde_json::from_str::<GraphQLResponse>(body) else {
        return Err(if success {
            QueryError::InvalidResponse(format!("malformed body: {}", truncate(body)))
        } else {
            QueryError::Http {
                status,
                body: truncate(body),
            }
        });
    };

    let messages: Vec<String> = errors
        .unwrap_or_default()
        .iter()
        .map(|e| e.describe())
        .collect();

    match data.filter(|d| !d.is_null()) {
        Some(data) if success => Ok(QueryResponse {
            data,
            errors: messages,
        }),
        _ if !messages.is_empty() => Err(QueryError::Backend { messages }),
        _ if success => Err(QueryError::InvalidResponse(
            "response has neither data nor errors".to_string(),
        )),
        _ => Err(QueryError::Http {
            status,
            body: truncate(body),
        }),
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}
