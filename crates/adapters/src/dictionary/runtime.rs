//! Runtime metadata stored by the dictionary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, instrument};

use chainlens_core::error::{DataResult, DomainError, DomainResult};
use chainlens_core::models::SpecVersion;
use chainlens_core::ports::{BackendId, QueryDocument, QueryExecutor, RawRuntimeSpec, RuntimeSpecSource};

use crate::utils::{fetch_field, parse_u32, parse_u64, require};

const BACKEND: BackendId = BackendId::Dictionary;

const LATEST_SPEC: QueryDocument = QueryDocument::new(
    "query LatestSpec {
  spec: metadata(orderBy: specVersion_DESC, limit: 1) {
    id blockHash blockHeight specName specVersion hex
  }
}",
);

const SPECS: QueryDocument = QueryDocument::new(
    "query Specs($specVersions: [Int!]!) {
  specs: metadata(where: { specVersion_in: $specVersions }, orderBy: specVersion_DESC) {
    id blockHash blockHeight specName specVersion hex
  }
}",
);

const SPEC_VERSIONS: QueryDocument = QueryDocument::new(
    "query SpecVersions {
  metadata(orderBy: specVersion_DESC) { specVersion }
}",
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DictionarySpec {
    id: String,
    block_hash: Option<String>,
    block_height: Value,
    spec_name: Option<String>,
    spec_version: Value,
    hex: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecVersionRow {
    spec_version: Value,
}

fn normalize_spec(raw: DictionarySpec) -> DomainResult<RawRuntimeSpec> {
    Ok(RawRuntimeSpec {
        spec_version: require(parse_u32(&raw.spec_version), "specVersion")?,
        block_height: require(parse_u64(&raw.block_height), "blockHeight")?,
        id: raw.id,
        spec_name: raw.spec_name,
        block_hash: raw.block_hash,
        hex: raw.hex,
    })
}

/// Runtime specs from the dictionary's `metadata` entity.
pub struct DictionarySpecSource {
    executor: Arc<dyn QueryExecutor>,
}

impl DictionarySpecSource {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl RuntimeSpecSource for DictionarySpecSource {
    #[instrument(skip(self))]
    async fn latest_spec(&self) -> DataResult<RawRuntimeSpec> {
        let rows: Vec<DictionarySpec> =
            fetch_field(&*self.executor, BACKEND, &LATEST_SPEC, json!({}), "spec").await?;
        let raw = rows
            .into_iter()
            .next()
            .ok_or(DomainError::SpecNotFound(SpecVersion::Latest))?;
        Ok(normalize_spec(raw)?)
    }

    #[instrument(skip(self))]
    async fn specs(&self, versions: &[u32]) -> DataResult<Vec<RawRuntimeSpec>> {
        if versions.is_empty() {
            return Ok(Vec::new());
        }
        let variables = json!({ "specVersions": versions });
        let rows: Vec<DictionarySpec> =
            fetch_field(&*self.executor, BACKEND, &SPECS, variables, "specs").await?;
        debug!(requested = versions.len(), received = rows.len(), "Fetched runtime specs");
        Ok(rows.into_iter().map(normalize_spec).collect::<DomainResult<_>>()?)
    }

    #[instrument(skip(self))]
    async fn spec_versions(&self) -> DataResult<Vec<u32>> {
        let rows: Vec<SpecVersionRow> =
            fetch_field(&*self.executor, BACKEND, &SPEC_VERSIONS, json!({}), "metadata").await?;
        Ok(rows
            .iter()
            .map(|row| require(parse_u32(&row.spec_version), "specVersion"))
            .collect::<DomainResult<_>>()?)
    }
}
