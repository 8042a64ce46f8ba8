//! Main index backend: per-account transfer rows.
//!
//! Each transfer is indexed twice, once for the sender and once for the
//! recipient, with `direction` telling which side the row belongs to.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;

use chainlens_core::error::{DataResult, DomainResult};
use chainlens_core::models::{Transfer, TransferDirection};
use chainlens_core::ports::{
    AddressCodec, BackendId, BackendListShape, ItemsResponse, ListRequest, QueryDocument,
    QueryExecutor, TransferSource, TransfersFilter, extract_page,
};

use crate::utils::{connection_variables, fetch_field, opt_timestamp, parse_decimal, parse_u64, require};

const BACKEND: BackendId = BackendId::Main;

const TRANSFERS_CONNECTION: QueryDocument = QueryDocument::new(
    "query Transfers($first: Int!, $after: String, $filter: TransferWhereInput, $order: [TransferOrderByInput!]!) {
  transfersConnection(first: $first, after: $after, where: $filter, orderBy: $order) {
    edges {
      node {
        id
        transfer {
          id amount blockNumber success timestamp extrinsicHash
          to { publicKey }
          from { publicKey }
        }
        account { publicKey }
        direction
      }
    }
    pageInfo { endCursor hasNextPage hasPreviousPage startCursor }
    # totalCount
  }
}",
);

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyRef {
    pub public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainTransferDetails {
    pub id: String,
    pub amount: Value,
    pub block_number: Value,
    pub success: Option<bool>,
    pub timestamp: Option<Value>,
    pub extrinsic_hash: Option<String>,
    pub from: PublicKeyRef,
    pub to: PublicKeyRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainTransfer {
    pub id: String,
    pub transfer: MainTransferDetails,
    pub account: Option<PublicKeyRef>,
    pub direction: Option<String>,
}

fn parse_direction(direction: &str) -> Option<TransferDirection> {
    match direction.to_ascii_lowercase().as_str() {
        "from" => Some(TransferDirection::From),
        "to" => Some(TransferDirection::To),
        _ => None,
    }
}

pub fn normalize_transfer(raw: MainTransfer) -> DomainResult<Transfer> {
    let details = raw.transfer;
    Ok(Transfer {
        id: raw.id,
        block_height: require(parse_u64(&details.block_number), "transfer.blockNumber")?,
        timestamp: opt_timestamp(details.timestamp.as_ref()),
        extrinsic_id: None,
        extrinsic_hash: details.extrinsic_hash,
        from: details.from.public_key,
        to: details.to.public_key,
        amount: require(parse_decimal(&details.amount), "transfer.amount")?,
        success: details.success,
        account: raw.account.map(|a| a.public_key),
        direction: raw.direction.as_deref().and_then(parse_direction),
    })
}

/// Transfers from the main index.
pub struct MainIndexSource {
    executor: Arc<dyn QueryExecutor>,
    addresses: Arc<dyn AddressCodec>,
}

impl MainIndexSource {
    pub fn new(executor: Arc<dyn QueryExecutor>, addresses: Arc<dyn AddressCodec>) -> Self {
        Self {
            executor,
            addresses,
        }
    }

    fn filter(&self, filter: &TransfersFilter) -> DomainResult<Value> {
        match filter {
            TransfersFilter::Account(address) => {
                let key = self.addresses.decode_address(address)?;
                Ok(serde_json::json!({ "account": { "publicKey_eq": key.to_hex() } }))
            }
        }
    }
}

#[async_trait]
impl TransferSource for MainIndexSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_transfers(
        &self,
        request: &ListRequest<TransfersFilter>,
    ) -> DataResult<ItemsResponse<Transfer>> {
        let filter = request
            .filter
            .as_ref()
            .map(|f| self.filter(f))
            .transpose()?;
        let document = TRANSFERS_CONNECTION.with_total_count(request.total_count);
        let variables = connection_variables(request, filter);
        let raw: BackendListShape<MainTransfer> =
            fetch_field(&*self.executor, BACKEND, &document, variables, "transfersConnection")
                .await?;
        Ok(extract_page(raw, &request.pagination, normalize_transfer)?)
    }
}
