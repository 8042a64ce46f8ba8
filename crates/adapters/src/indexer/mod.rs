//! Indexer backend: SubQuery node lists.
//!
//! The only backend serving every entity, balances included. Pages are
//! addressed by offset, or by the opaque `endCursor` of the previous page.

mod models;
pub mod queries;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use chainlens_core::error::{DataResult, DomainResult};
use chainlens_core::models::{Balance, Block, Event, Extrinsic, Transfer};
use chainlens_core::ports::{
    AddressCodec, BackendId, BackendListShape, BalanceSource, BalancesFilter, BlockSource,
    BlocksFilter, EventSource, EventsFilter, ExtrinsicSource, ExtrinsicsFilter, ItemsResponse,
    ListRequest, QueryDocument, QueryExecutor, TransferSource, TransfersFilter, extract_page,
};

use crate::utils::fetch_field;

pub use models::{IndexerAccount, IndexerBlock, IndexerEvent, IndexerExtrinsic, IndexerTransfer};
use models::{
    normalize_balance, normalize_block, normalize_event, normalize_extrinsic, normalize_transfer,
};

const BACKEND: BackendId = BackendId::Indexer;

/// Single-row lookups come back as `{ nodes: [...] }` without page info.
#[derive(Debug, Deserialize)]
struct Nodes<R> {
    nodes: Vec<R>,
}

/// Every entity from the indexer.
pub struct IndexerSource {
    executor: Arc<dyn QueryExecutor>,
    addresses: Arc<dyn AddressCodec>,
}

impl IndexerSource {
    pub fn new(executor: Arc<dyn QueryExecutor>, addresses: Arc<dyn AddressCodec>) -> Self {
        Self {
            executor,
            addresses,
        }
    }

    async fn first<R: DeserializeOwned>(
        &self,
        document: &QueryDocument,
        field: &str,
        filter: Value,
    ) -> DataResult<Option<R>> {
        let rows: Option<Nodes<R>> =
            fetch_field(&*self.executor, BACKEND, document, json!({ "filter": filter }), field)
                .await?;
        Ok(rows.and_then(|r| r.nodes.into_iter().next()))
    }

    async fn list<R: DeserializeOwned, F>(
        &self,
        document: QueryDocument,
        field: &str,
        request: &ListRequest<F>,
        filter: Option<Value>,
        order: &[&str],
    ) -> DataResult<BackendListShape<R>> {
        let document = document.with_total_count(request.total_count);
        let variables = queries::list_variables(request, filter, order);
        fetch_field(&*self.executor, BACKEND, &document, variables, field).await
    }

    fn extrinsic_filter(&self, filter: &ExtrinsicsFilter) -> DomainResult<Value> {
        let key = match filter {
            ExtrinsicsFilter::Signer(address) => Some(self.addresses.decode_address(address)?),
            _ => None,
        };
        queries::extrinsic_filter(filter, key.as_ref())
    }
}

#[async_trait]
impl BlockSource for IndexerSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_block(&self, filter: &BlocksFilter) -> DataResult<Option<Block>> {
        let raw: Option<IndexerBlock> = self
            .first(&queries::BLOCK, "blocks", queries::block_filter(filter))
            .await?;
        Ok(raw.map(normalize_block).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_blocks(
        &self,
        request: &ListRequest<BlocksFilter>,
    ) -> DataResult<ItemsResponse<Block>> {
        let filter = request.filter.as_ref().map(queries::block_filter);
        let raw: BackendListShape<IndexerBlock> = self
            .list(queries::BLOCKS, "blocks", request, filter, queries::BLOCK_ORDER)
            .await?;
        Ok(extract_page(raw, &request.pagination, normalize_block)?)
    }
}

#[async_trait]
impl ExtrinsicSource for IndexerSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_extrinsic(&self, filter: &ExtrinsicsFilter) -> DataResult<Option<Extrinsic>> {
        let filter = self.extrinsic_filter(filter)?;
        let raw: Option<IndexerExtrinsic> =
            self.first(&queries::EXTRINSIC, "extrinsics", filter).await?;
        Ok(raw.map(normalize_extrinsic).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_extrinsics(
        &self,
        request: &ListRequest<ExtrinsicsFilter>,
    ) -> DataResult<ItemsResponse<Extrinsic>> {
        let filter = request
            .filter
            .as_ref()
            .map(|f| self.extrinsic_filter(f))
            .transpose()?;
        let raw: BackendListShape<IndexerExtrinsic> = self
            .list(queries::EXTRINSICS, "extrinsics", request, filter, queries::ITEM_ORDER)
            .await?;
        Ok(extract_page(raw, &request.pagination, normalize_extrinsic)?)
    }
}

#[async_trait]
impl EventSource for IndexerSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_event(&self, filter: &EventsFilter) -> DataResult<Option<Event>> {
        let raw: Option<IndexerEvent> = self
            .first(&queries::EVENT, "events", queries::event_filter(filter)?)
            .await?;
        Ok(raw.map(normalize_event).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_events(
        &self,
        request: &ListRequest<EventsFilter>,
    ) -> DataResult<ItemsResponse<Event>> {
        let filter = request
            .filter
            .as_ref()
            .map(queries::event_filter)
            .transpose()?;
        let raw: BackendListShape<IndexerEvent> = self
            .list(queries::EVENTS, "events", request, filter, queries::ITEM_ORDER)
            .await?;
        Ok(extract_page(raw, &request.pagination, normalize_event)?)
    }
}

#[async_trait]
impl TransferSource for IndexerSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_transfers(
        &self,
        request: &ListRequest<TransfersFilter>,
    ) -> DataResult<ItemsResponse<Transfer>> {
        let filter = match &request.filter {
            Some(TransfersFilter::Account(address)) => {
                let key = self.addresses.decode_address(address)?;
                Some(queries::transfer_filter(address, &key))
            }
            None => None,
        };
        let raw: BackendListShape<IndexerTransfer> = self
            .list(queries::TRANSFERS, "transfers", request, filter, queries::TRANSFER_ORDER)
            .await?;
        Ok(extract_page(raw, &request.pagination, normalize_transfer)?)
    }
}

#[async_trait]
impl BalanceSource for IndexerSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_balance(&self, filter: &BalancesFilter) -> DataResult<Option<Balance>> {
        let raw: Option<IndexerAccount> = self
            .first(&queries::ACCOUNT, "accounts", queries::balance_filter(filter))
            .await?;
        Ok(raw.map(normalize_balance).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_balances(
        &self,
        request: &ListRequest<BalancesFilter>,
    ) -> DataResult<ItemsResponse<Balance>> {
        let filter = request.filter.as_ref().map(queries::balance_filter);
        let raw: BackendListShape<IndexerAccount> = self
            .list(queries::ACCOUNTS, "accounts", request, filter, queries::ACCOUNT_ORDER)
            .await?;
        Ok(extract_page(raw, &request.pagination, normalize_balance)?)
    }
}

#[cfg(test)]
mod tests {
    use chainlens_core::error::{DataError, DomainError};
    use chainlens_core::ports::{OrderDirection, PaginationRequest};

    use super::*;
    use crate::testing::{ALICE, ALICE_HEX, AliceCodec, ScriptedExecutor};

    fn source(executor: &Arc<ScriptedExecutor>) -> IndexerSource {
        IndexerSource::new(executor.clone(), Arc::new(AliceCodec))
    }

    #[tokio::test]
    async fn list_shape_uses_offset_for_previous_page() {
        let executor = Arc::new(ScriptedExecutor::new([json!({
            "blocks": {
                "nodes": [{
                    "id": "100", "hash": "0xaa", "height": "100",
                    "timestamp": "2024-01-01T00:00:00", "specVersion": 7
                }],
                "pageInfo": {"hasNextPage": true, "hasPreviousPage": false, "endCursor": "c1"}
            }
        })]));
        let request: ListRequest<BlocksFilter> = ListRequest::new(
            None,
            OrderDirection::Desc,
            PaginationRequest::new(1, 5).unwrap(),
        );

        let page = source(&executor).list_blocks(&request).await.unwrap();

        assert_eq!(page.data[0].height, 100);
        assert!(page.pagination.has_previous_page);
        assert!(page.pagination.has_next_page);
        assert!(page.pagination.total_count.is_none());
        assert_eq!(executor.calls()[0].backend, BackendId::Indexer);
    }

    #[tokio::test]
    async fn missing_entity_is_none() {
        let executor = Arc::new(ScriptedExecutor::new([json!({ "extrinsics": { "nodes": [] } })]));

        let extrinsic = source(&executor)
            .get_extrinsic(&ExtrinsicsFilter::Hash("0xdead".into()))
            .await
            .unwrap();

        assert!(extrinsic.is_none());
    }

    #[tokio::test]
    async fn signer_matches_either_encoding() {
        let executor = Arc::new(ScriptedExecutor::new([json!({
            "extrinsics": { "nodes": [], "pageInfo": {"hasNextPage": false} }
        })]));
        let request = ListRequest::new(
            Some(ExtrinsicsFilter::Signer(ALICE.into())),
            OrderDirection::Desc,
            PaginationRequest::default(),
        );

        source(&executor).list_extrinsics(&request).await.unwrap();

        assert_eq!(
            executor.calls()[0].variables["filter"],
            json!({ "signer": { "in": [ALICE, ALICE_HEX] } })
        );
    }

    // Test critique: adresse invalide => erreur avant tout appel réseau
    #[tokio::test]
    async fn invalid_transfer_address_never_queries() {
        let executor = Arc::new(ScriptedExecutor::default());
        let request = ListRequest::new(
            Some(TransfersFilter::Account("5xyz".into())),
            OrderDirection::Desc,
            PaginationRequest::default(),
        );

        let err = source(&executor).list_transfers(&request).await.unwrap_err();

        assert!(err.is_invalid_input());
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_event_filter_never_queries() {
        let executor = Arc::new(ScriptedExecutor::default());

        let err = source(&executor)
            .get_event(&EventsFilter::BlockId("0000000100-abcde".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, DataError::Domain(DomainError::InvalidFilter(_))));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn balances_carry_total_count() {
        let executor = Arc::new(ScriptedExecutor::new([json!({
            "accounts": {
                "nodes": [{"address": ALICE, "balanceFree": "10", "balanceTotal": "10"}],
                "pageInfo": {"hasNextPage": false},
                "totalCount": 1
            }
        })]));
        let request: ListRequest<BalancesFilter> =
            ListRequest::new(None, OrderDirection::Asc, PaginationRequest::default())
                .with_total_count(true);

        let page = source(&executor).list_balances(&request).await.unwrap();

        assert_eq!(page.pagination.total_count, Some(1));
        assert_eq!(page.data[0].address, ALICE);
        let call = &executor.calls()[0];
        assert!(call.document.contains("    totalCount"));
        assert_eq!(call.variables["order"], json!(["ID_ASC"]));
    }
}
