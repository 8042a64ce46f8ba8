//! Archive backend: squid archive with Relay connections.
//!
//! Serves blocks, extrinsics and events. Connection queries page with
//! `first`/`after`, where the cursor is the stringified offset.

mod models;
pub mod queries;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::instrument;

use chainlens_core::error::DataResult;
use chainlens_core::models::{Block, Event, Extrinsic};
use chainlens_core::ports::{
    BackendId, BackendListShape, BlockSource, BlocksFilter, EventSource, EventsFilter,
    ExtrinsicSource, ExtrinsicsFilter, ItemsResponse, ListRequest, QueryExecutor, extract_page,
};

use crate::utils::{connection_variables, fetch_field, probe_variables};

pub use models::{ArchiveBlock, ArchiveEvent, ArchiveExtrinsic};
pub(crate) use models::{normalize_block, normalize_event, normalize_extrinsic};

const BACKEND: BackendId = BackendId::Archive;

/// Blocks, extrinsics and events from the archive.
pub struct ArchiveSource {
    executor: Arc<dyn QueryExecutor>,
}

impl ArchiveSource {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl BlockSource for ArchiveSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_block(&self, filter: &BlocksFilter) -> DataResult<Option<Block>> {
        let variables = serde_json::json!({ "filter": queries::block_filter(filter) });
        let rows: Vec<ArchiveBlock> =
            fetch_field(&*self.executor, BACKEND, &queries::BLOCK, variables, "blocks").await?;
        Ok(rows.into_iter().next().map(normalize_block).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_blocks(
        &self,
        request: &ListRequest<BlocksFilter>,
    ) -> DataResult<ItemsResponse<Block>> {
        let document = queries::BLOCKS_CONNECTION.with_total_count(request.total_count);
        let variables =
            connection_variables(request, request.filter.as_ref().map(queries::block_filter));
        let raw: BackendListShape<ArchiveBlock> =
            fetch_field(&*self.executor, BACKEND, &document, variables, "blocksConnection").await?;
        Ok(extract_page(raw, &request.pagination, normalize_block)?)
    }
}

#[async_trait]
impl ExtrinsicSource for ArchiveSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_extrinsic(&self, filter: &ExtrinsicsFilter) -> DataResult<Option<Extrinsic>> {
        let variables = serde_json::json!({ "filter": queries::extrinsic_filter(filter) });
        let rows: Vec<ArchiveExtrinsic> =
            fetch_field(&*self.executor, BACKEND, &queries::EXTRINSIC, variables, "extrinsics")
                .await?;
        Ok(rows.into_iter().next().map(normalize_extrinsic).transpose()?)
    }

    /// Name filters go through the flat list: counting a name match over
    /// the whole archive is too slow for a connection.
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_extrinsics(
        &self,
        request: &ListRequest<ExtrinsicsFilter>,
    ) -> DataResult<ItemsResponse<Extrinsic>> {
        let filter = request.filter.as_ref().map(queries::extrinsic_filter);

        let raw: BackendListShape<ArchiveExtrinsic> =
            if matches!(request.filter, Some(ExtrinsicsFilter::Name { .. })) {
                let variables = probe_variables(request, filter);
                let rows: Vec<ArchiveExtrinsic> = fetch_field(
                    &*self.executor,
                    BACKEND,
                    &queries::EXTRINSICS_FLAT,
                    variables,
                    "extrinsics",
                )
                .await?;
                BackendListShape::from_probe(rows, &request.pagination)
            } else {
                let document = queries::EXTRINSICS_CONNECTION.with_total_count(request.total_count);
                let variables = connection_variables(request, filter);
                fetch_field(&*self.executor, BACKEND, &document, variables, "extrinsicsConnection")
                    .await?
            };

        Ok(extract_page(raw, &request.pagination, normalize_extrinsic)?)
    }
}

#[async_trait]
impl EventSource for ArchiveSource {
    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn get_event(&self, filter: &EventsFilter) -> DataResult<Option<Event>> {
        let variables = serde_json::json!({ "filter": queries::event_filter(filter) });
        let rows: Vec<ArchiveEvent> =
            fetch_field(&*self.executor, BACKEND, &queries::EVENT, variables, "events").await?;
        Ok(rows.into_iter().next().map(normalize_event).transpose()?)
    }

    #[instrument(skip(self), fields(backend = %BACKEND))]
    async fn list_events(
        &self,
        request: &ListRequest<EventsFilter>,
    ) -> DataResult<ItemsResponse<Event>> {
        let document = queries::EVENTS_CONNECTION.with_total_count(request.total_count);
        let variables =
            connection_variables(request, request.filter.as_ref().map(queries::event_filter));
        let raw: BackendListShape<ArchiveEvent> =
            fetch_field(&*self.executor, BACKEND, &document, variables, "eventsConnection").await?;
        Ok(extract_page(raw, &request.pagination, normalize_event)?)
    }
}
