//! Port traits for entity sources.
//!
//! Every backend adapter implements the traits for the entities it can
//! serve. A [`DataSource`] bundles one implementation per entity type,
//! chosen once at startup.

use async_trait::async_trait;

use crate::error::DataResult;
use crate::models::{Balance, Block, Event, Extrinsic, Transfer};

use super::pagination::{ItemsResponse, OrderDirection, PaginationRequest};

// =============================================================================
// Filter Types
// =============================================================================

/// Block lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlocksFilter {
    Id(String),
    Hash(String),
    Height(u64),
}

/// Extrinsic lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtrinsicsFilter {
    Id(String),
    Hash(String),
    BlockId(String),
    BlockHeight(u64),
    /// Canonical pallet name with an optional canonical call name.
    Name { pallet: String, call: Option<String> },
    /// Signer account, as an SS58 address.
    Signer(String),
}

/// Event lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventsFilter {
    Id(String),
    BlockId(String),
    BlockHeight(u64),
    ExtrinsicId(String),
    CallId(String),
    /// Canonical pallet name with an optional canonical event name.
    Name { pallet: String, event: Option<String> },
}

/// Transfer lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransfersFilter {
    /// Transfers sent or received by an SS58 address.
    Account(String),
}

/// Balance lookup criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalancesFilter {
    Address(String),
}

// =============================================================================
// List Requests
// =============================================================================

/// Parameters of a list query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest<F> {
    pub filter: Option<F>,
    pub order: OrderDirection,
    pub pagination: PaginationRequest,
    /// Ask the backend for the total count of matching items.
    pub total_count: bool,
}

impl<F> ListRequest<F> {
    /// Total count is requested for filtered queries on their first page.
    pub fn new(filter: Option<F>, order: OrderDirection, pagination: PaginationRequest) -> Self {
        let total_count = filter.is_some() && pagination.is_first_page();
        Self {
            filter,
            order,
            pagination,
            total_count,
        }
    }

    pub fn with_total_count(mut self, total_count: bool) -> Self {
        self.total_count = total_count;
        self
    }
}

impl<F> Default for ListRequest<F> {
    fn default() -> Self {
        Self::new(None, OrderDirection::Desc, PaginationRequest::default())
    }
}

// =============================================================================
// Entity Sources
// =============================================================================

#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Single block, `None` when nothing matches.
    async fn get_block(&self, filter: &BlocksFilter) -> DataResult<Option<Block>>;

    async fn list_blocks(
        &self,
        request: &ListRequest<BlocksFilter>,
    ) -> DataResult<ItemsResponse<Block>>;
}

#[async_trait]
pub trait ExtrinsicSource: Send + Sync {
    async fn get_extrinsic(&self, filter: &ExtrinsicsFilter) -> DataResult<Option<Extrinsic>>;

    async fn list_extrinsics(
        &self,
        request: &ListRequest<ExtrinsicsFilter>,
    ) -> DataResult<ItemsResponse<Extrinsic>>;
}

#[async_trait]
pub trait EventSource: Send + Sync {
    async fn get_event(&self, filter: &EventsFilter) -> DataResult<Option<Event>>;

    async fn list_events(
        &self,
        request: &ListRequest<EventsFilter>,
    ) -> DataResult<ItemsResponse<Event>>;
}

#[async_trait]
pub trait TransferSource: Send + Sync {
    async fn list_transfers(
        &self,
        request: &ListRequest<TransfersFilter>,
    ) -> DataResult<ItemsResponse<Transfer>>;
}

#[async_trait]
pub trait BalanceSource: Send + Sync {
    async fn get_balance(&self, filter: &BalancesFilter) -> DataResult<Option<Balance>>;

    async fn list_balances(
        &self,
        request: &ListRequest<BalancesFilter>,
    ) -> DataResult<ItemsResponse<Balance>>;
}

// =============================================================================
// Composite Source
// =============================================================================

/// One source per entity type, selected by configuration.
pub trait DataSource: Send + Sync {
    fn blocks(&self) -> &dyn BlockSource;

    fn extrinsics(&self) -> &dyn ExtrinsicSource;

    fn events(&self) -> &dyn EventSource;

    fn transfers(&self) -> &dyn TransferSource;

    fn balances(&self) -> &dyn BalanceSource;
}
