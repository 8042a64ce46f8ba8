//! Typed fetch functions consumed by explorer views.
//!
//! [`ExplorerService`] ties a [`DataSource`] to the [`RuntimeSpecCache`]:
//! every block, extrinsic and event it hands out carries its runtime spec.
//! Transfers and balances are returned as-is.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::error::{DataError, DataResult};
use crate::models::{
    Account, Balance, Block, Event, Extrinsic, PublicKey, RuntimeSpec, SpecVersion, Transfer,
};
use crate::ports::{
    AddressCodec, BalancesFilter, BlocksFilter, DataSource, EventsFilter, ExtrinsicsFilter,
    ItemsResponse, ListRequest, OrderDirection, PaginationRequest, TransfersFilter,
};

use super::names::{ResolvedName, resolve_qualified_call, resolve_qualified_event};
use super::runtime_cache::RuntimeSpecCache;

/// Explorer read API.
pub struct ExplorerService<D: DataSource + ?Sized> {
    source: Arc<D>,
    specs: Arc<RuntimeSpecCache>,
    addresses: Arc<dyn AddressCodec>,
}

impl<D: DataSource + ?Sized> ExplorerService<D> {
    pub fn new(
        source: Arc<D>,
        specs: Arc<RuntimeSpecCache>,
        addresses: Arc<dyn AddressCodec>,
    ) -> Self {
        Self {
            source,
            specs,
            addresses,
        }
    }

    pub fn spec_cache(&self) -> &RuntimeSpecCache {
        &self.specs
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_block(&self, filter: BlocksFilter) -> DataResult<Option<Block>> {
        match self.source.blocks().get_block(&filter).await? {
            Some(block) => Ok(Some(self.specs.attach_spec(block).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_blocks(
        &self,
        filter: Option<BlocksFilter>,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Block>> {
        let request = ListRequest::new(filter, order, pagination);
        let page = self.source.blocks().list_blocks(&request).await?;
        self.specs.attach_page(page).await
    }

    // =========================================================================
    // Extrinsics
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_extrinsic(&self, filter: ExtrinsicsFilter) -> DataResult<Option<Extrinsic>> {
        self.check_extrinsics_filter(&filter)?;
        match self.source.extrinsics().get_extrinsic(&filter).await? {
            Some(extrinsic) => Ok(Some(self.specs.attach_spec(extrinsic).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_extrinsics(
        &self,
        filter: Option<ExtrinsicsFilter>,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Extrinsic>> {
        if let Some(filter) = &filter {
            self.check_extrinsics_filter(filter)?;
        }
        let request = ListRequest::new(filter, order, pagination);
        let page = self.source.extrinsics().list_extrinsics(&request).await?;
        self.specs.attach_page(page).await
    }

    /// Extrinsics of a `"pallet.call"` (or bare `"pallet"`), any casing.
    pub async fn get_extrinsics_by_name(
        &self,
        name: &str,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Extrinsic>> {
        let resolved = self.resolve_call_name(name).await?;
        debug!(pallet = %resolved.pallet, call = %resolved.name, known = resolved.is_known(), "Resolved call name");
        let filter = ExtrinsicsFilter::Name {
            call: (!resolved.name.is_empty()).then_some(resolved.name),
            pallet: resolved.pallet,
        };
        self.get_extrinsics(Some(filter), order, pagination).await
    }

    /// Extrinsics signed by `address`.
    pub async fn get_extrinsics_by_account(
        &self,
        address: &str,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Extrinsic>> {
        let filter = ExtrinsicsFilter::Signer(address.to_string());
        self.get_extrinsics(Some(filter), order, pagination).await
    }

    // =========================================================================
    // Events
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_event(&self, filter: EventsFilter) -> DataResult<Option<Event>> {
        match self.source.events().get_event(&filter).await? {
            Some(event) => Ok(Some(self.specs.attach_spec(event).await?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_events(
        &self,
        filter: Option<EventsFilter>,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Event>> {
        let request = ListRequest::new(filter, order, pagination);
        let page = self.source.events().list_events(&request).await?;
        self.specs.attach_page(page).await
    }

    /// Events of a `"pallet.event"` (or bare `"pallet"`), any casing.
    pub async fn get_events_by_name(
        &self,
        name: &str,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Event>> {
        let resolved = self.resolve_event_name(name).await?;
        debug!(pallet = %resolved.pallet, event = %resolved.name, known = resolved.is_known(), "Resolved event name");
        let filter = EventsFilter::Name {
            event: (!resolved.name.is_empty()).then_some(resolved.name),
            pallet: resolved.pallet,
        };
        self.get_events(Some(filter), order, pagination).await
    }

    // =========================================================================
    // Transfers
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_transfers(
        &self,
        filter: Option<TransfersFilter>,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Transfer>> {
        if let Some(TransfersFilter::Account(address)) = &filter {
            self.addresses.decode_address(address)?;
        }
        let request = ListRequest::new(filter, order, pagination);
        self.source.transfers().list_transfers(&request).await
    }

    /// Fill missing transfer timestamps from their blocks.
    ///
    /// One block lookup per distinct height, all in flight at once. Rows
    /// keep their order; rows whose block is unknown keep `None`.
    #[instrument(skip_all, fields(transfers = transfers.len()))]
    pub async fn attach_block_timestamps(
        &self,
        mut transfers: Vec<Transfer>,
    ) -> DataResult<Vec<Transfer>> {
        let heights: BTreeSet<u64> = transfers
            .iter()
            .filter(|t| t.timestamp.is_none())
            .map(|t| t.block_height)
            .collect();
        if heights.is_empty() {
            return Ok(transfers);
        }

        let blocks = self.source.blocks();
        let lookups = heights.into_iter().map(|height| async move {
            let block = blocks.get_block(&BlocksFilter::Height(height)).await?;
            Ok::<_, DataError>((height, block.and_then(|b| b.timestamp)))
        });
        let timestamps: HashMap<u64, Option<DateTime<Utc>>> =
            try_join_all(lookups).await?.into_iter().collect();

        for transfer in transfers.iter_mut().filter(|t| t.timestamp.is_none()) {
            transfer.timestamp = timestamps.get(&transfer.block_height).copied().flatten();
        }
        Ok(transfers)
    }

    // =========================================================================
    // Balances & Accounts
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_balances(
        &self,
        filter: Option<BalancesFilter>,
        order: OrderDirection,
        pagination: PaginationRequest,
    ) -> DataResult<ItemsResponse<Balance>> {
        if let Some(BalancesFilter::Address(address)) = &filter {
            self.addresses.decode_address(address)?;
        }
        let first_page = pagination.is_first_page();
        let request = ListRequest::new(filter, order, pagination).with_total_count(first_page);
        self.source.balances().list_balances(&request).await
    }

    #[instrument(skip(self))]
    pub async fn get_balance(&self, address: &str) -> DataResult<Option<Balance>> {
        self.addresses.decode_address(address)?;
        self.source
            .balances()
            .get_balance(&BalancesFilter::Address(address.to_string()))
            .await
    }

    /// Validate `address` and attach the latest runtime spec.
    #[instrument(skip(self))]
    pub async fn get_account(&self, address: &str) -> DataResult<Account> {
        let public_key: PublicKey = self.addresses.decode_address(address)?;
        let account = Account {
            id: public_key.to_hex(),
            address: address.to_string(),
            public_key,
            runtime_spec: None,
        };
        self.specs.attach_spec(account).await
    }

    // =========================================================================
    // Runtime
    // =========================================================================

    pub async fn get_runtime_spec(&self, version: SpecVersion) -> DataResult<Arc<RuntimeSpec>> {
        self.specs.get_spec(version).await
    }

    pub async fn get_runtime_spec_versions(&self) -> DataResult<Vec<u32>> {
        self.specs.spec_versions().await
    }

    /// Resolve `"pallet.call"` against the latest metadata.
    pub async fn resolve_call_name(&self, name: &str) -> DataResult<ResolvedName> {
        let latest = self.specs.get_spec(SpecVersion::Latest).await?;
        Ok(resolve_qualified_call(&latest.metadata, name))
    }

    /// Resolve `"pallet.event"` against the latest metadata.
    pub async fn resolve_event_name(&self, name: &str) -> DataResult<ResolvedName> {
        let latest = self.specs.get_spec(SpecVersion::Latest).await?;
        Ok(resolve_qualified_event(&latest.metadata, name))
    }

    fn check_extrinsics_filter(&self, filter: &ExtrinsicsFilter) -> DataResult<()> {
        if let ExtrinsicsFilter::Signer(address) = filter {
            self.addresses.decode_address(address)?;
        }
        Ok(())
    }
}
