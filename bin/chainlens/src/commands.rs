//! Subcommand execution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use chainlens_adapters::SourceRegistry;
use chainlens_core::error::DataResult;
use chainlens_core::models::RuntimeSpec;
use chainlens_core::ports::{
    BalancesFilter, BlocksFilter, EventsFilter, ExtrinsicsFilter, ItemsResponse, OrderDirection,
    PaginationRequest, TransfersFilter,
};
use chainlens_core::services::{Binding, ExplorerService, FetchOptions};

use crate::cli::{Command, WatchEntity};
use crate::shutdown_signal;

pub type Explorer = ExplorerService<SourceRegistry>;

/// Run one subcommand and print its result as JSON on stdout.
pub async fn run(explorer: Arc<Explorer>, command: Command, with_metadata: bool) -> Result<()> {
    let output = Output { with_metadata };

    match command {
        Command::Blocks { height, page } => {
            let filter = height.map(BlocksFilter::Height);
            let blocks = explorer
                .get_blocks(filter, page.order(), page.pagination()?)
                .await
                .context("Failed to list blocks")?;
            output.print(&blocks)
        }
        Command::Block { query } => {
            let block = explorer
                .get_block(block_filter(&query))
                .await
                .with_context(|| format!("Failed to fetch block '{query}'"))?;
            output.print_found(block, "Block", &query)
        }
        Command::Extrinsics {
            name,
            signer,
            block,
            page,
        } => {
            let (order, pagination) = (page.order(), page.pagination()?);
            let extrinsics = if let Some(name) = name {
                explorer.get_extrinsics_by_name(&name, order, pagination).await
            } else if let Some(signer) = signer {
                explorer.get_extrinsics_by_account(&signer, order, pagination).await
            } else {
                let filter = block.map(ExtrinsicsFilter::BlockHeight);
                explorer.get_extrinsics(filter, order, pagination).await
            }
            .context("Failed to list extrinsics")?;
            output.print(&extrinsics)
        }
        Command::Extrinsic { query } => {
            let filter = if is_hash(&query) {
                ExtrinsicsFilter::Hash(query.clone())
            } else {
                ExtrinsicsFilter::Id(query.clone())
            };
            let extrinsic = explorer
                .get_extrinsic(filter)
                .await
                .with_context(|| format!("Failed to fetch extrinsic '{query}'"))?;
            output.print_found(extrinsic, "Extrinsic", &query)
        }
        Command::Events {
            name,
            extrinsic,
            block,
            page,
        } => {
            let (order, pagination) = (page.order(), page.pagination()?);
            let events = if let Some(name) = name {
                explorer.get_events_by_name(&name, order, pagination).await
            } else {
                let filter = extrinsic
                    .map(EventsFilter::ExtrinsicId)
                    .or(block.map(EventsFilter::BlockHeight));
                explorer.get_events(filter, order, pagination).await
            }
            .context("Failed to list events")?;
            output.print(&events)
        }
        Command::Event { id } => {
            let event = explorer
                .get_event(EventsFilter::Id(id.clone()))
                .await
                .with_context(|| format!("Failed to fetch event '{id}'"))?;
            output.print_found(event, "Event", &id)
        }
        Command::Transfers { account, page } => {
            let filter = account.map(TransfersFilter::Account);
            let transfers = list_transfers(&explorer, filter, page.order(), page.pagination()?)
                .await
                .context("Failed to list transfers")?;
            output.print(&transfers)
        }
        Command::Balances { address, page } => {
            let filter = address.map(BalancesFilter::Address);
            let balances = explorer
                .get_balances(filter, page.order(), page.pagination()?)
                .await
                .context("Failed to list balances")?;
            output.print(&balances)
        }
        Command::Account { address } => {
            let account = explorer
                .get_account(&address)
                .await
                .with_context(|| format!("Failed to load account '{address}'"))?;
            output.print(&account)
        }
        Command::Spec { version, full } => {
            let spec = explorer
                .get_runtime_spec(version)
                .await
                .with_context(|| format!("Failed to load runtime spec {version}"))?;
            if full {
                output.print(spec.as_ref())
            } else {
                output.print(&SpecSummary::from(spec.as_ref()))
            }
        }
        Command::SpecVersions => {
            let versions = explorer
                .get_runtime_spec_versions()
                .await
                .context("Failed to list runtime spec versions")?;
            output.print(&versions)
        }
        Command::Resolve { name, event } => {
            let resolved = if event {
                explorer.resolve_event_name(&name).await
            } else {
                explorer.resolve_call_name(&name).await
            }
            .with_context(|| format!("Failed to resolve '{name}'"))?;
            output.print(&resolved)
        }
        Command::Watch {
            entity,
            interval,
            limit,
        } => {
            let pagination = PaginationRequest::new(limit, 0)?;
            let interval = Duration::from_secs(interval.max(1));
            info!(?entity, interval_secs = interval.as_secs(), "🚀 Watching first page");

            match entity {
                WatchEntity::Blocks => {
                    watch(output, interval, move || {
                        let (explorer, pagination) = (Arc::clone(&explorer), pagination.clone());
                        async move { explorer.get_blocks(None, OrderDirection::Desc, pagination).await }
                    })
                    .await
                }
                WatchEntity::Extrinsics => {
                    watch(output, interval, move || {
                        let (explorer, pagination) = (Arc::clone(&explorer), pagination.clone());
                        async move {
                            explorer.get_extrinsics(None, OrderDirection::Desc, pagination).await
                        }
                    })
                    .await
                }
                WatchEntity::Events => {
                    watch(output, interval, move || {
                        let (explorer, pagination) = (Arc::clone(&explorer), pagination.clone());
                        async move { explorer.get_events(None, OrderDirection::Desc, pagination).await }
                    })
                    .await
                }
                WatchEntity::Transfers => {
                    watch(output, interval, move || {
                        let (explorer, pagination) = (Arc::clone(&explorer), pagination.clone());
                        async move {
                            list_transfers(&explorer, None, OrderDirection::Desc, pagination).await
                        }
                    })
                    .await
                }
            }
        }
    }
}

/// Transfers page with timestamps filled from their blocks.
async fn list_transfers(
    explorer: &Explorer,
    filter: Option<TransfersFilter>,
    order: OrderDirection,
    pagination: PaginationRequest,
) -> DataResult<ItemsResponse<chainlens_core::models::Transfer>> {
    let mut page = explorer.get_transfers(filter, order, pagination).await?;
    page.data = explorer
        .attach_block_timestamps(std::mem::take(&mut page.data))
        .await?;
    Ok(page)
}

/// Poll `fetch` and print every new page until Ctrl+C.
async fn watch<T, F, Fut>(output: Output, interval: Duration, fetch: F) -> Result<()>
where
    T: Serialize + Clone + Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DataResult<ItemsResponse<T>>> + Send + 'static,
{
    let options = FetchOptions {
        skip: false,
        refresh_interval: Some(interval),
    };
    let binding = Binding::spawn(options, true, move || {
        let page = fetch();
        async move { page.await.map(Some) }
    });

    let mut updates = binding.subscribe();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                if state.loading {
                    continue;
                }
                if let Some(error) = state.error {
                    warn!(%error, "⚠️ Refresh failed, keeping previous page");
                    continue;
                }
                if let Some(page) = state.data {
                    output.print(&page)?;
                }
            }
            _ = &mut shutdown => {
                info!("🛑 Watch stopped");
                break;
            }
        }
    }
    Ok(())
}

// =============================================================================
// Output
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct Output {
    with_metadata: bool,
}

impl Output {
    fn print<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut json = serde_json::to_value(value).context("Failed to serialize output")?;
        if !self.with_metadata {
            strip_runtime_specs(&mut json);
        }
        println!("{}", serde_json::to_string_pretty(&json)?);
        Ok(())
    }

    fn print_found<T: Serialize>(&self, value: Option<T>, kind: &str, query: &str) -> Result<()> {
        match value {
            Some(value) => self.print(&value),
            None => anyhow::bail!("{kind} '{query}' not found"),
        }
    }
}

/// Drop attached runtime specs, which carry the whole decoded metadata.
fn strip_runtime_specs(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.remove("runtimeSpec");
            map.values_mut().for_each(strip_runtime_specs);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_runtime_specs),
        _ => {}
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpecSummary<'a> {
    spec_name: Option<&'a str>,
    spec_version: u32,
    block_height: u64,
    block_hash: Option<&'a str>,
    pallets: Vec<PalletSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct PalletSummary<'a> {
    name: &'a str,
    calls: usize,
    events: usize,
}

impl<'a> From<&'a RuntimeSpec> for SpecSummary<'a> {
    fn from(spec: &'a RuntimeSpec) -> Self {
        Self {
            spec_name: spec.spec_name.as_deref(),
            spec_version: spec.spec_version,
            block_height: spec.block_height,
            block_hash: spec.block_hash.as_deref(),
            pallets: spec
                .metadata
                .pallets
                .iter()
                .map(|pallet| PalletSummary {
                    name: &pallet.name,
                    calls: pallet.calls.len(),
                    events: pallet.events.len(),
                })
                .collect(),
        }
    }
}

// =============================================================================
// Argument parsing
// =============================================================================

fn is_hash(query: &str) -> bool {
    query.len() == 66 && query.starts_with("0x")
}

/// Heights are all digits, hashes are `0x` + 64 hex chars, anything else is an id.
fn block_filter(query: &str) -> BlocksFilter {
    if is_hash(query) {
        BlocksFilter::Hash(query.to_string())
    } else if let Ok(height) = query.parse::<u64>() {
        BlocksFilter::Height(height)
    } else {
        BlocksFilter::Id(query.to_string())
    }
}
