//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use url::Url;

use chainlens_adapters::BackendSelection;
use chainlens_core::models::SpecVersion;
use chainlens_core::ports::{BackendId, DEFAULT_PAGE_SIZE, OrderDirection, PaginationRequest};

/// chainlens - read-only data access for a Substrate chain explorer.
#[derive(Parser, Debug)]
#[command(name = "chainlens")]
#[command(about = "Query blocks, extrinsics, events, transfers and runtime metadata")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub endpoints: EndpointArgs,

    #[command(flatten)]
    pub backends: BackendArgs,

    /// Per-request timeout in seconds.
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub timeout_secs: u64,

    /// Expose Prometheus metrics on this port.
    #[arg(long, env = "METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Keep attached runtime metadata in the output.
    #[arg(long, global = true)]
    pub with_metadata: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// One GraphQL endpoint per backend.
#[derive(Args, Debug)]
pub struct EndpointArgs {
    #[arg(long = "indexer-endpoint", env = "INDEXER_ENDPOINT")]
    pub indexer: Option<Url>,

    #[arg(long = "dictionary-endpoint", env = "DICTIONARY_ENDPOINT")]
    pub dictionary: Option<Url>,

    #[arg(long = "archive-endpoint", env = "ARCHIVE_ENDPOINT")]
    pub archive: Option<Url>,

    #[arg(long = "explorer-endpoint", env = "EXPLORER_ENDPOINT")]
    pub explorer: Option<Url>,

    #[arg(long = "main-endpoint", env = "MAIN_ENDPOINT")]
    pub main: Option<Url>,
}

impl EndpointArgs {
    pub fn configured(&self) -> impl Iterator<Item = (BackendId, &Url)> {
        [
            (BackendId::Indexer, self.indexer.as_ref()),
            (BackendId::Dictionary, self.dictionary.as_ref()),
            (BackendId::Archive, self.archive.as_ref()),
            (BackendId::Explorer, self.explorer.as_ref()),
            (BackendId::Main, self.main.as_ref()),
        ]
        .into_iter()
        .filter_map(|(backend, url)| url.map(|url| (backend, url)))
    }
}

/// Backend serving each entity type.
#[derive(Args, Debug)]
pub struct BackendArgs {
    #[arg(long, env = "BLOCKS_BACKEND", default_value = "archive")]
    pub blocks_backend: BackendId,

    #[arg(long, env = "EXTRINSICS_BACKEND", default_value = "archive")]
    pub extrinsics_backend: BackendId,

    #[arg(long, env = "EVENTS_BACKEND", default_value = "archive")]
    pub events_backend: BackendId,

    #[arg(long, env = "TRANSFERS_BACKEND", default_value = "main")]
    pub transfers_backend: BackendId,

    #[arg(long, env = "BALANCES_BACKEND", default_value = "indexer")]
    pub balances_backend: BackendId,
}

impl BackendArgs {
    pub fn selection(&self) -> BackendSelection {
        BackendSelection {
            blocks: self.blocks_backend,
            extrinsics: self.extrinsics_backend,
            events: self.events_backend,
            transfers: self.transfers_backend,
            balances: self.balances_backend,
        }
    }
}

/// Paging options shared by list commands.
#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Items per page (1-100).
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub limit: u32,

    /// Items to skip.
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// `endCursor` of the previous page.
    #[arg(long)]
    pub cursor: Option<String>,

    /// Oldest first.
    #[arg(long)]
    pub asc: bool,
}

impl PageArgs {
    pub fn order(&self) -> OrderDirection {
        if self.asc {
            OrderDirection::Asc
        } else {
            OrderDirection::Desc
        }
    }

    pub fn pagination(&self) -> anyhow::Result<PaginationRequest> {
        let pagination = PaginationRequest::new(self.limit, self.offset)?;
        Ok(match &self.cursor {
            Some(cursor) => pagination.with_cursor(cursor.clone()),
            None => pagination,
        })
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List blocks.
    Blocks {
        /// Only the block at this height.
        #[arg(long)]
        height: Option<u64>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one block by height, hash or id.
    Block { query: String },
    /// List extrinsics.
    Extrinsics {
        /// `pallet.call` or bare `pallet`, any casing.
        #[arg(long, conflicts_with_all = ["signer", "block"])]
        name: Option<String>,
        /// Signer address.
        #[arg(long, conflicts_with = "block")]
        signer: Option<String>,
        /// Block height.
        #[arg(long)]
        block: Option<u64>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one extrinsic by hash or id.
    Extrinsic { query: String },
    /// List events.
    Events {
        /// `pallet.event` or bare `pallet`, any casing.
        #[arg(long, conflicts_with_all = ["extrinsic", "block"])]
        name: Option<String>,
        /// Emitting extrinsic id.
        #[arg(long, conflicts_with = "block")]
        extrinsic: Option<String>,
        /// Block height.
        #[arg(long)]
        block: Option<u64>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Show one event by id.
    Event { id: String },
    /// List transfers.
    Transfers {
        /// Sent or received by this address.
        #[arg(long)]
        account: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// List account balances.
    Balances {
        #[arg(long)]
        address: Option<String>,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Validate an address and show its public key.
    Account { address: String },
    /// Show a runtime spec.
    Spec {
        /// Spec version or `latest`.
        #[arg(default_value = "latest")]
        version: SpecVersion,
        /// Print every pallet with its calls and events.
        #[arg(long)]
        full: bool,
    },
    /// List known runtime spec versions.
    SpecVersions,
    /// Resolve a `pallet.call` or `pallet.event` name against the latest runtime.
    Resolve {
        name: String,
        /// Resolve as an event instead of a call.
        #[arg(long)]
        event: bool,
    },
    /// Poll the first page of a list until Ctrl+C.
    Watch {
        #[arg(value_enum)]
        entity: WatchEntity,
        /// Refresh interval in seconds.
        #[arg(long, default_value = "6")]
        interval: u64,
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum WatchEntity {
    Blocks,
    Extrinsics,
    Events,
    Transfers,
}
