//! Backend selection and the [`DataSource`] built from it.

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use chainlens_core::ports::{
    AddressCodec, BackendId, BalanceSource, BlockSource, DataSource, EventSource,
    ExtrinsicSource, QueryExecutor, TransferSource,
};

use crate::archive::ArchiveSource;
use crate::dictionary::DictionarySource;
use crate::explorer::ExplorerSource;
use crate::indexer::IndexerSource;
use crate::main_index::MainIndexSource;

/// A backend was selected for an entity it does not serve.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Backend '{backend}' cannot serve {entity}")]
pub struct UnsupportedBackend {
    pub entity: &'static str,
    pub backend: BackendId,
}

/// Which backend serves each entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendSelection {
    pub blocks: BackendId,
    pub extrinsics: BackendId,
    pub events: BackendId,
    pub transfers: BackendId,
    pub balances: BackendId,
}

impl Default for BackendSelection {
    fn default() -> Self {
        Self {
            blocks: BackendId::Archive,
            extrinsics: BackendId::Archive,
            events: BackendId::Archive,
            transfers: BackendId::Main,
            balances: BackendId::Indexer,
        }
    }
}

impl BackendSelection {
    /// Backends that need an endpoint, runtime metadata included.
    pub fn required_backends(&self) -> BTreeSet<BackendId> {
        BTreeSet::from([
            self.blocks,
            self.extrinsics,
            self.events,
            self.transfers,
            self.balances,
            BackendId::Dictionary,
        ])
    }
}

/// One entity source per entity type.
pub struct SourceRegistry {
    blocks: Arc<dyn BlockSource>,
    extrinsics: Arc<dyn ExtrinsicSource>,
    events: Arc<dyn EventSource>,
    transfers: Arc<dyn TransferSource>,
    balances: Arc<dyn BalanceSource>,
}

impl SourceRegistry {
    /// Wire the selected backends over a shared executor.
    pub fn build(
        selection: &BackendSelection,
        executor: Arc<dyn QueryExecutor>,
        addresses: Arc<dyn AddressCodec>,
    ) -> Result<Self, UnsupportedBackend> {
        let archive = Arc::new(ArchiveSource::new(executor.clone()));
        let dictionary = Arc::new(DictionarySource::new(executor.clone()));
        let explorer = Arc::new(ExplorerSource::new(executor.clone(), addresses.clone()));
        let indexer = Arc::new(IndexerSource::new(executor.clone(), addresses.clone()));
        let main = Arc::new(MainIndexSource::new(executor, addresses));

        let unsupported = |entity, backend| UnsupportedBackend { entity, backend };

        let blocks: Arc<dyn BlockSource> = match selection.blocks {
            BackendId::Archive => archive.clone(),
            BackendId::Dictionary => dictionary.clone(),
            BackendId::Explorer => explorer.clone(),
            BackendId::Indexer => indexer.clone(),
            other => return Err(unsupported("blocks", other)),
        };
        let extrinsics: Arc<dyn ExtrinsicSource> = match selection.extrinsics {
            BackendId::Archive => archive.clone(),
            BackendId::Dictionary => dictionary.clone(),
            BackendId::Explorer => explorer.clone(),
            BackendId::Indexer => indexer.clone(),
            other => return Err(unsupported("extrinsics", other)),
        };
        let events: Arc<dyn EventSource> = match selection.events {
            BackendId::Archive => archive,
            BackendId::Dictionary => dictionary,
            BackendId::Explorer => explorer,
            BackendId::Indexer => indexer.clone(),
            other => return Err(unsupported("events", other)),
        };
        let transfers: Arc<dyn TransferSource> = match selection.transfers {
            BackendId::Main => main,
            BackendId::Indexer => indexer.clone(),
            other => return Err(unsupported("transfers", other)),
        };
        let balances: Arc<dyn BalanceSource> = match selection.balances {
            BackendId::Indexer => indexer,
            other => return Err(unsupported("balances", other)),
        };

        info!(
            blocks = %selection.blocks,
            extrinsics = %selection.extrinsics,
            events = %selection.events,
            transfers = %selection.transfers,
            balances = %selection.balances,
            "🔌 Entity sources selected"
        );

        Ok(Self {
            blocks,
            extrinsics,
            events,
            transfers,
            balances,
        })
    }
}

impl DataSource for SourceRegistry {
    fn blocks(&self) -> &dyn BlockSource {
        &*self.blocks
    }

    fn extrinsics(&self) -> &dyn ExtrinsicSource {
        &*self.extrinsics
    }

    fn events(&self) -> &dyn EventSource {
        &*self.events
    }

    fn transfers(&self) -> &dyn TransferSource {
        &*self.transfers
    }

    fn balances(&self) -> &dyn BalanceSource {
        &*self.balances
    }
}
