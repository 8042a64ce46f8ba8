//! Backend adapters for the chainlens data access layer.
//!
//! Each backend module turns one GraphQL API into canonical entities:
//!
//! - [`archive`] - squid archive, Relay connections
//! - [`explorer`] - explorer squid, connections plus items counters
//! - [`main_index`] - per-account transfers
//! - [`indexer`] - SubQuery node lists, the only balance source
//! - [`dictionary`] - flat arrays probed with `limit + 1`, runtime metadata
//!
//! # Wiring
//!
//! ```ignore
//! let executor: Arc<dyn QueryExecutor> = Arc::new(HttpExecutor::new(config)?);
//! let addresses: Arc<dyn AddressCodec> = Arc::new(Ss58Codec);
//!
//! let selection = BackendSelection::default();
//! let source = SourceRegistry::build(&selection, executor.clone(), addresses.clone())?;
//! let specs = DictionarySpecSource::new(executor);
//! ```

pub mod archive;
pub mod dictionary;
pub mod explorer;
pub mod indexer;
pub mod main_index;

mod registry;
mod utils;

#[cfg(test)]
mod testing;

pub use archive::ArchiveSource;
pub use dictionary::{DictionarySource, DictionarySpecSource};
pub use explorer::ExplorerSource;
pub use indexer::IndexerSource;
pub use main_index::MainIndexSource;
pub use registry::{BackendSelection, SourceRegistry, UnsupportedBackend};
