//! Ports for runtime spec retrieval, metadata decoding and address parsing.

use async_trait::async_trait;

use crate::error::{DataResult, DomainResult, MetadataResult};
use crate::models::{DecodedMetadata, PublicKey};

/// Runtime spec as stored by the backend, metadata still SCALE-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRuntimeSpec {
    pub id: String,
    pub spec_name: Option<String>,
    pub spec_version: u32,
    pub block_height: u64,
    pub block_hash: Option<String>,
    /// Hex-encoded metadata payload.
    pub hex: String,
}

/// Backend holding runtime metadata.
#[async_trait]
pub trait RuntimeSpecSource: Send + Sync {
    /// Newest spec at request time.
    async fn latest_spec(&self) -> DataResult<RawRuntimeSpec>;

    /// Specs for the given versions, in one round trip.
    ///
    /// Versions the backend does not know are simply absent from the result.
    async fn specs(&self, versions: &[u32]) -> DataResult<Vec<RawRuntimeSpec>>;

    /// Every known spec version, newest first.
    async fn spec_versions(&self) -> DataResult<Vec<u32>>;
}

/// Turns a metadata payload into the pallet/call/event registry.
pub trait MetadataDecoder: Send + Sync {
    fn decode(&self, hex: &str) -> MetadataResult<DecodedMetadata>;
}

/// Validates user-supplied account addresses.
pub trait AddressCodec: Send + Sync {
    /// Decode an SS58 address (or 0x-prefixed public key) into its key.
    fn decode_address(&self, address: &str) -> DomainResult<PublicKey>;

    /// Whether `address` decodes.
    fn is_address(&self, address: &str) -> bool {
        self.decode_address(address).is_ok()
    }
}
