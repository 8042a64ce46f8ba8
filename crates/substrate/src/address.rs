//! SS58 account addresses.

use std::str::FromStr;

use subxt::utils::AccountId32;

use chainlens_core::error::{DomainError, DomainResult};
use chainlens_core::models::PublicKey;
use chainlens_core::ports::AddressCodec;

/// Decode an SS58 address, or a 0x-prefixed 32-byte public key.
///
/// The SS58 checksum is verified; the network prefix is not restricted.
pub fn decode_address(address: &str) -> DomainResult<PublicKey> {
    let address = address.trim();
    if address.starts_with("0x") {
        return PublicKey::from_hex(address)
            .map_err(|e| DomainError::InvalidAddress(format!("{address}: {e}")));
    }

    AccountId32::from_str(address)
        .map(|account| PublicKey(account.0))
        .map_err(|e| DomainError::InvalidAddress(format!("{address}: {e}")))
}

/// Whether `address` is a valid SS58 address or hex public key.
pub fn is_address(address: &str) -> bool {
    decode_address(address).is_ok()
}

/// Generic-prefix (42) SS58 form of a public key.
pub fn to_ss58(key: &PublicKey) -> String {
    AccountId32(key.0).to_string()
}

/// [`AddressCodec`] backed by [`decode_address`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ss58Codec;

impl AddressCodec for Ss58Codec {
    fn decode_address(&self, address: &str) -> DomainResult<PublicKey> {
        decode_address(address)
    }
}
