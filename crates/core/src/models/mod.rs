//! Canonical entities consumed by explorer views.
//!
//! These models are backend-agnostic: every adapter normalizes its own
//! wire shape into them. Fields a backend does not supply stay `None`,
//! meaning "unknown", never zero.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod runtime;

pub use runtime::*;

// =============================================================================
// Public Key
// =============================================================================

/// 32-byte account public key (SS58 decoded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl PublicKey {
    /// Parse from hex string (with or without 0x prefix).
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// Convert to 0x-prefixed hex string.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for PublicKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

// =============================================================================
// Qualified names
// =============================================================================

/// Split a `"Pallet.Item"` string into its two parts.
///
/// A string without a dot is a bare pallet name; the item part is empty.
pub fn split_qualified_name(name: &str) -> (&str, &str) {
    name.split_once('.').unwrap_or((name, ""))
}

/// Join a pallet and item name back into `"Pallet.Item"`.
pub fn qualified_name(pallet: &str, item: &str) -> String {
    if item.is_empty() {
        pallet.to_string()
    } else {
        format!("{pallet}.{item}")
    }
}

// =============================================================================
// Blocks
// =============================================================================

/// A block as shown by the explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub height: u64,
    pub hash: String,
    pub parent_hash: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    /// Block author, as reported by the backend.
    pub validator: Option<String>,
    pub spec_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_spec: Option<Arc<RuntimeSpec>>,
}

// =============================================================================
// Extrinsics
// =============================================================================

/// An extrinsic (signed transaction or inherent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extrinsic {
    pub id: String,
    pub block_id: Option<String>,
    pub block_height: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub hash: Option<String>,
    pub index_in_block: Option<u32>,
    /// Pallet name (e.g., "Balances").
    pub pallet: String,
    /// Call name (e.g., "transfer_keep_alive").
    pub call: String,
    /// Call arguments as reported by the backend.
    pub args: serde_json::Value,
    /// Signer address or public key, as reported by the backend.
    pub signer: Option<String>,
    pub success: Option<bool>,
    pub is_signed: Option<bool>,
    pub nonce: Option<u64>,
    pub tip: Option<BigDecimal>,
    pub fee: Option<BigDecimal>,
    pub error: Option<serde_json::Value>,
    pub version: Option<u32>,
    pub spec_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_spec: Option<Arc<RuntimeSpec>>,
}

impl Extrinsic {
    /// `"Pallet.call"` form of the call name.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.pallet, &self.call)
    }
}

// =============================================================================
// Events
// =============================================================================

/// An event emitted during block execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub block_id: Option<String>,
    pub block_height: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub index_in_block: Option<u32>,
    /// Pallet name (e.g., "Balances").
    pub pallet: String,
    /// Event variant name (e.g., "Transfer").
    pub name: String,
    /// Extrinsic that emitted the event (None for system events).
    pub extrinsic_id: Option<String>,
    pub call_id: Option<String>,
    pub args: serde_json::Value,
    pub spec_version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_spec: Option<Arc<RuntimeSpec>>,
}

impl Event {
    /// `"Pallet.Event"` form of the event name.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.pallet, &self.name)
    }
}

// =============================================================================
// Transfers
// =============================================================================

/// Direction of a transfer relative to the account it was indexed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferDirection {
    From,
    To,
}

/// A token transfer between two accounts.
///
/// Transfers are rendered without metadata and never carry a runtime spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub block_height: u64,
    pub timestamp: Option<DateTime<Utc>>,
    pub extrinsic_id: Option<String>,
    pub extrinsic_hash: Option<String>,
    /// Sender public key or address.
    pub from: String,
    /// Recipient public key or address.
    pub to: String,
    /// Amount in the chain's smallest unit.
    pub amount: BigDecimal,
    pub success: Option<bool>,
    /// Account the row was indexed for (main index only).
    pub account: Option<String>,
    pub direction: Option<TransferDirection>,
}

// =============================================================================
// Balances & Accounts
// =============================================================================

/// Account balance snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: String,
    pub address: String,
    pub free: Option<BigDecimal>,
    pub staked: Option<BigDecimal>,
    pub total: Option<BigDecimal>,
    /// Block height at which the account was first seen.
    pub created_at: Option<u64>,
    /// Block height of the last balance change.
    pub updated_at: Option<u64>,
}

/// A validated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    /// Address as typed by the user.
    pub address: String,
    pub public_key: PublicKey,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_spec: Option<Arc<RuntimeSpec>>,
}

// =============================================================================
// Runtime spec attachment
// =============================================================================

macro_rules! impl_needs_runtime_spec {
    ($($entity:ty),+ $(,)?) => {
        $(
            impl NeedsRuntimeSpec for $entity {
                fn spec_version(&self) -> SpecVersion {
                    SpecVersion::Version(self.spec_version)
                }

                fn set_runtime_spec(&mut self, spec: Arc<RuntimeSpec>) {
                    self.runtime_spec = Some(spec);
                }
            }
        )+
    };
}

impl_needs_runtime_spec!(Block, Extrinsic, Event);

impl NeedsRuntimeSpec for Account {
    fn spec_version(&self) -> SpecVersion {
        SpecVersion::Latest
    }

    fn set_runtime_spec(&mut self, spec: Arc<RuntimeSpec>) {
        self.runtime_spec = Some(spec);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_hex_roundtrip() {
        let hex = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";
        let key = PublicKey::from_hex(hex).unwrap();
        assert_eq!(key.to_hex(), hex);
        assert_eq!(PublicKey::from_hex(&hex[2..]).unwrap(), key);
    }

    #[test]
    fn public_key_invalid_length() {
        assert!(PublicKey::from_hex("0x1234").is_err());
    }

    #[test]
    fn qualified_name_roundtrip() {
        let original = "Balances.transfer";
        let (pallet, call) = split_qualified_name(original);
        assert_eq!((pallet, call), ("Balances", "transfer"));
        assert_eq!(qualified_name(pallet, call), original);
    }

    #[test]
    fn bare_pallet_name_has_empty_item() {
        assert_eq!(split_qualified_name("Balances"), ("Balances", ""));
        assert_eq!(qualified_name("Balances", ""), "Balances");
    }
}
