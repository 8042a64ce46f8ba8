//! Runtime spec and decoded metadata models.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Spec Version
// =============================================================================

/// Runtime spec version requested by a caller.
///
/// Concrete versions are assigned by the chain at each runtime upgrade.
/// `Latest` is a moving target and is never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecVersion {
    /// Whatever the newest spec is at request time.
    Latest,
    /// A concrete spec version.
    Version(u32),
}

impl SpecVersion {
    /// Concrete version number, if any.
    pub fn as_concrete(&self) -> Option<u32> {
        match self {
            Self::Latest => None,
            Self::Version(v) => Some(*v),
        }
    }
}

impl From<u32> for SpecVersion {
    fn from(version: u32) -> Self {
        Self::Version(version)
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Latest => f.write_str("latest"),
            Self::Version(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for SpecVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("latest") {
            return Ok(Self::Latest);
        }
        s.parse::<u32>()
            .map(Self::Version)
            .map_err(|_| format!("Invalid spec version '{s}': expected a number or 'latest'"))
    }
}

impl Serialize for SpecVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Latest => serializer.serialize_str("latest"),
            Self::Version(v) => serializer.serialize_u32(*v),
        }
    }
}

impl<'de> Deserialize<'de> for SpecVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Number(u32),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Number(v) => Ok(Self::Version(v)),
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

// =============================================================================
// Decoded Metadata
// =============================================================================

/// Argument of a call or field of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgDef {
    /// Field name (unnamed for tuple-like variants).
    pub name: Option<String>,
    /// Type name as written in the runtime (e.g. `T::Balance`).
    pub type_name: Option<String>,
}

/// A call or event variant of a pallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDef {
    /// Canonical variant name (`transfer_keep_alive`, `Transfer`).
    pub name: String,
    /// Ordered arguments.
    pub args: Vec<ArgDef>,
}

/// Callable of a pallet.
pub type CallDef = VariantDef;

/// Event emitted by a pallet.
pub type EventDef = VariantDef;

/// A runtime module with its calls and events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletDef {
    /// Canonical pallet name (`Balances`).
    pub name: String,
    pub calls: Vec<CallDef>,
    pub events: Vec<EventDef>,
}

impl PalletDef {
    /// Find a call by case-insensitive name.
    pub fn call(&self, name: &str) -> Option<&CallDef> {
        find_ignore_case(&self.calls, name, |c| &c.name)
    }

    /// Find an event by case-insensitive name.
    pub fn event(&self, name: &str) -> Option<&EventDef> {
        find_ignore_case(&self.events, name, |e| &e.name)
    }
}

/// Decoded runtime metadata: the schema registry for one spec version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedMetadata {
    pub pallets: Vec<PalletDef>,
}

impl DecodedMetadata {
    /// Find a pallet by case-insensitive name.
    pub fn pallet(&self, name: &str) -> Option<&PalletDef> {
        find_ignore_case(&self.pallets, name, |p| &p.name)
    }

    /// Find a call definition, matching both names case-insensitively.
    pub fn call(&self, pallet: &str, call: &str) -> Option<&CallDef> {
        self.pallet(pallet).and_then(|p| p.call(call))
    }

    /// Find an event definition, matching both names case-insensitively.
    pub fn event(&self, pallet: &str, event: &str) -> Option<&EventDef> {
        self.pallet(pallet).and_then(|p| p.event(event))
    }
}

fn find_ignore_case<'a, T>(
    items: &'a [T],
    name: &str,
    key: impl Fn(&T) -> &String,
) -> Option<&'a T> {
    items.iter().find(|item| key(item).eq_ignore_ascii_case(name))
}

// =============================================================================
// Runtime Spec
// =============================================================================

/// Runtime spec with its decoded metadata.
///
/// Immutable once built. Shared behind an `Arc` between the cache and
/// every entity it is attached to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSpec {
    pub id: String,
    pub spec_name: Option<String>,
    pub spec_version: u32,
    /// Block at which this spec was enacted.
    pub block_height: u64,
    pub block_hash: Option<String>,
    pub metadata: DecodedMetadata,
}

/// Entity that needs decoded metadata before it can be rendered.
pub trait NeedsRuntimeSpec {
    /// Spec version the entity was produced under.
    fn spec_version(&self) -> SpecVersion;

    /// Attach the resolved spec.
    fn set_runtime_spec(&mut self, spec: Arc<RuntimeSpec>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_version_parses_latest_and_numbers() {
        assert_eq!("latest".parse::<SpecVersion>(), Ok(SpecVersion::Latest));
        assert_eq!("LATEST".parse::<SpecVersion>(), Ok(SpecVersion::Latest));
        assert_eq!("142".parse::<SpecVersion>(), Ok(SpecVersion::Version(142)));
        assert!("v142".parse::<SpecVersion>().is_err());
    }

    #[test]
    fn spec_version_serde_shape() {
        assert_eq!(serde_json::to_value(SpecVersion::Latest).unwrap(), "latest");
        assert_eq!(serde_json::to_value(SpecVersion::Version(7)).unwrap(), 7);

        let parsed: SpecVersion = serde_json::from_str("\"latest\"").unwrap();
        assert_eq!(parsed, SpecVersion::Latest);
        let parsed: SpecVersion = serde_json::from_str("7").unwrap();
        assert_eq!(parsed, SpecVersion::Version(7));
    }

    #[test]
    fn metadata_lookup_ignores_case() {
        let metadata = DecodedMetadata {
            pallets: vec![PalletDef {
                name: "Balances".into(),
                calls: vec![VariantDef {
                    name: "transfer_keep_alive".into(),
                    args: vec![],
                }],
                events: vec![VariantDef {
                    name: "Transfer".into(),
                    args: vec![],
                }],
            }],
        };

        assert!(metadata.pallet("balances").is_some());
        assert!(metadata.call("BALANCES", "Transfer_Keep_Alive").is_some());
        assert!(metadata.event("balances", "transfer").is_some());
        assert!(metadata.event("balances", "Deposit").is_none());
        assert!(metadata.pallet("System").is_none());
    }
}
