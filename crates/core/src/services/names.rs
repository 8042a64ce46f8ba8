//! Pallet/call/event name resolution against decoded metadata.
//!
//! Users type names in any casing (`balances.Transfer`). The resolver
//! maps them to the chain-canonical casing when the metadata knows them,
//! and to a best-effort casing flagged as unknown otherwise.

use serde::Serialize;

use crate::models::{DecodedMetadata, split_qualified_name};

/// Outcome of a name lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedName {
    pub pallet: String,
    pub name: String,
    /// Pallet was found in the metadata.
    pub pallet_known: bool,
    /// Call or event was found in the metadata.
    pub name_known: bool,
}

impl ResolvedName {
    /// Whether the whole name matched the schema.
    pub fn is_known(&self) -> bool {
        self.pallet_known && self.name_known
    }
}

/// Resolve a pallet/call pair. Unknown calls fall back to lower-first.
pub fn resolve_call(metadata: &DecodedMetadata, pallet: &str, call: &str) -> ResolvedName {
    resolve(metadata, pallet, call, Kind::Call)
}

/// Resolve a pallet/event pair. Unknown events fall back to upper-first.
pub fn resolve_event(metadata: &DecodedMetadata, pallet: &str, event: &str) -> ResolvedName {
    resolve(metadata, pallet, event, Kind::Event)
}

/// Resolve a `"pallet.call"` string.
pub fn resolve_qualified_call(metadata: &DecodedMetadata, name: &str) -> ResolvedName {
    let (pallet, call) = split_qualified_name(name);
    resolve_call(metadata, pallet, call)
}

/// Resolve a `"pallet.event"` string.
pub fn resolve_qualified_event(metadata: &DecodedMetadata, name: &str) -> ResolvedName {
    let (pallet, event) = split_qualified_name(name);
    resolve_event(metadata, pallet, event)
}

#[derive(Clone, Copy)]
enum Kind {
    Call,
    Event,
}

fn resolve(metadata: &DecodedMetadata, pallet: &str, item: &str, kind: Kind) -> ResolvedName {
    let Some(pallet_def) = metadata.pallet(pallet) else {
        return ResolvedName {
            pallet: upper_first(pallet),
            name: fallback(item, kind),
            pallet_known: false,
            name_known: false,
        };
    };

    let found = match kind {
        Kind::Call => pallet_def.call(item),
        Kind::Event => pallet_def.event(item),
    };

    match found {
        Some(def) => ResolvedName {
            pallet: pallet_def.name.clone(),
            name: def.name.clone(),
            pallet_known: true,
            name_known: true,
        },
        None => ResolvedName {
            pallet: pallet_def.name.clone(),
            name: fallback(item, kind),
            pallet_known: true,
            name_known: false,
        },
    }
}

fn fallback(item: &str, kind: Kind) -> String {
    match kind {
        Kind::Call => lower_first(item),
        Kind::Event => upper_first(item),
    }
}

/// Uppercase the first character.
pub fn upper_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character.
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PalletDef, VariantDef};

    fn metadata() -> DecodedMetadata {
        let variant = |name: &str| VariantDef {
            name: name.into(),
            args: vec![],
        };
        DecodedMetadata {
            pallets: vec![
                PalletDef {
                    name: "Balances".into(),
                    calls: vec![variant("transfer"), variant("transfer_keep_alive")],
                    events: vec![variant("Transfer"), variant("Deposit")],
                },
                PalletDef {
                    name: "System".into(),
                    calls: vec![variant("remark")],
                    events: vec![variant("ExtrinsicSuccess")],
                },
            ],
        }
    }

    // Test critique: la casse canonique est restaurée sur un hit
    #[test]
    fn known_call_gets_canonical_casing() {
        let resolved = resolve_call(&metadata(), "balances", "Transfer");
        assert_eq!(resolved.pallet, "Balances");
        assert_eq!(resolved.name, "transfer");
        assert!(resolved.is_known());
    }

    #[test]
    fn known_event_gets_canonical_casing() {
        let resolved = resolve_event(&metadata(), "SYSTEM", "extrinsicsuccess");
        assert_eq!((resolved.pallet.as_str(), resolved.name.as_str()), ("System", "ExtrinsicSuccess"));
        assert!(resolved.is_known());
    }

    #[test]
    fn unknown_pallet_falls_back() {
        let resolved = resolve_call(&metadata(), "nosuchpallet", "foo");
        assert_eq!((resolved.pallet.as_str(), resolved.name.as_str()), ("Nosuchpallet", "foo"));
        assert!(!resolved.pallet_known);
        assert!(!resolved.name_known);
    }

    // Test critique: asymétrie call lower-first / event upper-first
    #[test]
    fn unknown_names_fall_back_asymmetrically() {
        let call = resolve_call(&metadata(), "balances", "Burn_All");
        assert_eq!((call.pallet.as_str(), call.name.as_str()), ("Balances", "burn_All"));
        assert!(call.pallet_known);
        assert!(!call.name_known);

        let event = resolve_event(&metadata(), "balances", "burned");
        assert_eq!((event.pallet.as_str(), event.name.as_str()), ("Balances", "Burned"));
        assert!(!event.is_known());
    }

    #[test]
    fn qualified_names_are_split() {
        let resolved = resolve_qualified_call(&metadata(), "balances.TRANSFER_KEEP_ALIVE");
        assert_eq!(resolved.name, "transfer_keep_alive");

        let pallet_only = resolve_qualified_event(&metadata(), "balances");
        assert_eq!(pallet_only.pallet, "Balances");
        assert_eq!(pallet_only.name, "");
        assert!(!pallet_only.name_known);
    }

    #[test]
    fn casing_helpers() {
        assert_eq!(upper_first("balances"), "Balances");
        assert_eq!(lower_first("Transfer"), "transfer");
        assert_eq!(upper_first(""), "");
        assert_eq!(lower_first(""), "");
    }
}
