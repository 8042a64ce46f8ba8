//! Explorer squid wire shapes.
//!
//! The explorer flattens `spec { specVersion }` into `specVersion` and
//! splits names into pallet and item fields.

use serde::Deserialize;
use serde_json::Value;

use chainlens_core::error::DomainResult;
use chainlens_core::models::{Block, Event, Extrinsic};

use crate::utils::{opt_decimal, opt_timestamp, opt_u32, parse_u64, require};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerBlock {
    pub id: String,
    pub hash: String,
    pub height: Value,
    pub timestamp: Option<Value>,
    pub parent_hash: Option<String>,
    pub validator: Option<String>,
    pub spec_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerBlockRef {
    pub id: String,
    pub height: Value,
    pub timestamp: Option<Value>,
    pub spec_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerCall {
    pub pallet_name: String,
    pub call_name: String,
    pub args_str: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerExtrinsic {
    pub id: String,
    pub extrinsic_hash: Option<String>,
    pub block: ExplorerBlockRef,
    #[serde(default)]
    pub calls: Vec<ExplorerCall>,
    pub index_in_block: Option<Value>,
    pub success: Option<bool>,
    pub tip: Option<Value>,
    pub fee: Option<Value>,
    pub signer_public_key: Option<String>,
    pub error: Option<Value>,
    pub version: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerEvent {
    pub id: String,
    pub pallet_name: String,
    pub event_name: String,
    pub index_in_block: Option<Value>,
    pub block: ExplorerBlockRef,
    pub extrinsic: Option<IdRef>,
    pub call: Option<IdRef>,
    pub args_str: Option<Value>,
}

/// Explorer `itemsCounterById` row.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsCounter {
    pub total: Option<Value>,
}

/// `argsStr` is JSON serialized as a string; keep it verbatim if it is not.
fn decode_args(args: Option<Value>) -> Value {
    match args {
        Some(Value::String(s)) => serde_json::from_str(&s).unwrap_or(Value::String(s)),
        Some(other) => other,
        None => Value::Null,
    }
}

pub fn normalize_block(raw: ExplorerBlock) -> DomainResult<Block> {
    Ok(Block {
        height: require(parse_u64(&raw.height), "height")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        id: raw.id,
        hash: raw.hash,
        parent_hash: raw.parent_hash,
        validator: raw.validator,
        spec_version: raw.spec_version,
        runtime_spec: None,
    })
}

/// The main call is the first entry of `calls`.
pub fn normalize_extrinsic(raw: ExplorerExtrinsic) -> DomainResult<Extrinsic> {
    let call = require(raw.calls.into_iter().next(), "calls[0]")?;
    let signer = raw.signer_public_key.filter(|key| !key.is_empty());

    Ok(Extrinsic {
        block_height: require(parse_u64(&raw.block.height), "block.height")?,
        timestamp: opt_timestamp(raw.block.timestamp.as_ref()),
        block_id: Some(raw.block.id),
        id: raw.id,
        hash: raw.extrinsic_hash,
        index_in_block: opt_u32(raw.index_in_block.as_ref()),
        pallet: call.pallet_name,
        call: call.call_name,
        args: decode_args(call.args_str),
        is_signed: Some(signer.is_some()),
        signer,
        success: raw.success,
        nonce: None,
        tip: opt_decimal(raw.tip.as_ref()),
        fee: opt_decimal(raw.fee.as_ref()),
        error: raw.error.filter(|e| !e.is_null()),
        version: opt_u32(raw.version.as_ref()),
        spec_version: raw.block.spec_version,
        runtime_spec: None,
    })
}

pub fn normalize_event(raw: ExplorerEvent) -> DomainResult<Event> {
    Ok(Event {
        block_height: require(parse_u64(&raw.block.height), "block.height")?,
        timestamp: opt_timestamp(raw.block.timestamp.as_ref()),
        block_id: Some(raw.block.id),
        id: raw.id,
        index_in_block: opt_u32(raw.index_in_block.as_ref()),
        pallet: raw.pallet_name,
        name: raw.event_name,
        extrinsic_id: raw.extrinsic.map(|e| e.id),
        call_id: raw.call.map(|c| c.id),
        args: decode_args(raw.args_str),
        spec_version: raw.block.spec_version,
        runtime_spec: None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn main_call_and_args_are_unpacked() {
        let raw: ExplorerExtrinsic = serde_json::from_value(json!({
            "id": "0000000100-000002-a1b2c",
            "extrinsicHash": "0xabc",
            "block": {"id": "0000000100-a1b2c", "height": 100, "timestamp": "2024-01-01T00:00:00.000Z", "specVersion": 7},
            "calls": [
                {"palletName": "Utility", "callName": "batch", "argsStr": "{\"calls\":[]}"},
                {"palletName": "Balances", "callName": "transfer", "argsStr": null}
            ],
            "indexInBlock": 2,
            "success": true,
            "signerPublicKey": "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"
        }))
        .unwrap();

        let extrinsic = normalize_extrinsic(raw).unwrap();

        assert_eq!(extrinsic.qualified_name(), "Utility.batch");
        assert_eq!(extrinsic.args, json!({"calls": []}));
        assert_eq!(extrinsic.hash.as_deref(), Some("0xabc"));
        assert_eq!(extrinsic.spec_version, 7);
        assert_eq!(extrinsic.is_signed, Some(true));
    }

    #[test]
    fn extrinsic_without_calls_is_rejected() {
        let raw: ExplorerExtrinsic = serde_json::from_value(json!({
            "id": "x",
            "block": {"id": "b", "height": 1, "specVersion": 1},
            "calls": []
        }))
        .unwrap();
        assert!(normalize_extrinsic(raw).is_err());
    }

    #[test]
    fn non_json_args_are_kept_as_text() {
        assert_eq!(decode_args(Some(json!("0x1234"))), json!("0x1234"));
        assert_eq!(decode_args(Some(json!("[1,2]"))), json!([1, 2]));
        assert_eq!(decode_args(None), Value::Null);
    }
}
