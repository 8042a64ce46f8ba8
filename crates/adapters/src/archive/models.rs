//! Archive wire shapes and their normalization.
//!
//! The dictionary backend serves the same shapes from flat arrays, so
//! these normalizers are shared with it.

use serde::Deserialize;
use serde_json::Value;

use chainlens_core::error::DomainResult;
use chainlens_core::models::{Block, Event, Extrinsic};

use crate::utils::{
    opt_decimal, opt_timestamp, opt_u32, parse_signer, parse_u64, require, split_name,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRef {
    pub spec_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBlock {
    pub id: String,
    pub hash: String,
    pub height: Value,
    pub timestamp: Option<Value>,
    pub parent_hash: Option<String>,
    pub validator: Option<String>,
    pub spec: SpecRef,
}

/// Block summary nested in extrinsics and events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveBlockRef {
    pub id: String,
    pub height: Value,
    pub timestamp: Option<Value>,
    pub spec: SpecRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveCall {
    /// `"Pallet.call"`.
    pub name: String,
    pub args: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveExtrinsic {
    pub id: String,
    pub hash: Option<String>,
    pub call: Option<ArchiveCall>,
    pub block: ArchiveBlockRef,
    pub signature: Option<Value>,
    pub index_in_block: Option<Value>,
    pub success: Option<bool>,
    pub tip: Option<Value>,
    pub fee: Option<Value>,
    pub error: Option<Value>,
    pub version: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEvent {
    pub id: String,
    /// `"Pallet.Event"`.
    pub name: String,
    pub block: ArchiveBlockRef,
    pub extrinsic: Option<IdRef>,
    pub call: Option<IdRef>,
    pub index_in_block: Option<Value>,
    pub args: Option<Value>,
}

pub fn normalize_block(raw: ArchiveBlock) -> DomainResult<Block> {
    Ok(Block {
        height: require(parse_u64(&raw.height), "height")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        id: raw.id,
        hash: raw.hash,
        parent_hash: raw.parent_hash,
        validator: raw.validator,
        spec_version: raw.spec.spec_version,
        runtime_spec: None,
    })
}

pub fn normalize_extrinsic(raw: ArchiveExtrinsic) -> DomainResult<Extrinsic> {
    let call = require(raw.call, "call")?;
    let (pallet, call_name) = split_name(&call.name)?;
    let signature = raw.signature.filter(|s| !s.is_null());

    Ok(Extrinsic {
        block_height: require(parse_u64(&raw.block.height), "block.height")?,
        timestamp: opt_timestamp(raw.block.timestamp.as_ref()),
        block_id: Some(raw.block.id),
        id: raw.id,
        hash: raw.hash,
        index_in_block: opt_u32(raw.index_in_block.as_ref()),
        pallet,
        call: call_name,
        args: call.args.unwrap_or(Value::Null),
        signer: signature.as_ref().and_then(parse_signer),
        is_signed: Some(signature.is_some()),
        success: raw.success,
        nonce: None,
        tip: opt_decimal(raw.tip.as_ref()),
        fee: opt_decimal(raw.fee.as_ref()),
        error: raw.error.filter(|e| !e.is_null()),
        version: opt_u32(raw.version.as_ref()),
        spec_version: raw.block.spec.spec_version,
        runtime_spec: None,
    })
}

pub fn normalize_event(raw: ArchiveEvent) -> DomainResult<Event> {
    let (pallet, name) = split_name(&raw.name)?;

    Ok(Event {
        block_height: require(parse_u64(&raw.block.height), "block.height")?,
        timestamp: opt_timestamp(raw.block.timestamp.as_ref()),
        block_id: Some(raw.block.id),
        id: raw.id,
        index_in_block: opt_u32(raw.index_in_block.as_ref()),
        pallet,
        name,
        extrinsic_id: raw.extrinsic.map(|e| e.id),
        call_id: raw.call.map(|c| c.id),
        args: raw.args.unwrap_or(Value::Null),
        spec_version: raw.block.spec.spec_version,
        runtime_spec: None,
    })
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use serde_json::json;

    use super::*;

    fn raw<T: serde::de::DeserializeOwned>(value: Value) -> T {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn extrinsic_is_flattened() {
        let extrinsic: ArchiveExtrinsic = raw(json!({
            "id": "0000000100-000002-a1b2c",
            "hash": "0xabc",
            "call": {"name": "Balances.transfer_keep_alive", "args": {"dest": "0x01", "value": "1000"}},
            "block": {"id": "0000000100-a1b2c", "height": 100, "timestamp": "2024-01-01T00:00:00.000Z", "spec": {"specVersion": 7}},
            "signature": {"address": {"__kind": "Id", "value": "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d"}},
            "indexInBlock": 2,
            "success": true,
            "tip": "0",
            "fee": "125000000",
            "error": null,
            "version": 4
        }));

        let extrinsic = normalize_extrinsic(extrinsic).unwrap();

        assert_eq!(extrinsic.pallet, "Balances");
        assert_eq!(extrinsic.call, "transfer_keep_alive");
        assert_eq!(extrinsic.qualified_name(), "Balances.transfer_keep_alive");
        assert_eq!(extrinsic.block_height, 100);
        assert_eq!(extrinsic.block_id.as_deref(), Some("0000000100-a1b2c"));
        assert_eq!(extrinsic.spec_version, 7);
        assert_eq!(extrinsic.fee, Some(BigDecimal::from(125_000_000u64)));
        assert_eq!(extrinsic.is_signed, Some(true));
        assert_eq!(
            extrinsic.signer.as_deref(),
            Some("0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d")
        );
        assert!(extrinsic.error.is_none());
        assert!(extrinsic.nonce.is_none());
    }

    #[test]
    fn unsigned_extrinsic_has_no_signer() {
        let extrinsic: ArchiveExtrinsic = raw(json!({
            "id": "0000000100-000000-a1b2c",
            "call": {"name": "Timestamp.set"},
            "block": {"id": "b", "height": "100", "spec": {"specVersion": 7}},
            "signature": null
        }));

        let extrinsic = normalize_extrinsic(extrinsic).unwrap();

        assert_eq!(extrinsic.is_signed, Some(false));
        assert!(extrinsic.signer.is_none());
        assert!(extrinsic.timestamp.is_none());
        assert_eq!(extrinsic.args, Value::Null);
    }

    #[test]
    fn event_name_is_split() {
        let event: ArchiveEvent = raw(json!({
            "id": "0000000100-000004-a1b2c",
            "name": "Balances.Transfer",
            "block": {"id": "b", "height": 100, "timestamp": null, "spec": {"specVersion": 7}},
            "extrinsic": {"id": "0000000100-000002-a1b2c"},
            "call": null,
            "args": {"amount": "1000"}
        }));

        let event = normalize_event(event).unwrap();

        assert_eq!((event.pallet.as_str(), event.name.as_str()), ("Balances", "Transfer"));
        assert_eq!(event.extrinsic_id.as_deref(), Some("0000000100-000002-a1b2c"));
        assert!(event.call_id.is_none());
        assert_eq!(event.args, json!({"amount": "1000"}));
    }

    #[test]
    fn missing_call_is_a_decoding_error() {
        let extrinsic: ArchiveExtrinsic = raw(json!({
            "id": "x",
            "block": {"id": "b", "height": 1, "spec": {"specVersion": 1}}
        }));
        assert!(normalize_extrinsic(extrinsic).is_err());
    }
}
