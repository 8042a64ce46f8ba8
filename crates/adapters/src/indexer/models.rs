//! Indexer (SubQuery) node shapes.
//!
//! Numbers arrive as BigInt strings; names are split into `module` and
//! `call`/`event` columns already.

use serde::Deserialize;
use serde_json::Value;

use chainlens_core::error::DomainResult;
use chainlens_core::models::{Balance, Block, Event, Extrinsic, Transfer};

use crate::utils::{
    opt_decimal, opt_timestamp, opt_u32, opt_u64, parse_decimal, parse_u32, parse_u64, require,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerBlock {
    pub id: String,
    pub hash: String,
    pub height: Value,
    pub timestamp: Option<Value>,
    pub parent_hash: Option<String>,
    pub validator: Option<String>,
    pub spec_version: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerExtrinsic {
    pub id: String,
    pub module: String,
    pub call: String,
    pub block_height: Value,
    pub block_id: Option<String>,
    pub success: Option<bool>,
    pub is_signed: Option<bool>,
    pub extrinsic_hash: Option<String>,
    pub args: Option<Value>,
    pub nonce: Option<Value>,
    pub signer: Option<String>,
    pub version: Option<Value>,
    pub tip: Option<Value>,
    pub timestamp: Option<Value>,
    pub spec_version: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerEvent {
    pub id: String,
    pub module: String,
    pub event: String,
    pub block_height: Value,
    pub data: Option<Value>,
    pub extrinsic_id: Option<String>,
    pub timestamp: Option<Value>,
    pub spec_version: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerTransfer {
    pub id: String,
    pub from: String,
    pub to: String,
    pub amount: Value,
    pub block_number: Value,
    pub extrinsic_id: Option<Value>,
    pub timestamp: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexerAccount {
    pub address: String,
    pub balance_free: Option<Value>,
    pub balance_staked: Option<Value>,
    pub balance_total: Option<Value>,
    pub created_at: Option<Value>,
    pub updated_at: Option<Value>,
}

pub fn normalize_block(raw: IndexerBlock) -> DomainResult<Block> {
    Ok(Block {
        height: require(parse_u64(&raw.height), "height")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        spec_version: require(parse_u32(&raw.spec_version), "specVersion")?,
        id: raw.id,
        hash: raw.hash,
        parent_hash: raw.parent_hash,
        validator: raw.validator,
        runtime_spec: None,
    })
}

pub fn normalize_extrinsic(raw: IndexerExtrinsic) -> DomainResult<Extrinsic> {
    Ok(Extrinsic {
        block_height: require(parse_u64(&raw.block_height), "blockHeight")?,
        spec_version: require(parse_u32(&raw.spec_version), "specVersion")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        id: raw.id,
        block_id: raw.block_id,
        hash: raw.extrinsic_hash,
        index_in_block: None,
        pallet: raw.module,
        call: raw.call,
        args: raw.args.unwrap_or(Value::Null),
        signer: raw.signer.filter(|s| !s.is_empty()),
        success: raw.success,
        is_signed: raw.is_signed,
        nonce: opt_u64(raw.nonce.as_ref()),
        tip: opt_decimal(raw.tip.as_ref()),
        fee: None,
        error: None,
        version: opt_u32(raw.version.as_ref()),
        runtime_spec: None,
    })
}

pub fn normalize_event(raw: IndexerEvent) -> DomainResult<Event> {
    Ok(Event {
        block_height: require(parse_u64(&raw.block_height), "blockHeight")?,
        spec_version: require(parse_u32(&raw.spec_version), "specVersion")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        id: raw.id,
        block_id: None,
        index_in_block: None,
        pallet: raw.module,
        name: raw.event,
        extrinsic_id: raw.extrinsic_id,
        call_id: None,
        args: raw.data.unwrap_or(Value::Null),
        runtime_spec: None,
    })
}

pub fn normalize_transfer(raw: IndexerTransfer) -> DomainResult<Transfer> {
    Ok(Transfer {
        block_height: require(parse_u64(&raw.block_number), "blockNumber")?,
        amount: require(parse_decimal(&raw.amount), "amount")?,
        timestamp: opt_timestamp(raw.timestamp.as_ref()),
        extrinsic_id: raw.extrinsic_id.and_then(|id| match id {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }),
        id: raw.id,
        extrinsic_hash: None,
        from: raw.from,
        to: raw.to,
        success: None,
        account: None,
        direction: None,
    })
}

pub fn normalize_balance(raw: IndexerAccount) -> DomainResult<Balance> {
    Ok(Balance {
        id: raw.address.clone(),
        free: opt_decimal(raw.balance_free.as_ref()),
        staked: opt_decimal(raw.balance_staked.as_ref()),
        total: opt_decimal(raw.balance_total.as_ref()),
        created_at: opt_u64(raw.created_at.as_ref()),
        updated_at: opt_u64(raw.updated_at.as_ref()),
        address: raw.address,
    })
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;
    use serde_json::json;

    use super::*;
    use crate::archive::{ArchiveBlock, normalize_block as normalize_archive_block};

    // Test critique: un bloc archive et un bloc indexer à la hauteur 100 donnent le même bloc canonique
    #[test]
    fn archive_and_indexer_blocks_agree() {
        let archive: ArchiveBlock = serde_json::from_value(json!({
            "id": "0000000100-a1b2c",
            "hash": "0xaaaa",
            "height": 100,
            "timestamp": "2024-01-01T00:00:00.000Z",
            "parentHash": "0xbbbb",
            "validator": "5Grw",
            "spec": {"specVersion": 7}
        }))
        .unwrap();
        let indexer: IndexerBlock = serde_json::from_value(json!({
            "id": "0000000100-a1b2c",
            "hash": "0xaaaa",
            "height": "100",
            "timestamp": "2024-01-01T00:00:00",
            "parentHash": "0xbbbb",
            "validator": "5Grw",
            "specVersion": "7"
        }))
        .unwrap();

        let from_archive = normalize_archive_block(archive).unwrap();
        let from_indexer = normalize_block(indexer).unwrap();

        assert_eq!(from_archive, from_indexer);
        assert_eq!(from_indexer.height, 100);
    }

    #[test]
    fn extrinsic_columns_map_directly() {
        let raw: IndexerExtrinsic = serde_json::from_value(json!({
            "id": "100-2",
            "module": "balances",
            "call": "transferKeepAlive",
            "blockHeight": "100",
            "blockId": "100",
            "success": true,
            "isSigned": true,
            "extrinsicHash": "0xabc",
            "args": ["0x01", "1000"],
            "nonce": 5,
            "signer": "5Grw",
            "version": 4,
            "tip": "0",
            "timestamp": "2024-01-01T00:00:00",
            "specVersion": 7
        }))
        .unwrap();

        let extrinsic = normalize_extrinsic(raw).unwrap();

        assert_eq!(extrinsic.qualified_name(), "balances.transferKeepAlive");
        assert_eq!(extrinsic.nonce, Some(5));
        assert_eq!(extrinsic.tip, Some(BigDecimal::from(0u64)));
        assert!(extrinsic.fee.is_none());
        assert!(extrinsic.index_in_block.is_none());
    }

    #[test]
    fn balance_amounts_stay_exact() {
        let raw: IndexerAccount = serde_json::from_value(json!({
            "address": "5Grw",
            "balanceFree": "123456789012345678901",
            "balanceStaked": null,
            "balanceTotal": "340282366920938463463374607431768211455",
            "createdAt": "10",
            "updatedAt": 20
        }))
        .unwrap();

        let balance = normalize_balance(raw).unwrap();

        assert_eq!(balance.id, "5Grw");
        assert_eq!(balance.free.unwrap().to_string(), "123456789012345678901");
        assert!(balance.staked.is_none());
        assert_eq!(balance.total.unwrap().to_string(), u128::MAX.to_string());
        assert_eq!((balance.created_at, balance.updated_at), (Some(10), Some(20)));
    }

    #[test]
    fn transfer_requires_amount() {
        let raw: IndexerTransfer = serde_json::from_value(json!({
            "id": "t1",
            "from": "a",
            "to": "b",
            "amount": "oops",
            "blockNumber": 1
        }))
        .unwrap();
        assert!(normalize_transfer(raw).is_err());
    }
}
