//! Shared utilities for backend adapters.
//!
//! Backends disagree on how they encode numbers (JSON numbers vs. BigInt
//! strings), timestamps (RFC 3339, naive datetimes, epoch millis) and
//! account ids. These helpers accept every variant seen in practice.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use chainlens_core::error::{DataResult, DomainError, DomainResult};
use chainlens_core::models::PublicKey;
use chainlens_core::ports::{
    BackendId, ListRequest, OrderDirection, QueryDocument, QueryExecutor,
};

// =============================================================================
// Query helpers
// =============================================================================

/// Execute `document` and deserialize the top-level `field` of `data`.
pub async fn fetch_field<T: DeserializeOwned>(
    executor: &dyn QueryExecutor,
    backend: BackendId,
    document: &QueryDocument,
    variables: Value,
    field: &str,
) -> DataResult<T> {
    let mut response = executor.execute(backend, document, variables).await?;
    Ok(response.take_field(field)?)
}

/// Squid ordering (`id_DESC`).
pub fn squid_order(order: OrderDirection) -> Value {
    Value::String(format!("id_{}", order.suffix()))
}

/// Variables of a squid connection query.
///
/// An explicit cursor wins; otherwise the offset is sent as the cursor.
pub fn connection_variables<F>(request: &ListRequest<F>, filter: Option<Value>) -> Value {
    let pagination = &request.pagination;
    json!({
        "first": pagination.limit,
        "after": pagination.cursor.clone().or_else(|| pagination.offset_cursor()),
        "filter": filter,
        "order": squid_order(request.order),
    })
}

/// Variables of a flat squid query fetching one extra row.
pub fn probe_variables<F>(request: &ListRequest<F>, filter: Option<Value>) -> Value {
    json!({
        "limit": request.pagination.limit.saturating_add(1),
        "offset": request.pagination.offset,
        "filter": filter,
        "order": squid_order(request.order),
    })
}

/// Turn a missing or unparsable required field into a decoding error.
pub fn require<T>(value: Option<T>, field: &str) -> DomainResult<T> {
    value.ok_or_else(|| DomainError::DecodingError(format!("missing or invalid field '{field}'")))
}

/// Split a `"Pallet.Item"` name, failing on an empty pallet.
pub fn split_name(name: &str) -> DomainResult<(String, String)> {
    let (pallet, item) = chainlens_core::models::split_qualified_name(name);
    if pallet.is_empty() {
        return Err(DomainError::DecodingError(format!("invalid qualified name '{name}'")));
    }
    Ok((pallet.to_string(), item.to_string()))
}

// =============================================================================
// Account parsing
// =============================================================================

/// Parse a public key from various JSON representations.
///
/// Handles multiple formats returned by indexers:
/// - Hex string: `"0x1234..."`
/// - Wrapped object: `{ "Id": "0x..." }` or `{ "__kind": "Id", "value": "0x..." }`
/// - Array wrapper: `["0x..."]`
/// - Byte array: `[b0, b1, ..., b31]`
pub fn parse_public_key(value: &Value) -> Option<PublicKey> {
    match value {
        Value::String(s) => PublicKey::from_hex(s).ok(),
        Value::Object(obj) => obj
            .get("Id")
            .or_else(|| obj.get("id"))
            .or_else(|| obj.get("value"))
            .and_then(parse_public_key),
        Value::Array(arr) => {
            if arr.len() == 1 {
                return parse_public_key(&arr[0]);
            }
            if arr.len() != 32 {
                return None;
            }
            let mut bytes = [0u8; 32];
            for (i, v) in arr.iter().enumerate() {
                bytes[i] = u8::try_from(v.as_u64()?).ok()?;
            }
            Some(PublicKey(bytes))
        }
        _ => None,
    }
}

/// Signer of an extrinsic signature payload.
///
/// The address is either a plain string (SS58 or hex) or a
/// `MultiAddress` object; keys are rendered as 0x hex.
pub fn parse_signer(signature: &Value) -> Option<String> {
    match signature.get("address")? {
        Value::String(s) => Some(s.clone()),
        other => {
            if let Some(key) = parse_public_key(other) {
                return Some(key.to_hex());
            }
            other.get("value").and_then(Value::as_str).map(str::to_string)
        }
    }
}

// =============================================================================
// Numeric parsing
// =============================================================================

/// Parse a u64 from JSON (number or numeric string).
pub fn parse_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Parse a u32 from JSON.
pub fn parse_u32(value: &Value) -> Option<u32> {
    parse_u64(value).and_then(|v| v.try_into().ok())
}

/// Parse an amount into a [`BigDecimal`] without going through `f64`.
pub fn parse_decimal(value: &Value) -> Option<BigDecimal> {
    match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// [`parse_u64`] over an optional field.
pub fn opt_u64(value: Option<&Value>) -> Option<u64> {
    value.and_then(parse_u64)
}

/// [`parse_u32`] over an optional field.
pub fn opt_u32(value: Option<&Value>) -> Option<u32> {
    value.and_then(parse_u32)
}

/// [`parse_decimal`] over an optional field.
pub fn opt_decimal(value: Option<&Value>) -> Option<BigDecimal> {
    value.and_then(parse_decimal)
}

// =============================================================================
// Timestamp parsing
// =============================================================================

/// Parse a block timestamp.
///
/// Accepts RFC 3339 strings, naive `YYYY-MM-DDTHH:MM:SS[.fff]` strings
/// (read as UTC), and epoch milliseconds as a number or numeric string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(from_millis),
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            s.parse::<i64>().ok().and_then(from_millis)
        }
        _ => None,
    }
}

/// [`parse_timestamp`] over an optional field.
pub fn opt_timestamp(value: Option<&Value>) -> Option<DateTime<Utc>> {
    value.and_then(parse_timestamp)
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chainlens_core::ports::{BlocksFilter, PaginationRequest};

    // -------------------------------------------------------------------------
    // Account parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_public_key_hex_string() {
        let hex = "0x".to_string() + &"ab".repeat(32);
        assert_eq!(parse_public_key(&json!(hex)).unwrap().0, [0xab; 32]);
    }

    #[test]
    fn test_parse_public_key_wrapped() {
        let hex = "0x".to_string() + &"ef".repeat(32);
        assert_eq!(parse_public_key(&json!({"Id": hex})).unwrap().0, [0xef; 32]);
        assert_eq!(
            parse_public_key(&json!({"__kind": "Id", "value": hex})).unwrap().0,
            [0xef; 32]
        );
        assert_eq!(parse_public_key(&json!([hex])).unwrap().0, [0xef; 32]);
    }

    #[test]
    fn test_parse_public_key_byte_array() {
        let bytes: Vec<u8> = (0..32).collect();
        let expected: [u8; 32] = (0..32).collect::<Vec<u8>>().try_into().unwrap();
        assert_eq!(parse_public_key(&json!(bytes)).unwrap().0, expected);
    }

    #[test]
    fn test_parse_public_key_rejects_invalid() {
        let short_hex = "0x".to_string() + &"ab".repeat(16);
        assert!(parse_public_key(&json!(short_hex)).is_none());
        assert!(parse_public_key(&json!("not_valid_hex")).is_none());
        assert!(parse_public_key(&json!(vec![300; 32])).is_none());
    }

    #[test]
    fn test_parse_signer_variants() {
        let ss58 = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
        assert_eq!(parse_signer(&json!({"address": ss58})).as_deref(), Some(ss58));

        let hex = "0x".to_string() + &"12".repeat(32);
        let multi = json!({"address": {"__kind": "Id", "value": hex}, "signature": {}});
        assert_eq!(parse_signer(&multi), Some(hex));

        assert!(parse_signer(&json!(null)).is_none());
    }

    // -------------------------------------------------------------------------
    // Numeric parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_u64() {
        assert_eq!(parse_u64(&json!(12345)), Some(12345));
        assert_eq!(parse_u64(&json!("67890")), Some(67890));
        assert_eq!(parse_u64(&json!(u64::MAX)), Some(u64::MAX));
        assert_eq!(parse_u64(&json!(-1)), None);
    }

    #[test]
    fn test_parse_u32() {
        assert_eq!(parse_u32(&json!("67890")), Some(67890));
        assert!(parse_u32(&json!(u64::MAX)).is_none());
    }

    // Test critique: les montants u128 ne passent jamais par f64
    #[test]
    fn test_parse_decimal_keeps_precision() {
        let max = u128::MAX.to_string();
        let parsed = parse_decimal(&json!(max)).unwrap();
        assert_eq!(parsed.to_string(), max);
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!("340282366920938463463374607431768211455")
        );

        let amount = "1234567890123456789012";
        assert_eq!(parse_decimal(&json!(amount)).unwrap().to_string(), amount);
        assert_eq!(parse_decimal(&json!(1000)).unwrap(), BigDecimal::from(1000u64));
        assert!(parse_decimal(&json!("abc")).is_none());
    }

    // -------------------------------------------------------------------------
    // Timestamp parsing tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp(&json!("2024-01-01T00:00:00.000Z")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-01-01T00:00:00")), Some(expected));
        assert_eq!(parse_timestamp(&json!("2024-01-01T00:00:00.000")), Some(expected));
        assert_eq!(parse_timestamp(&json!(1_704_067_200_000i64)), Some(expected));
        assert_eq!(parse_timestamp(&json!("1704067200000")), Some(expected));
        assert_eq!(parse_timestamp(&json!("yesterday")), None);
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Balances.transfer").unwrap(),
            ("Balances".to_string(), "transfer".to_string())
        );
        assert!(split_name(".transfer").is_err());
    }

    #[test]
    fn test_connection_variables_use_offset_as_cursor() {
        let first: ListRequest<BlocksFilter> = ListRequest::default();
        let vars = connection_variables(&first, None);
        assert_eq!(vars["first"], 10);
        assert!(vars["after"].is_null());
        assert_eq!(vars["order"], "id_DESC");

        let third = ListRequest::<BlocksFilter>::new(
            None,
            OrderDirection::Asc,
            PaginationRequest::new(10, 20).unwrap(),
        );
        let vars = connection_variables(&third, Some(json!({"id_eq": "x"})));
        assert_eq!(vars["after"], "20");
        assert_eq!(vars["order"], "id_ASC");
        assert_eq!(vars["filter"], json!({"id_eq": "x"}));
    }

    #[test]
    fn test_probe_variables_fetch_one_extra_row() {
        let request = ListRequest::<BlocksFilter>::new(
            None,
            OrderDirection::Desc,
            PaginationRequest::new(25, 50).unwrap(),
        );
        let vars = probe_variables(&request, None);
        assert_eq!(vars["limit"], 26);
        assert_eq!(vars["offset"], 50);
    }

    #[test]
    fn test_probe_variables_saturate_unchecked_limit() {
        let pagination: PaginationRequest =
            serde_json::from_value(json!({"limit": u32::MAX, "offset": 0, "cursor": null})).unwrap();
        let request = ListRequest::<BlocksFilter>::new(None, OrderDirection::Asc, pagination);

        let vars = probe_variables(&request, None);

        assert_eq!(vars["limit"], u32::MAX);
    }
}
