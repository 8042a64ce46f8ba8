//! Indexer documents and filter translation (PostGraphile filters).

use serde_json::{Value, json};

use chainlens_core::error::{DomainError, DomainResult};
use chainlens_core::models::PublicKey;
use chainlens_core::ports::{
    BalancesFilter, BlocksFilter, EventsFilter, ExtrinsicsFilter, ListRequest, QueryDocument,
};

macro_rules! list_query {
    ($name:literal, $entity:literal, $filter:literal, $order:literal, $fields:literal) => {
        QueryDocument::new(concat!(
            "query ",
            $name,
            "($first: Int!, $offset: Int, $after: Cursor, $filter: ",
            $filter,
            ", $order: [",
            $order,
            "!]) {\n  ",
            $entity,
            "(first: $first, offset: $offset, after: $after, filter: $filter, orderBy: $order) {\n",
            "    nodes { ",
            $fields,
            " }\n",
            "    pageInfo { endCursor hasNextPage hasPreviousPage }\n",
            "    # totalCount\n",
            "  }\n}"
        ))
    };
}

macro_rules! single_query {
    ($name:literal, $entity:literal, $filter:literal, $fields:literal) => {
        QueryDocument::new(concat!(
            "query ",
            $name,
            "($filter: ",
            $filter,
            ") {\n  ",
            $entity,
            "(first: 1, filter: $filter) { nodes { ",
            $fields,
            " } }\n}"
        ))
    };
}

pub const BLOCK: QueryDocument = single_query!(
    "Block",
    "blocks",
    "BlockFilter",
    "id hash height timestamp parentHash validator specVersion"
);

pub const BLOCKS: QueryDocument = list_query!(
    "Blocks",
    "blocks",
    "BlockFilter",
    "BlocksOrderBy",
    "id hash height timestamp parentHash validator specVersion"
);

pub const EXTRINSIC: QueryDocument = single_query!(
    "Extrinsic",
    "extrinsics",
    "ExtrinsicFilter",
    "id module call blockHeight success isSigned extrinsicHash args nonce signer version tip blockId timestamp specVersion"
);

pub const EXTRINSICS: QueryDocument = list_query!(
    "Extrinsics",
    "extrinsics",
    "ExtrinsicFilter",
    "ExtrinsicsOrderBy",
    "id module call blockHeight success isSigned extrinsicHash args nonce signer version tip blockId timestamp specVersion"
);

pub const EVENT: QueryDocument = single_query!(
    "Event",
    "events",
    "EventFilter",
    "id module event blockHeight data extrinsicId timestamp specVersion"
);

pub const EVENTS: QueryDocument = list_query!(
    "Events",
    "events",
    "EventFilter",
    "EventsOrderBy",
    "id module event blockHeight data extrinsicId timestamp specVersion"
);

pub const TRANSFERS: QueryDocument = list_query!(
    "Transfers",
    "transfers",
    "TransferFilter",
    "TransfersOrderBy",
    "id from to amount blockNumber extrinsicId timestamp"
);

pub const ACCOUNT: QueryDocument = single_query!(
    "Account",
    "accounts",
    "AccountFilter",
    "address balanceFree balanceStaked balanceTotal createdAt updatedAt"
);

pub const ACCOUNTS: QueryDocument = list_query!(
    "Accounts",
    "accounts",
    "AccountFilter",
    "AccountsOrderBy",
    "address balanceFree balanceStaked balanceTotal createdAt updatedAt"
);

// =============================================================================
// Variables
// =============================================================================

/// Variables of a node-list query.
///
/// A cursor request sends `after` and no offset; otherwise `offset`.
pub fn list_variables<F>(request: &ListRequest<F>, filter: Option<Value>, order: &[&str]) -> Value {
    let pagination = &request.pagination;
    let suffix = request.order.suffix();
    let order: Vec<String> = order.iter().map(|field| format!("{field}_{suffix}")).collect();

    match &pagination.cursor {
        Some(cursor) => json!({
            "first": pagination.limit,
            "after": cursor,
            "filter": filter,
            "order": order,
        }),
        None => json!({
            "first": pagination.limit,
            "offset": pagination.offset,
            "filter": filter,
            "order": order,
        }),
    }
}

pub const BLOCK_ORDER: &[&str] = &["HEIGHT"];
pub const ITEM_ORDER: &[&str] = &["BLOCK_HEIGHT", "ID"];
pub const TRANSFER_ORDER: &[&str] = &["BLOCK_NUMBER", "ID"];
pub const ACCOUNT_ORDER: &[&str] = &["ID"];

// =============================================================================
// Filters
// =============================================================================

fn equal_to(value: impl Into<Value>) -> Value {
    json!({ "equalTo": value.into() })
}

/// Match either encoding of an account.
fn either_encoding(address: &str, key: &PublicKey) -> Value {
    json!({ "in": [address, key.to_hex()] })
}

pub fn block_filter(filter: &BlocksFilter) -> Value {
    match filter {
        BlocksFilter::Id(id) => json!({ "id": equal_to(id.as_str()) }),
        BlocksFilter::Hash(hash) => json!({ "hash": equal_to(hash.as_str()) }),
        BlocksFilter::Height(height) => json!({ "height": equal_to(*height) }),
    }
}

/// `key` is the decoded signer when the filter is [`ExtrinsicsFilter::Signer`].
pub fn extrinsic_filter(filter: &ExtrinsicsFilter, key: Option<&PublicKey>) -> DomainResult<Value> {
    Ok(match filter {
        ExtrinsicsFilter::Id(id) => json!({ "id": equal_to(id.as_str()) }),
        ExtrinsicsFilter::Hash(hash) => json!({ "extrinsicHash": equal_to(hash.as_str()) }),
        ExtrinsicsFilter::BlockId(id) => json!({ "blockId": equal_to(id.as_str()) }),
        ExtrinsicsFilter::BlockHeight(height) => json!({ "blockHeight": equal_to(*height) }),
        ExtrinsicsFilter::Name { pallet, call } => {
            let mut filter = json!({ "module": { "equalToInsensitive": pallet } });
            if let Some(call) = call {
                filter["call"] = json!({ "equalToInsensitive": call });
            }
            filter
        }
        ExtrinsicsFilter::Signer(address) => {
            let key = key.ok_or_else(|| DomainError::InvalidAddress(address.clone()))?;
            json!({ "signer": either_encoding(address, key) })
        }
    })
}

pub fn event_filter(filter: &EventsFilter) -> DomainResult<Value> {
    Ok(match filter {
        EventsFilter::Id(id) => json!({ "id": equal_to(id.as_str()) }),
        EventsFilter::BlockHeight(height) => json!({ "blockHeight": equal_to(*height) }),
        EventsFilter::ExtrinsicId(id) => json!({ "extrinsicId": equal_to(id.as_str()) }),
        EventsFilter::Name { pallet, event } => {
            let mut filter = json!({ "module": { "equalToInsensitive": pallet } });
            if let Some(event) = event {
                filter["event"] = json!({ "equalToInsensitive": event });
            }
            filter
        }
        EventsFilter::BlockId(_) | EventsFilter::CallId(_) => {
            return Err(DomainError::InvalidFilter(format!(
                "indexer events cannot be filtered by {filter:?}"
            )));
        }
    })
}

pub fn transfer_filter(address: &str, key: &PublicKey) -> Value {
    json!({
        "or": [
            { "from": either_encoding(address, key) },
            { "to": either_encoding(address, key) },
        ]
    })
}

pub fn balance_filter(filter: &BalancesFilter) -> Value {
    match filter {
        BalancesFilter::Address(address) => json!({ "address": equal_to(address.as_str()) }),
    }
}

#[cfg(test)]
mod tests {
    use chainlens_core::ports::{OrderDirection, PaginationRequest};

    use super::*;

    #[test]
    fn offset_and_cursor_are_exclusive() {
        let by_offset: ListRequest<BlocksFilter> = ListRequest::new(
            None,
            OrderDirection::Desc,
            PaginationRequest::new(10, 30).unwrap(),
        );
        let vars = list_variables(&by_offset, None, ITEM_ORDER);
        assert_eq!(vars["offset"], 30);
        assert!(vars.get("after").is_none());
        assert_eq!(vars["order"], json!(["BLOCK_HEIGHT_DESC", "ID_DESC"]));

        let by_cursor: ListRequest<BlocksFilter> = ListRequest::new(
            None,
            OrderDirection::Asc,
            PaginationRequest::default().with_cursor("WyJwcmltYXJ5X2tleV9hc2MiLFsxMDBdXQ=="),
        );
        let vars = list_variables(&by_cursor, None, BLOCK_ORDER);
        assert!(vars.get("offset").is_none());
        assert_eq!(vars["after"], "WyJwcmltYXJ5X2tleV9hc2MiLFsxMDBdXQ==");
        assert_eq!(vars["order"], json!(["HEIGHT_ASC"]));
    }

    #[test]
    fn unsupported_event_filters_are_rejected() {
        let err = event_filter(&EventsFilter::CallId("c".into())).unwrap_err();
        assert!(matches!(err, DomainError::InvalidFilter(_)));
    }

    #[test]
    fn name_filter_is_case_insensitive() {
        let filter = extrinsic_filter(
            &ExtrinsicsFilter::Name {
                pallet: "Balances".into(),
                call: Some("transfer".into()),
            },
            None,
        )
        .unwrap();
        assert_eq!(
            filter,
            json!({
                "module": { "equalToInsensitive": "Balances" },
                "call": { "equalToInsensitive": "transfer" }
            })
        );
    }

    #[test]
    fn transfer_filter_matches_both_sides() {
        let key = PublicKey([1; 32]);
        let filter = transfer_filter("5Grw", &key);
        assert_eq!(filter["or"][0]["from"]["in"][0], "5Grw");
        assert_eq!(filter["or"][1]["to"]["in"][1], key.to_hex());
    }
}
