//! Explorer squid documents and filter translation.

use serde_json::{Value, json};

use chainlens_core::models::PublicKey;
use chainlens_core::ports::{BlocksFilter, EventsFilter, QueryDocument};

macro_rules! block_fields {
    () => {
        "id hash height timestamp parentHash validator specVersion"
    };
}

macro_rules! extrinsic_fields {
    () => {
        "id block { id height timestamp specVersion } \
         calls { callName palletName argsStr } \
         indexInBlock success tip fee signerPublicKey error version extrinsicHash"
    };
}

macro_rules! event_fields {
    () => {
        "id palletName eventName indexInBlock argsStr \
         block { id height timestamp specVersion } extrinsic { id } call { id }"
    };
}

macro_rules! page_info {
    () => {
        "pageInfo { endCursor hasNextPage hasPreviousPage startCursor }\n    # totalCount\n"
    };
}

pub const BLOCK: QueryDocument = QueryDocument::new(concat!(
    "query Block($filter: BlockWhereInput) {\n",
    "  blocks(limit: 1, offset: 0, where: $filter, orderBy: id_DESC) { ",
    block_fields!(),
    " }\n}"
));

pub const BLOCKS_CONNECTION: QueryDocument = QueryDocument::new(concat!(
    "query Blocks($first: Int!, $after: String, $filter: BlockWhereInput, $order: [BlockOrderByInput!]!) {\n",
    "  blocksConnection(first: $first, after: $after, where: $filter, orderBy: $order) {\n",
    "    edges { node { ",
    block_fields!(),
    " } }\n    ",
    page_info!(),
    "  }\n}"
));

pub const EXTRINSIC: QueryDocument = QueryDocument::new(concat!(
    "query Extrinsic($filter: ExtrinsicWhereInput) {\n",
    "  extrinsics(limit: 1, offset: 0, where: $filter, orderBy: id_DESC) { ",
    extrinsic_fields!(),
    " }\n}"
));

pub const EXTRINSICS_CONNECTION: QueryDocument = QueryDocument::new(concat!(
    "query Extrinsics($first: Int!, $after: String, $filter: ExtrinsicWhereInput, $order: [ExtrinsicOrderByInput!]!) {\n",
    "  extrinsicsConnection(first: $first, after: $after, where: $filter, orderBy: $order) {\n",
    "    edges { node { ",
    extrinsic_fields!(),
    " } }\n    ",
    page_info!(),
    "  }\n}"
));

/// Name-filtered extrinsics; the total comes from the items counter.
pub const EXTRINSICS_BY_NAME: QueryDocument = QueryDocument::new(concat!(
    "query ExtrinsicsByName($first: Int!, $after: String, $filter: ExtrinsicWhereInput, $counterId: String!, $order: [ExtrinsicOrderByInput!]!) {\n",
    "  extrinsicsConnection(first: $first, after: $after, where: $filter, orderBy: $order) {\n",
    "    edges { node { ",
    extrinsic_fields!(),
    " } }\n",
    "    pageInfo { endCursor hasNextPage hasPreviousPage startCursor }\n",
    "  }\n",
    "  itemsCounterById(id: $counterId) { total }\n}"
));

pub const EVENT: QueryDocument = QueryDocument::new(concat!(
    "query Event($filter: EventWhereInput) {\n",
    "  events(limit: 1, offset: 0, where: $filter, orderBy: id_DESC) { ",
    event_fields!(),
    " }\n}"
));

pub const EVENTS_CONNECTION: QueryDocument = QueryDocument::new(concat!(
    "query Events($first: Int!, $after: String, $filter: EventWhereInput, $order: [EventOrderByInput!]!) {\n",
    "  eventsConnection(first: $first, after: $after, where: $filter, orderBy: $order) {\n",
    "    edges { node { ",
    event_fields!(),
    " } }\n    ",
    page_info!(),
    "  }\n}"
));

// =============================================================================
// Filters
// =============================================================================

pub fn block_filter(filter: &BlocksFilter) -> Value {
    match filter {
        BlocksFilter::Id(id) => json!({ "id_eq": id }),
        BlocksFilter::Hash(hash) => json!({ "hash_eq": hash }),
        BlocksFilter::Height(height) => json!({ "height_eq": height }),
    }
}

pub fn event_filter(filter: &EventsFilter) -> Value {
    match filter {
        EventsFilter::Id(id) => json!({ "id_eq": id }),
        EventsFilter::BlockId(id) => json!({ "block": { "id_eq": id } }),
        EventsFilter::BlockHeight(height) => json!({ "block": { "height_eq": height } }),
        EventsFilter::ExtrinsicId(id) => json!({ "extrinsic": { "id_eq": id } }),
        EventsFilter::CallId(id) => json!({ "call": { "id_eq": id } }),
        EventsFilter::Name { pallet, event: Some(event) } => {
            json!({ "palletName_eq": pallet, "eventName_eq": event })
        }
        EventsFilter::Name { pallet, event: None } => json!({ "palletName_eq": pallet }),
    }
}

/// Main call filter and matching items counter id.
pub fn main_call_filter(pallet: &str, call: Option<&str>) -> (Value, String) {
    match call {
        Some(call) => (
            json!({ "mainCall": { "palletName_eq": pallet, "callName_eq": call } }),
            format!("Extrinsics.{pallet}.{call}"),
        ),
        None => (
            json!({ "mainCall": { "palletName_eq": pallet } }),
            format!("Extrinsics.{pallet}"),
        ),
    }
}

pub fn signer_filter(key: &PublicKey) -> Value {
    json!({ "signerPublicKey_eq": key.to_hex() })
}
