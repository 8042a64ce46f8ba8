//! Archive (squid) documents and filter translation.
//!
//! The dictionary backend exposes the same entities as flat arrays, so
//! the flat documents live here too.

use serde_json::{Value, json};

use chainlens_core::models::qualified_name;
use chainlens_core::ports::{BlocksFilter, EventsFilter, ExtrinsicsFilter, QueryDocument};

macro_rules! block_fields {
    () => {
        "id hash height timestamp parentHash validator spec { specVersion }"
    };
}

macro_rules! extrinsic_fields {
    () => {
        "id hash call { name args } \
         block { id height timestamp spec { specVersion } } \
         signature indexInBlock success tip fee error version"
    };
}

macro_rules! event_fields {
    () => {
        "id name indexInBlock args \
         block { id height timestamp spec { specVersion } } \
         extrinsic { id } call { id }"
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

// Flat arrays, fetched with `limit + 1` rows to detect a next page.

pub const BLOCKS_FLAT: QueryDocument = QueryDocument::new(concat!(
    "query Blocks($limit: Int!, $offset: Int!, $filter: BlockWhereInput, $order: [BlockOrderByInput!]) {\n",
    "  blocks(limit: $limit, offset: $offset, where: $filter, orderBy: $order) { ",
    block_fields!(),
    " }\n}"
));

pub const EXTRINSICS_FLAT: QueryDocument = QueryDocument::new(concat!(
    "query Extrinsics($limit: Int!, $offset: Int!, $filter: ExtrinsicWhereInput, $order: [ExtrinsicOrderByInput!]) {\n",
    "  extrinsics(limit: $limit, offset: $offset, where: $filter, orderBy: $order) { ",
    extrinsic_fields!(),
    " }\n}"
));

pub const EVENTS_FLAT: QueryDocument = QueryDocument::new(concat!(
    "query Events($limit: Int!, $offset: Int!, $filter: EventWhereInput, $order: [EventOrderByInput!]) {\n",
    "  events(limit: $limit, offset: $offset, where: $filter, orderBy: $order) { ",
    event_fields!(),
    " }\n}"
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

pub fn extrinsic_filter(filter: &ExtrinsicsFilter) -> Value {
    match filter {
        ExtrinsicsFilter::Id(id) => json!({ "id_eq": id }),
        ExtrinsicsFilter::Hash(hash) => json!({ "hash_eq": hash }),
        ExtrinsicsFilter::BlockId(id) => json!({ "block": { "id_eq": id } }),
        ExtrinsicsFilter::BlockHeight(height) => json!({ "block": { "height_eq": height } }),
        ExtrinsicsFilter::Name { pallet, call } => json!({ "call": name_filter(pallet, call.as_deref()) }),
        ExtrinsicsFilter::Signer(address) => signer_filter(address),
    }
}

pub fn event_filter(filter: &EventsFilter) -> Value {
    match filter {
        EventsFilter::Id(id) => json!({ "id_eq": id }),
        EventsFilter::BlockId(id) => json!({ "block": { "id_eq": id } }),
        EventsFilter::BlockHeight(height) => json!({ "block": { "height_eq": height } }),
        EventsFilter::ExtrinsicId(id) => json!({ "extrinsic": { "id_eq": id } }),
        EventsFilter::CallId(id) => json!({ "call": { "id_eq": id } }),
        EventsFilter::Name { pallet, event } => name_filter(pallet, event.as_deref()),
    }
}

/// Exact match on `"Pallet.item"`, prefix match for a bare pallet.
fn name_filter(pallet: &str, item: Option<&str>) -> Value {
    match item {
        Some(item) => json!({ "name_eq": qualified_name(pallet, item) }),
        None => json!({ "name_startsWith": format!("{pallet}.") }),
    }
}

/// The signature JSON stores the address either bare or as a `MultiAddress`.
fn signer_filter(address: &str) -> Value {
    json!({
        "OR": [
            { "signature_jsonContains": format!(r#"{{"address": "{address}" }}"#) },
            { "signature_jsonContains": format!(r#"{{"address": {{ "value": "{address}"}} }}"#) },
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_count_marker_is_present() {
        for doc in [BLOCKS_CONNECTION, EXTRINSICS_CONNECTION, EVENTS_CONNECTION] {
            assert!(doc.as_str().contains("# totalCount"));
            let with_count = doc.with_total_count(true);
            assert!(with_count.as_str().contains("totalCount"));
            assert!(!with_count.as_str().contains("# totalCount"));
        }
    }

    #[test]
    fn extrinsic_filters() {
        let by_name = ExtrinsicsFilter::Name {
            pallet: "Balances".into(),
            call: Some("transfer".into()),
        };
        assert_eq!(extrinsic_filter(&by_name), json!({ "call": { "name_eq": "Balances.transfer" } }));

        let by_pallet = ExtrinsicsFilter::Name {
            pallet: "Balances".into(),
            call: None,
        };
        assert_eq!(
            extrinsic_filter(&by_pallet),
            json!({ "call": { "name_startsWith": "Balances." } })
        );

        assert_eq!(
            extrinsic_filter(&ExtrinsicsFilter::BlockHeight(100)),
            json!({ "block": { "height_eq": 100 } })
        );
    }

    #[test]
    fn signer_filter_covers_both_signature_layouts() {
        let filter = extrinsic_filter(&ExtrinsicsFilter::Signer("5Grw".into()));
        let alternatives = filter["OR"].as_array().unwrap();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0]["signature_jsonContains"], r#"{"address": "5Grw" }"#);
        assert_eq!(
            alternatives[1]["signature_jsonContains"],
            r#"{"address": { "value": "5Grw"} }"#
        );
    }

    #[test]
    fn event_filters() {
        assert_eq!(
            event_filter(&EventsFilter::CallId("c1".into())),
            json!({ "call": { "id_eq": "c1" } })
        );
        let by_name = EventsFilter::Name {
            pallet: "System".into(),
            event: Some("ExtrinsicSuccess".into()),
        };
        assert_eq!(event_filter(&by_name), json!({ "name_eq": "System.ExtrinsicSuccess" }));
    }
}
