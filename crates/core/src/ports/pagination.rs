//! Pagination contract shared by every list view.
//!
//! Backends paginate two ways: Relay-style connections (`edges` + `pageInfo`)
//! and node lists (`nodes` + `pageInfo`). Both are reduced to one
//! [`ItemsResponse`] by [`extract_page`].

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Default page size for list views.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum page size accepted by any backend.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination parameters for list queries.
///
/// Offset-addressed backends read `offset`; cursor-addressed backends read
/// `cursor` and fall back to the first page when it is absent. Callers
/// never need to know which mode the selected backend uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequest {
    /// Number of items per page (> 0).
    pub limit: u32,
    /// Number of items to skip.
    pub offset: u64,
    /// Opaque cursor returned as `end_cursor` by the previous page.
    pub cursor: Option<String>,
}

impl Default for PaginationRequest {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
            cursor: None,
        }
    }
}

impl PaginationRequest {
    /// Offset-addressed page.
    pub fn new(limit: u32, offset: u64) -> DomainResult<Self> {
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(DomainError::InvalidPagination(format!(
                "limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
            )));
        }
        Ok(Self {
            limit,
            offset,
            cursor: None,
        })
    }

    /// Address the page by cursor instead of offset.
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Whether this request targets the first page.
    pub fn is_first_page(&self) -> bool {
        self.offset == 0 && self.cursor.is_none()
    }

    /// Numeric `after` cursor used by squid-style connection backends.
    ///
    /// These backends encode the offset itself as the cursor; the first
    /// page is requested with no cursor at all.
    pub fn offset_cursor(&self) -> Option<String> {
        (self.offset > 0).then(|| self.offset.to_string())
    }

    /// Request for the page following `response`.
    pub fn next_page(&self, response: &PaginationInfo) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset + u64::from(self.limit),
            cursor: response.end_cursor.clone().or_else(|| self.cursor.clone()),
        }
    }
}

/// Page information as reported by a backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// A single item in a connection.
#[derive(Debug, Clone, Deserialize)]
pub struct Edge<R> {
    pub node: R,
}

/// Raw list result in one of the two backend pagination styles.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BackendListShape<R> {
    /// Relay connection: `{ edges: [{ node }], pageInfo, totalCount? }`.
    Connection {
        edges: Vec<Edge<R>>,
        #[serde(rename = "pageInfo")]
        page_info: PageInfo,
        #[serde(rename = "totalCount", default)]
        total_count: Option<u64>,
    },
    /// Node list: `{ nodes: [...], pageInfo, totalCount? }`.
    List {
        nodes: Vec<R>,
        #[serde(rename = "pageInfo")]
        page_info: PageInfo,
        #[serde(rename = "totalCount", default)]
        total_count: Option<u64>,
    },
}

impl<R> BackendListShape<R> {
    /// Build a list shape from a flat array fetched with `limit + 1` rows.
    ///
    /// The extra row only signals that a next page exists; it is dropped
    /// by [`extract_page`].
    pub fn from_probe(rows: Vec<R>, request: &PaginationRequest) -> Self {
        let has_next_page = rows.len() > request.limit as usize;
        Self::List {
            nodes: rows,
            page_info: PageInfo {
                has_next_page,
                has_previous_page: request.offset > 0,
                start_cursor: None,
                end_cursor: None,
            },
            total_count: None,
        }
    }

    /// An empty page with no next page.
    pub fn empty() -> Self {
        Self::Connection {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count: None,
        }
    }

    /// Override the total count (e.g. from a separate counter query).
    pub fn with_total_count(mut self, count: Option<u64>) -> Self {
        match &mut self {
            Self::Connection { total_count, .. } | Self::List { total_count, .. } => {
                *total_count = count;
            }
        }
        self
    }
}

/// Canonical pagination state returned with every page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub limit: u32,
    pub offset: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
    /// Present only when the backend was asked for it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

/// One page of canonical items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemsResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationInfo,
}

impl<T> ItemsResponse<T> {
    /// Replace the items, keeping pagination untouched.
    pub fn with_data<U>(self, data: Vec<U>) -> ItemsResponse<U> {
        ItemsResponse {
            data,
            pagination: self.pagination,
        }
    }
}

/// Reduce a backend list result to an [`ItemsResponse`].
///
/// - every raw item goes through `normalize`, in backend order
/// - `has_next_page` is the backend's own value (never inferred from an
///   empty page), forced to `true` only when surplus items were dropped
/// - connections keep `has_previous_page` verbatim; node lists use it
///   verbatim for cursor requests and `offset > 0` otherwise
/// - `total_count` is carried through only if the backend returned it
pub fn extract_page<R, T, E>(
    raw: BackendListShape<R>,
    request: &PaginationRequest,
    mut normalize: impl FnMut(R) -> Result<T, E>,
) -> Result<ItemsResponse<T>, E> {
    let (items, page_info, total_count, has_previous_page) = match raw {
        BackendListShape::Connection {
            edges,
            page_info,
            total_count,
        } => {
            let has_previous_page = page_info.has_previous_page;
            let items: Vec<R> = edges.into_iter().map(|edge| edge.node).collect();
            (items, page_info, total_count, has_previous_page)
        }
        BackendListShape::List {
            nodes,
            page_info,
            total_count,
        } => {
            let has_previous_page = if request.cursor.is_some() {
                page_info.has_previous_page
            } else {
                request.offset > 0
            };
            (nodes, page_info, total_count, has_previous_page)
        }
    };

    let limit = request.limit as usize;
    let truncated = items.len() > limit;
    let data = items
        .into_iter()
        .take(limit)
        .map(&mut normalize)
        .collect::<Result<Vec<_>, E>>()?;

    Ok(ItemsResponse {
        data,
        pagination: PaginationInfo {
            limit: request.limit,
            offset: request.offset,
            has_next_page: page_info.has_next_page || truncated,
            has_previous_page,
            total_count,
            end_cursor: page_info.end_cursor,
        },
    })
}

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order (oldest first).
    Asc,
    /// Descending order (newest first).
    #[default]
    Desc,
}

impl OrderDirection {
    /// `ASC` / `DESC` suffix used in backend ordering enums.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}
