//! Pagination types for connection queries.
//!
//! These types implement Relay-style cursor pagination. They are the shared
//! contract between the server-side resolver and the client-side collection
//! controller, so they serialize with the GraphQL field names (`pageInfo`,
//! `totalCount`, ...).

use serde::{Deserialize, Serialize};

use crate::error::{ConnectionError, ConnectionResult};

/// Page size used when neither `first` nor `last` is supplied.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest page a single request may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Opaque cursor for pagination.
///
/// The cursor value is produced by a [`super::CursorCodec`] and should be
/// treated as an opaque token by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor {
    pub value: String,
}

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self { value }
    }
}

/// Pagination parameters for connection queries.
///
/// Supports forward pagination (`first`/`after`) and backward
/// pagination (`last`/`before`). Counts are kept signed so that
/// out-of-range input can be reported instead of silently wrapped.
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Number of items to fetch (forward pagination).
    pub first: Option<i32>,
    /// Cursor to start after (forward pagination).
    pub after: Option<Cursor>,
    /// Number of items to fetch (backward pagination).
    pub last: Option<i32>,
    /// Cursor to end before (backward pagination).
    pub before: Option<Cursor>,
}

impl Pagination {
    /// Forward pagination from the start of the collection.
    pub fn first(count: i32) -> Self {
        Self {
            first: Some(count),
            ..Default::default()
        }
    }

    /// Validate the arguments and settle on a direction and count.
    ///
    /// Supplying both `first` and `last` is a client programming error and
    /// fails before any query runs.
    pub fn page_request(&self, collection: &'static str) -> ConnectionResult<PageRequest> {
        let (direction, argument, requested) = match (self.first, self.last) {
            (Some(_), Some(_)) => {
                return Err(ConnectionError::ConflictingPageBounds { collection });
            }
            (Some(first), None) => (PageDirection::Forward, "first", first),
            (None, Some(last)) => (PageDirection::Backward, "last", last),
            (None, None) => (PageDirection::Forward, "first", DEFAULT_PAGE_SIZE as i32),
        };

        let count = usize::try_from(requested)
            .ok()
            .filter(|count| *count <= MAX_PAGE_SIZE)
            .ok_or(ConnectionError::InvalidPageSize {
                collection,
                argument,
                value: i64::from(requested),
                max: MAX_PAGE_SIZE,
            })?;

        Ok(PageRequest {
            direction,
            count,
            after: self.after.clone(),
            before: self.before.clone(),
        })
    }
}

/// Which end of the window a request pages from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    /// `first` items after the `after` cursor.
    Forward,
    /// `last` items before the `before` cursor.
    Backward,
}

/// Validated pagination arguments.
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub direction: PageDirection,
    /// Number of edges the caller asked for.
    pub count: usize,
    pub after: Option<Cursor>,
    pub before: Option<Cursor>,
}

/// Paginated result set with edges and page info.
///
/// This is the Relay connection pattern for cursor-based pagination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// List of edges (node + cursor pairs), never longer than the page size.
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
    /// Size of the full eligible set after search and filters.
    pub total_count: u64,
}

impl<T> Connection<T> {
    /// A connection with no edges.
    pub fn empty(total_count: u64) -> Self {
        Self {
            edges: Vec::new(),
            page_info: PageInfo::default(),
            total_count,
        }
    }

    /// Convert every node, keeping cursors and page info.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Connection<U> {
        Connection {
            edges: self
                .edges
                .into_iter()
                .map(|edge| Edge {
                    node: f(edge.node),
                    cursor: edge.cursor,
                })
                .collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }
}

/// A single item in a paginated result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<T> {
    /// The actual item.
    pub node: T,
    /// Cursor for this item, derived from the node's key.
    pub cursor: Cursor,
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor of the first item in this page.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in this page.
    pub end_cursor: Option<Cursor>,
}

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl OrderDirection {
    pub fn reversed(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Sort order for a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy<F> {
    pub field: F,
    pub direction: OrderDirection,
}

impl<F> OrderBy<F> {
    pub fn new(field: F, direction: OrderDirection) -> Self {
        Self { field, direction }
    }

    pub fn asc(field: F) -> Self {
        Self::new(field, OrderDirection::Asc)
    }

    pub fn desc(field: F) -> Self {
        Self::new(field, OrderDirection::Desc)
    }

    /// Direction the store scans in for the given page direction.
    ///
    /// Backward pages are selected by scanning from the far end, then put
    /// back into canonical order by the resolver.
    pub fn scan_direction(&self, page: PageDirection) -> OrderDirection {
        match page {
            PageDirection::Forward => self.direction,
            PageDirection::Backward => self.direction.reversed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_and_last_conflict() {
        let pagination = Pagination {
            first: Some(5),
            last: Some(5),
            ..Default::default()
        };
        let err = pagination.page_request("organizations").unwrap_err();
        assert!(matches!(err, ConnectionError::ConflictingPageBounds { .. }));
    }

    #[test]
    fn test_missing_bounds_default_to_forward_page() {
        let request = Pagination::default().page_request("domains").unwrap();
        assert_eq!(request.direction, PageDirection::Forward);
        assert_eq!(request.count, DEFAULT_PAGE_SIZE);
    }

    // Test critique: valeurs négatives ou trop grandes rejetées (DoS prevention)
    #[test]
    fn test_page_size_bounds() {
        let negative = Pagination::first(-1).page_request("users").unwrap_err();
        assert!(matches!(negative, ConnectionError::InvalidPageSize { value: -1, .. }));

        let too_big = Pagination {
            last: Some(MAX_PAGE_SIZE as i32 + 1),
            ..Default::default()
        };
        assert!(too_big.page_request("users").is_err());

        let zero = Pagination::first(0).page_request("users").unwrap();
        assert_eq!(zero.count, 0);
    }

    #[test]
    fn test_backward_scan_reverses_order() {
        let order = OrderBy::desc("name");
        assert_eq!(order.scan_direction(PageDirection::Forward), OrderDirection::Desc);
        assert_eq!(order.scan_direction(PageDirection::Backward), OrderDirection::Asc);
    }

    #[test]
    fn test_connection_serializes_graphql_names() {
        let conn: Connection<u32> = Connection {
            edges: vec![Edge {
                node: 7,
                cursor: Cursor::new("abc"),
            }],
            page_info: PageInfo {
                has_next_page: true,
                end_cursor: Some(Cursor::new("abc")),
                ..Default::default()
            },
            total_count: 3,
        };
        let json = serde_json::to_value(&conn).unwrap();
        assert_eq!(json["totalCount"], 3);
        assert_eq!(json["pageInfo"]["hasNextPage"], true);
        assert_eq!(json["pageInfo"]["endCursor"], "abc");
        assert_eq!(json["edges"][0]["cursor"], "abc");
    }
}
