//! Connection resolver - turns a permission-scoped collection into one page.
//!
//! # Flow
//!
//! 1. Validate paging arguments (`first` and `last` are mutually exclusive)
//! 2. Decode `after`/`before` cursors against the expected collection and ordering
//! 3. Compute the principal's eligible set
//! 4. Fetch `count + 1` rows; the extra row only signals that more data exists
//! 5. Truncate, restore canonical order, build edges and page info
//! 6. Count the full eligible set
//!
//! Either a complete, internally consistent connection is returned or the
//! whole request fails.

use tracing::{debug, error, instrument, warn};

use crate::error::{ConnectionError, ConnectionResult, StorageError};
use crate::metrics::{
    ResolveTimer, record_connection_error, record_connection_request, record_edges_returned,
};
use crate::models::{Principal, Record, RequestContext};
use crate::ports::{
    Base64CursorCodec, CollectionFilter, CollectionStore, Connection, Cursor, CursorCodec,
    CursorScope, Edge, EligibleSet, OrderBy, PageDirection, PageInfo, Pagination, Scope,
    ScopeResolver, WindowQuery,
};

/// Arguments of one connection request.
#[derive(Debug, Clone)]
pub struct ConnectionArgs<T: Record> {
    pub order_by: OrderBy<T::SortField>,
    pub filter: CollectionFilter<T::FilterField>,
    pub pagination: Pagination,
}

impl<T: Record> ConnectionArgs<T> {
    pub fn new(order_by: OrderBy<T::SortField>, pagination: Pagination) -> Self {
        Self {
            order_by,
            filter: CollectionFilter::default(),
            pagination,
        }
    }

    pub fn with_filter(mut self, filter: CollectionFilter<T::FilterField>) -> Self {
        self.filter = filter;
        self
    }
}

/// Resolves connection pages for any [`Record`] collection.
///
/// The resolver holds no per-request state; one instance is shared by all
/// requests.
#[derive(Debug, Clone, Default)]
pub struct ConnectionResolver<C: CursorCodec = Base64CursorCodec> {
    codec: C,
}

impl ConnectionResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: CursorCodec> ConnectionResolver<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Resolve one page of `T` visible to `principal`.
    #[instrument(skip_all, fields(collection = T::COLLECTION, principal = %principal.user_key))]
    pub async fn resolve_connection<T: Record>(
        &self,
        scopes: &dyn ScopeResolver,
        store: &dyn CollectionStore<T>,
        principal: &Principal,
        ctx: &RequestContext,
        args: ConnectionArgs<T>,
    ) -> ConnectionResult<Connection<T::Rendered>> {
        record_connection_request(T::COLLECTION);
        let _timer = ResolveTimer::new(T::COLLECTION);

        let result = self.resolve_page(scopes, store, principal, ctx, args).await;

        match &result {
            Ok(connection) => {
                record_edges_returned(T::COLLECTION, connection.edges.len());
                debug!(
                    edges = connection.edges.len(),
                    total = connection.total_count,
                    "Connection resolved"
                );
            }
            Err(e) => {
                record_connection_error(T::COLLECTION, e.kind());
                match e {
                    ConnectionError::EligibleSet { source, .. } => error!(
                        principal = %principal.user_key,
                        collection = T::COLLECTION,
                        error = %source,
                        "❌ Eligible set query failed"
                    ),
                    ConnectionError::WindowFetch { source, .. } => error!(
                        principal = %principal.user_key,
                        collection = T::COLLECTION,
                        error = %source,
                        "❌ Window query failed"
                    ),
                    _ => warn!(kind = e.kind(), error = %e, "⚠️  Rejected connection request"),
                }
            }
        }

        result
    }

    async fn resolve_page<T: Record>(
        &self,
        scopes: &dyn ScopeResolver,
        store: &dyn CollectionStore<T>,
        principal: &Principal,
        ctx: &RequestContext,
        args: ConnectionArgs<T>,
    ) -> ConnectionResult<Connection<T::Rendered>> {
        let request = args.pagination.page_request(T::COLLECTION)?;

        let scope = CursorScope::for_records::<T>(&args.order_by, args.filter.language);
        let after = self.decode_anchor(request.after.as_ref(), &scope, "after")?;
        let before = self.decode_anchor(request.before.as_ref(), &scope, "before")?;

        let eligible = self.eligible_set(scopes, store, principal).await?;
        if eligible.is_empty() {
            debug!("Empty eligible set");
            return Ok(Connection::empty(0));
        }

        let query = WindowQuery {
            order_by: args.order_by,
            direction: request.direction,
            after: after.clone(),
            before: before.clone(),
            limit: request.count + 1,
            filter: args.filter,
        };

        let mut rows = store
            .fetch_window(&eligible, &query)
            .await
            .map_err(|e| window_error::<T>(e, &query))?;

        let has_more = rows.len() > request.count;
        rows.truncate(request.count);
        if request.direction == PageDirection::Backward {
            rows.reverse();
        }

        let total_count = store
            .count(&eligible, &query.filter)
            .await
            .map_err(|source| ConnectionError::WindowFetch {
                collection: T::COLLECTION,
                source,
            })?;

        let (Some(first), Some(last)) = (rows.first(), rows.last()) else {
            return Ok(Connection::empty(total_count));
        };

        let (has_next_page, has_previous_page) = match request.direction {
            PageDirection::Forward => {
                let earlier = match after {
                    Some(_) => self.probe(store, &eligible, &query, first.key()).await?,
                    None => false,
                };
                (has_more, earlier)
            }
            PageDirection::Backward => {
                let later = match before {
                    Some(_) => self.probe(store, &eligible, &query, last.key()).await?,
                    None => false,
                };
                (later, has_more)
            }
        };

        let edges: Vec<Edge<T::Rendered>> = rows
            .into_iter()
            .map(|record| {
                let cursor = self.codec.encode(&scope, record.key());
                Edge {
                    node: record.render(ctx),
                    cursor,
                }
            })
            .collect();

        let page_info = PageInfo {
            has_next_page,
            has_previous_page,
            start_cursor: edges.first().map(|e| e.cursor.clone()),
            end_cursor: edges.last().map(|e| e.cursor.clone()),
        };

        Ok(Connection {
            edges,
            page_info,
            total_count,
        })
    }

    fn decode_anchor(
        &self,
        cursor: Option<&Cursor>,
        scope: &CursorScope,
        argument: &'static str,
    ) -> ConnectionResult<Option<String>> {
        cursor
            .map(|c| {
                self.codec
                    .decode_key(c, scope)
                    .map_err(|source| ConnectionError::InvalidCursor { argument, source })
            })
            .transpose()
    }

    async fn eligible_set<T: Record>(
        &self,
        scopes: &dyn ScopeResolver,
        store: &dyn CollectionStore<T>,
        principal: &Principal,
    ) -> ConnectionResult<EligibleSet> {
        let eligible_error = |source| ConnectionError::EligibleSet {
            collection: T::COLLECTION,
            source,
        };

        match scopes.scope_for(principal).await.map_err(eligible_error)? {
            Scope::Unrestricted => Ok(EligibleSet::All),
            Scope::Affiliated { relation } => store
                .eligible_set(principal, &relation)
                .await
                .map_err(eligible_error),
        }
    }

    /// Whether any eligible record lies beyond `edge_key` on the side of the
    /// page opposite to the paging direction.
    async fn probe<T: Record>(
        &self,
        store: &dyn CollectionStore<T>,
        eligible: &EligibleSet,
        query: &WindowQuery<T>,
        edge_key: &str,
    ) -> ConnectionResult<bool> {
        let probe = match query.direction {
            PageDirection::Forward => WindowQuery {
                direction: PageDirection::Backward,
                after: None,
                before: Some(edge_key.to_string()),
                limit: 1,
                ..query.clone()
            },
            PageDirection::Backward => WindowQuery {
                direction: PageDirection::Forward,
                after: Some(edge_key.to_string()),
                before: None,
                limit: 1,
                ..query.clone()
            },
        };

        let rows = store
            .fetch_window(eligible, &probe)
            .await
            .map_err(|source| ConnectionError::WindowFetch {
                collection: T::COLLECTION,
                source,
            })?;
        Ok(!rows.is_empty())
    }
}

/// Attribute a window failure: a missing anchor is a stale cursor, anything
/// else is a backing-store failure.
fn window_error<T: Record>(error: StorageError, query: &WindowQuery<T>) -> ConnectionError {
    if let StorageError::NotFound(key) = &error {
        if query.after.as_deref() == Some(key.as_str()) {
            return ConnectionError::StaleCursor { argument: "after" };
        }
        if query.before.as_deref() == Some(key.as_str()) {
            return ConnectionError::StaleCursor { argument: "before" };
        }
    }
    ConnectionError::WindowFetch {
        collection: T::COLLECTION,
        source: error,
    }
}
