//! Generic keyset-paginated collection store.
//!
//! Every collection is read the same way: an optional eligible key set, an
//! optional search term and structured filters narrow the table, then a
//! keyset condition on `(sort expression, key)` selects the window relative
//! to the anchor records. Per-collection details (table, columns, row
//! mapping, eligibility SQL) come from [`PgCollection`].

use std::collections::BTreeSet;
use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Row};
use sqlx::postgres::PgRow;
use tracing::debug;

use warden_core::error::{StorageError, StorageResult};
use warden_core::models::{Language, Principal, Record};
use warden_core::ports::{
    CollectionFilter, CollectionStore, Comparison, EligibleSet, OrderDirection, WindowQuery,
};

use super::database::Database;
use super::helpers::escape_like;

/// Storage description of one collection.
pub trait PgCollection: Record {
    /// Table or view the collection is read from. Must expose a `key` column.
    const TABLE: &'static str;
    /// Select list matching [`PgCollection::Row`].
    const COLUMNS: &'static str;

    type Row: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin;

    fn from_row(row: Self::Row) -> StorageResult<Self>;

    /// SQL expression ordered on for `field`. Must never be NULL.
    fn sort_expr(field: Self::SortField, language: Language) -> &'static str;

    /// Columns matched by free-text search.
    fn search_exprs(language: Language) -> &'static [&'static str];

    fn filter_column(field: Self::FilterField) -> &'static str;

    /// Query returning the keys reachable from user `$1` through `relation`.
    fn eligible_sql(relation: &str) -> Option<&'static str>;
}

/// A bound query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Keys(Vec<String>),
}

/// SQL text with its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// WHERE clause under construction.
///
/// SAFETY: column names, operators and sort expressions come from
/// [`PgCollection`] constants, never from user input. All values are
/// parameterized via $1, $2, etc. and bound separately.
#[derive(Default)]
struct Conditions {
    clauses: Vec<String>,
    params: Vec<SqlParam>,
}

impl Conditions {
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }
}

fn filter_conditions<T: PgCollection>(
    eligible: &EligibleSet,
    filter: &CollectionFilter<T::FilterField>,
) -> Conditions {
    let mut conditions = Conditions::default();

    if let EligibleSet::Keys(keys) = eligible {
        let p = conditions.bind(SqlParam::Keys(keys.iter().cloned().collect()));
        conditions.clauses.push(format!("key = ANY({p})"));
    }

    if let Some(term) = filter.search.as_deref().map(str::trim)
        && !term.is_empty()
    {
        let p = conditions.bind(SqlParam::Text(format!("%{}%", escape_like(term))));
        let matches: Vec<String> = T::search_exprs(filter.language)
            .iter()
            .map(|expr| format!("{expr} ILIKE {p}"))
            .collect();
        conditions.clauses.push(format!("({})", matches.join(" OR ")));
    }

    for condition in &filter.conditions {
        let op = match condition.comparison {
            Comparison::Equal => "=",
            Comparison::NotEqual => "<>",
        };
        let p = conditions.bind(SqlParam::Text(condition.value.clone()));
        conditions
            .clauses
            .push(format!("{} {op} {p}", T::filter_column(condition.field)));
    }

    conditions
}

fn sql_direction(direction: OrderDirection) -> &'static str {
    match direction {
        OrderDirection::Asc => "ASC",
        OrderDirection::Desc => "DESC",
    }
}

/// Build the over-fetching window query.
///
/// Anchors are compared as row values against the anchor record itself, so
/// ties on the sort expression are broken by key in the same direction.
/// The anchor existence check runs in the same statement as the window:
/// the outer select always yields at least one row carrying the
/// `after_missing`/`before_missing` flags, with the page columns NULL when
/// the window is empty or an anchor is gone.
pub fn window_sql<T: PgCollection>(eligible: &EligibleSet, query: &WindowQuery<T>) -> SqlQuery {
    let mut conditions = filter_conditions::<T>(eligible, &query.filter);
    let sort = T::sort_expr(query.order_by.field, query.filter.language);

    let (after_op, before_op) = match query.order_by.direction {
        OrderDirection::Asc => (">", "<"),
        OrderDirection::Desc => ("<", ">"),
    };
    let mut missing = Vec::with_capacity(2);
    for (anchor, op) in [(&query.after, after_op), (&query.before, before_op)] {
        match anchor {
            Some(key) => {
                let p = conditions.bind(SqlParam::Text(key.clone()));
                conditions.clauses.push(format!(
                    "({sort}, key) {op} (SELECT {sort}, key FROM {} WHERE key = {p})",
                    T::TABLE
                ));
                missing.push(format!(
                    "NOT EXISTS (SELECT 1 FROM {} WHERE key = {p})",
                    T::TABLE
                ));
            }
            None => missing.push("FALSE".to_string()),
        }
    }

    let scan = sql_direction(query.scan_direction());
    let sql = format!(
        "WITH anchor AS (SELECT {} AS after_missing, {} AS before_missing), \
         page AS (SELECT {}, {sort} AS sort_value FROM {} {} \
         ORDER BY {sort} {scan}, key {scan} LIMIT {}) \
         SELECT anchor.after_missing, anchor.before_missing, page.* \
         FROM anchor LEFT JOIN page ON NOT (anchor.after_missing OR anchor.before_missing) \
         ORDER BY page.sort_value {scan}, page.key {scan}",
        missing[0],
        missing[1],
        T::COLUMNS,
        T::TABLE,
        conditions.where_clause(),
        query.limit
    );

    SqlQuery {
        sql,
        params: conditions.params,
    }
}

/// Build the total count query for the same eligible set and filters.
pub fn count_sql<T: PgCollection>(
    eligible: &EligibleSet,
    filter: &CollectionFilter<T::FilterField>,
) -> SqlQuery {
    let conditions = filter_conditions::<T>(eligible, filter);
    SqlQuery {
        sql: format!("SELECT COUNT(*) FROM {} {}", T::TABLE, conditions.where_clause()),
        params: conditions.params,
    }
}

/// PostgreSQL implementation of [`CollectionStore`] for any [`PgCollection`].
pub struct PgCollectionStore<T> {
    pool: PgPool,
    _record: PhantomData<fn() -> T>,
}

impl<T: PgCollection> PgCollectionStore<T> {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<T: PgCollection> CollectionStore<T> for PgCollectionStore<T> {
    async fn eligible_set(
        &self,
        principal: &Principal,
        relation: &str,
    ) -> StorageResult<EligibleSet> {
        let sql = T::eligible_sql(relation).ok_or_else(|| StorageError::UnsupportedRelation {
            collection: T::COLLECTION,
            relation: relation.to_string(),
        })?;

        let keys: Vec<String> = sqlx::query_scalar(sql)
            .bind(&principal.user_key)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        debug!(
            collection = T::COLLECTION,
            relation,
            keys = keys.len(),
            "Eligible set computed"
        );

        Ok(EligibleSet::Keys(keys.into_iter().collect::<BTreeSet<_>>()))
    }

    async fn fetch_window(
        &self,
        eligible: &EligibleSet,
        query: &WindowQuery<T>,
    ) -> StorageResult<Vec<T>> {
        let SqlQuery { sql, params } = window_sql(eligible, query);
        let mut builder = sqlx::query(&sql);
        for param in params {
            builder = match param {
                SqlParam::Text(value) => builder.bind(value),
                SqlParam::Keys(keys) => builder.bind(keys),
            };
        }

        let rows = builder
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let get_err = |e: sqlx::Error| StorageError::QueryError(e.to_string());
            let missing = [
                (row.try_get::<bool, _>("after_missing").map_err(get_err)?, &query.after),
                (row.try_get::<bool, _>("before_missing").map_err(get_err)?, &query.before),
            ];
            if let Some((_, Some(anchor))) = missing.into_iter().find(|(gone, _)| *gone) {
                return Err(StorageError::NotFound(anchor.clone()));
            }
            // NULL page columns: the window is empty
            if row.try_get::<Option<String>, _>("key").map_err(get_err)?.is_none() {
                continue;
            }
            let record = <T::Row as FromRow<'_, PgRow>>::from_row(&row).map_err(get_err)?;
            records.push(T::from_row(record)?);
        }

        debug!(collection = T::COLLECTION, rows = records.len(), "Window fetched");

        Ok(records)
    }

    async fn count(
        &self,
        eligible: &EligibleSet,
        filter: &CollectionFilter<T::FilterField>,
    ) -> StorageResult<u64> {
        let SqlQuery { sql, params } = count_sql::<T>(eligible, filter);
        let mut builder = sqlx::query_scalar::<_, i64>(&sql);
        for param in params {
            builder = match param {
                SqlParam::Text(value) => builder.bind(value),
                SqlParam::Keys(keys) => builder.bind(keys),
            };
        }

        let count = builder
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(count as u64)
    }
}
