//! In-memory store fixtures for resolver tests.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{StorageError, StorageResult};
use crate::models::{
    Domain, DomainFilterField, DomainSortField, Language, OrganizationDetails, OrganizationRecord,
    OrganizationSortField, Principal, Record,
};
use crate::ports::{
    AFFILIATIONS, CollectionFilter, CollectionStore, Comparison, EligibleSet, OrderDirection,
    Scope, ScopeResolver, WindowQuery,
};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Text(String),
    Number(i64),
    Flag(bool),
    Time(Option<DateTime<Utc>>),
}

/// Field access the in-memory store needs to emulate SQL.
pub trait MemoryRecord: Record {
    fn sort_value(&self, field: Self::SortField, language: Language) -> SortValue;
    fn matches_search(&self, term: &str, language: Language) -> bool;
    fn filter_value(&self, field: Self::FilterField) -> String;
}

impl MemoryRecord for OrganizationRecord {
    fn sort_value(&self, field: OrganizationSortField, language: Language) -> SortValue {
        let details = self.details(language);
        match field {
            OrganizationSortField::Name => SortValue::Text(details.name.clone()),
            OrganizationSortField::Acronym => SortValue::Text(details.acronym.clone()),
            OrganizationSortField::Slug => SortValue::Text(self.slug.clone()),
            OrganizationSortField::DomainCount => SortValue::Number(i64::from(self.domain_count)),
            OrganizationSortField::Verified => SortValue::Flag(self.verified),
        }
    }

    fn matches_search(&self, term: &str, language: Language) -> bool {
        let details = self.details(language);
        let term = term.to_lowercase();
        details.name.to_lowercase().contains(&term) || details.acronym.to_lowercase().contains(&term)
    }

    fn filter_value(&self, field: Self::FilterField) -> String {
        match field {}
    }
}

impl MemoryRecord for Domain {
    fn sort_value(&self, field: DomainSortField, _language: Language) -> SortValue {
        match field {
            DomainSortField::Domain => SortValue::Text(self.domain.clone()),
            DomainSortField::LastRan => SortValue::Time(self.last_ran),
            DomainSortField::HttpsStatus => SortValue::Text(self.status.https.as_str().into()),
            DomainSortField::DmarcStatus => SortValue::Text(self.status.dmarc.as_str().into()),
            DomainSortField::SpfStatus => SortValue::Text(self.status.spf.as_str().into()),
            DomainSortField::DkimStatus => SortValue::Text(self.status.dkim.as_str().into()),
        }
    }

    fn matches_search(&self, term: &str, _language: Language) -> bool {
        self.domain.to_lowercase().contains(&term.to_lowercase())
    }

    fn filter_value(&self, field: DomainFilterField) -> String {
        let status = match field {
            DomainFilterField::HttpsStatus => self.status.https,
            DomainFilterField::DmarcStatus => self.status.dmarc,
            DomainFilterField::SpfStatus => self.status.spf,
            DomainFilterField::DkimStatus => self.status.dkim,
        };
        status.as_str().to_string()
    }
}

/// Collection store backed by a vector, with call counters and failure
/// switches.
pub struct MemoryStore<T> {
    records: Vec<T>,
    affiliations: HashMap<String, BTreeSet<String>>,
    pub fail_eligible: bool,
    pub fail_window: bool,
    pub eligible_calls: AtomicUsize,
    pub window_calls: AtomicUsize,
    pub count_calls: AtomicUsize,
}

impl<T: MemoryRecord> MemoryStore<T> {
    pub fn new(records: Vec<T>) -> Self {
        Self {
            records,
            affiliations: HashMap::new(),
            fail_eligible: false,
            fail_window: false,
            eligible_calls: AtomicUsize::new(0),
            window_calls: AtomicUsize::new(0),
            count_calls: AtomicUsize::new(0),
        }
    }

    pub fn affiliate(mut self, user_key: &str, keys: &[&str]) -> Self {
        self.affiliations
            .entry(user_key.to_string())
            .or_default()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn remove(&mut self, key: &str) {
        self.records.retain(|r| r.key() != key);
    }

    pub fn query_count(&self) -> usize {
        self.eligible_calls.load(AtomicOrdering::SeqCst)
            + self.window_calls.load(AtomicOrdering::SeqCst)
            + self.count_calls.load(AtomicOrdering::SeqCst)
    }

    fn matches(&self, record: &T, eligible: &EligibleSet, filter: &CollectionFilter<T::FilterField>) -> bool {
        eligible.contains(record.key())
            && filter
                .search
                .as_deref()
                .is_none_or(|term| record.matches_search(term, filter.language))
            && filter.conditions.iter().all(|c| {
                let equal = record.filter_value(c.field) == c.value;
                match c.comparison {
                    Comparison::Equal => equal,
                    Comparison::NotEqual => !equal,
                }
            })
    }

    fn position(&self, key: &str, query: &WindowQuery<T>) -> StorageResult<(SortValue, String)> {
        self.records
            .iter()
            .find(|r| r.key() == key)
            .map(|r| {
                (
                    r.sort_value(query.order_by.field, query.filter.language),
                    key.to_string(),
                )
            })
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }
}

#[async_trait]
impl<T: MemoryRecord> CollectionStore<T> for MemoryStore<T> {
    async fn eligible_set(
        &self,
        principal: &Principal,
        relation: &str,
    ) -> StorageResult<EligibleSet> {
        self.eligible_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_eligible {
            return Err(StorageError::ConnectionError("affiliation lookup timed out".into()));
        }
        if relation != AFFILIATIONS {
            return Err(StorageError::UnsupportedRelation {
                collection: T::COLLECTION,
                relation: relation.to_string(),
            });
        }
        Ok(EligibleSet::Keys(
            self.affiliations
                .get(&principal.user_key)
                .cloned()
                .unwrap_or_default(),
        ))
    }

    async fn fetch_window(
        &self,
        eligible: &EligibleSet,
        query: &WindowQuery<T>,
    ) -> StorageResult<Vec<T>> {
        self.window_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_window {
            return Err(StorageError::QueryError("statement timeout".into()));
        }

        let after = query.after.as_deref().map(|k| self.position(k, query)).transpose()?;
        let before = query.before.as_deref().map(|k| self.position(k, query)).transpose()?;

        let language = query.filter.language;
        let canonical = |a: &(SortValue, String), b: &(SortValue, String)| match query
            .order_by
            .direction
        {
            OrderDirection::Asc => a.cmp(b),
            OrderDirection::Desc => b.cmp(a),
        };

        let mut rows: Vec<((SortValue, String), T)> = self
            .records
            .iter()
            .filter(|r| self.matches(r, eligible, &query.filter))
            .map(|r| {
                (
                    (r.sort_value(query.order_by.field, language), r.key().to_string()),
                    r.clone(),
                )
            })
            .filter(|(pos, _)| {
                after
                    .as_ref()
                    .is_none_or(|a| canonical(pos, a) == Ordering::Greater)
                    && before
                        .as_ref()
                        .is_none_or(|b| canonical(pos, b) == Ordering::Less)
            })
            .collect();

        rows.sort_by(|a, b| canonical(&a.0, &b.0));
        if query.scan_direction() != query.order_by.direction {
            rows.reverse();
        }

        Ok(rows.into_iter().take(query.limit).map(|(_, r)| r).collect())
    }

    async fn count(
        &self,
        eligible: &EligibleSet,
        filter: &CollectionFilter<T::FilterField>,
    ) -> StorageResult<u64> {
        self.count_calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.fail_window {
            return Err(StorageError::QueryError("statement timeout".into()));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| self.matches(r, eligible, filter))
            .count() as u64)
    }
}

/// Scope collaborator with a fixed set of elevated principals.
#[derive(Default)]
pub struct StaticScopes {
    pub super_admins: HashSet<String>,
    pub fail: bool,
}

impl StaticScopes {
    pub fn with_super_admin(user_key: &str) -> Self {
        Self {
            super_admins: HashSet::from([user_key.to_string()]),
            fail: false,
        }
    }
}

#[async_trait]
impl ScopeResolver for StaticScopes {
    async fn scope_for(&self, principal: &Principal) -> StorageResult<Scope> {
        if self.fail {
            return Err(StorageError::ConnectionError("role lookup failed".into()));
        }
        if self.super_admins.contains(&principal.user_key) {
            Ok(Scope::Unrestricted)
        } else {
            Ok(Scope::Affiliated {
                relation: AFFILIATIONS.to_string(),
            })
        }
    }
}

/// Organization with slug `r{i:02}`, English name `r{i}` and French name
/// `fr-r{i}`.
pub fn numbered_org(i: u32) -> OrganizationRecord {
    OrganizationRecord {
        key: format!("org-{i}"),
        slug: format!("r{i:02}"),
        en: OrganizationDetails {
            name: format!("r{i}"),
            acronym: format!("R{i}"),
            city: "Ottawa".into(),
        },
        fr: OrganizationDetails {
            name: format!("fr-r{i}"),
            acronym: format!("FR{i}"),
            city: "Ottawa".into(),
        },
        domain_count: i,
        verified: i % 2 == 0,
    }
}

pub fn numbered_orgs(n: u32) -> Vec<OrganizationRecord> {
    (1..=n).map(numbered_org).collect()
}
