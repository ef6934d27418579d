//! Domain models for the paginated collections.
//!
//! These models are storage-agnostic and represent the canonical
//! form of dashboard records within the domain layer. Each collection
//! implements [`Record`], which is all the connection resolver needs to
//! know about it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Request Context
// =============================================================================

/// Identity of the caller a connection is resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Principal {
    pub user_key: String,
}

impl Principal {
    pub fn new(user_key: impl Into<String>) -> Self {
        Self {
            user_key: user_key.into(),
        }
    }
}

/// Display language for localized fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    English,
    French,
}

impl Language {
    /// Pick a language from an `Accept-Language` header value.
    ///
    /// The first supported tag wins; anything else falls back to English.
    pub fn from_accept_language(header: &str) -> Self {
        header
            .split(',')
            .map(|tag| tag.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .find_map(|tag| match tag.split('-').next() {
                Some("fr") => Some(Self::French),
                Some("en") => Some(Self::English),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
        }
    }
}

/// Request-scoped rendering options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub language: Language,
}

impl RequestContext {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

// =============================================================================
// Record Trait
// =============================================================================

/// A sortable or filterable field of a collection.
pub trait FieldName: Copy + Eq + std::fmt::Debug + Send + Sync + 'static {
    /// Stable identifier, used in cursor scopes and logs.
    fn as_str(&self) -> &'static str;
}

/// Filter field type for collections that take no structured filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoFilter {}

impl FieldName for NoFilter {
    fn as_str(&self) -> &'static str {
        match *self {}
    }
}

/// A record of a paginated collection.
pub trait Record: Clone + Send + Sync + 'static {
    /// Collection name, part of every cursor issued for it.
    const COLLECTION: &'static str;

    type SortField: FieldName;
    type FilterField: FieldName;
    /// Node type returned to callers.
    type Rendered: Send + Sync;

    /// Stable unique key of the record.
    fn key(&self) -> &str;

    /// Produce the caller-facing node for this request.
    fn render(self, ctx: &RequestContext) -> Self::Rendered;

    /// Whether ordering by `field` depends on the request language.
    fn localized_sort(_field: Self::SortField) -> bool {
        false
    }
}

/// Generate a [`FieldName`] enum with its string identifiers.
macro_rules! field_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $id:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl FieldName for $name {
            fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $id),+
                }
            }
        }
    };
}

// =============================================================================
// Organizations
// =============================================================================

/// Language-specific organization details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDetails {
    pub name: String,
    pub acronym: String,
    pub city: String,
}

/// Stored organization with both language variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRecord {
    pub key: String,
    pub slug: String,
    pub en: OrganizationDetails,
    pub fr: OrganizationDetails,
    pub domain_count: u32,
    pub verified: bool,
}

impl OrganizationRecord {
    pub fn details(&self, language: Language) -> &OrganizationDetails {
        match language {
            Language::English => &self.en,
            Language::French => &self.fr,
        }
    }
}

/// Organization as seen by one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub key: String,
    pub slug: String,
    pub name: String,
    pub acronym: String,
    pub city: String,
    pub domain_count: u32,
    pub verified: bool,
}

field_enum!(
    /// Sortable organization fields.
    OrganizationSortField {
        Name => "name",
        Acronym => "acronym",
        Slug => "slug",
        DomainCount => "domain_count",
        Verified => "verified",
    }
);

impl Record for OrganizationRecord {
    const COLLECTION: &'static str = "organizations";

    type SortField = OrganizationSortField;
    type FilterField = NoFilter;
    type Rendered = Organization;

    fn key(&self) -> &str {
        &self.key
    }

    fn localized_sort(field: OrganizationSortField) -> bool {
        matches!(
            field,
            OrganizationSortField::Name | OrganizationSortField::Acronym
        )
    }

    fn render(self, ctx: &RequestContext) -> Organization {
        let details = match ctx.language {
            Language::English => self.en,
            Language::French => self.fr,
        };
        Organization {
            key: self.key,
            slug: self.slug,
            name: details.name,
            acronym: details.acronym,
            city: details.city,
            domain_count: self.domain_count,
            verified: self.verified,
        }
    }
}

// =============================================================================
// Domains
// =============================================================================

/// Outcome of one scan category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanStatus {
    Pass,
    Fail,
    #[default]
    Info,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
            Self::Info => "info",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pass" => Some(Self::Pass),
            "fail" => Some(Self::Fail),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

/// Latest scan summary for a domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainStatus {
    pub https: ScanStatus,
    pub dmarc: ScanStatus,
    pub spf: ScanStatus,
    pub dkim: ScanStatus,
}

/// A monitored domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub key: String,
    pub domain: String,
    pub last_ran: Option<DateTime<Utc>>,
    pub status: DomainStatus,
    pub archived: bool,
}

field_enum!(
    /// Sortable domain fields.
    DomainSortField {
        Domain => "domain",
        LastRan => "last_ran",
        HttpsStatus => "https_status",
        DmarcStatus => "dmarc_status",
        SpfStatus => "spf_status",
        DkimStatus => "dkim_status",
    }
);

field_enum!(
    /// Filterable domain fields.
    DomainFilterField {
        HttpsStatus => "https_status",
        DmarcStatus => "dmarc_status",
        SpfStatus => "spf_status",
        DkimStatus => "dkim_status",
    }
);

impl Record for Domain {
    const COLLECTION: &'static str = "domains";

    type SortField = DomainSortField;
    type FilterField = DomainFilterField;
    type Rendered = Domain;

    fn key(&self) -> &str {
        &self.key
    }

    fn render(self, _ctx: &RequestContext) -> Domain {
        self
    }
}

// =============================================================================
// Users
// =============================================================================

/// A dashboard user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub key: String,
    pub user_name: String,
    pub display_name: String,
    pub email_validated: bool,
}

field_enum!(
    /// Sortable user fields.
    UserSortField {
        UserName => "user_name",
        DisplayName => "display_name",
        EmailValidated => "email_validated",
    }
);

impl Record for User {
    const COLLECTION: &'static str = "users";

    type SortField = UserSortField;
    type FilterField = NoFilter;
    type Rendered = User;

    fn key(&self) -> &str {
        &self.key
    }

    fn render(self, _ctx: &RequestContext) -> User {
        self
    }
}

// =============================================================================
// Audit Logs
// =============================================================================

/// Kind of change recorded by an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Add,
    Update,
    Remove,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Remove => "remove",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "add" => Some(Self::Add),
            "update" => Some(Self::Update),
            "remove" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// One recorded administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLog {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub initiated_by: String,
    pub action: AuditAction,
    pub target_resource: String,
    pub organization_key: String,
}

field_enum!(
    /// Sortable audit log fields.
    AuditLogSortField {
        Timestamp => "timestamp",
        InitiatedBy => "initiated_by",
        Action => "action",
        Resource => "target_resource",
    }
);

field_enum!(
    /// Filterable audit log fields.
    AuditLogFilterField {
        Action => "action",
    }
);

impl Record for AuditLog {
    const COLLECTION: &'static str = "audit_logs";

    type SortField = AuditLogSortField;
    type FilterField = AuditLogFilterField;
    type Rendered = AuditLog;

    fn key(&self) -> &str {
        &self.key
    }

    fn render(self, _ctx: &RequestContext) -> AuditLog {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_language_negotiation() {
        assert_eq!(Language::from_accept_language("fr-CA,fr;q=0.9"), Language::French);
        assert_eq!(Language::from_accept_language("de-DE, en;q=0.5"), Language::English);
        assert_eq!(Language::from_accept_language(""), Language::English);
        assert_eq!(Language::from_accept_language("es"), Language::English);
    }

    #[test]
    fn test_organization_renders_request_language() {
        let record = OrganizationRecord {
            key: "1".into(),
            slug: "treasury-board".into(),
            en: OrganizationDetails {
                name: "Treasury Board".into(),
                acronym: "TBS".into(),
                city: "Ottawa".into(),
            },
            fr: OrganizationDetails {
                name: "Conseil du Trésor".into(),
                acronym: "SCT".into(),
                city: "Ottawa".into(),
            },
            domain_count: 3,
            verified: true,
        };

        let fr = record.clone().render(&RequestContext::new(Language::French));
        assert_eq!(fr.acronym, "SCT");
        let en = record.render(&RequestContext::default());
        assert_eq!(en.name, "Treasury Board");
    }
}
