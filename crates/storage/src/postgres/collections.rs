//! Storage descriptors for the four dashboard collections.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use warden_core::error::StorageResult;
use warden_core::models::{
    AuditAction, AuditLog, AuditLogFilterField, AuditLogSortField, Domain, DomainFilterField,
    DomainSortField, DomainStatus, Language, NoFilter, OrganizationDetails, OrganizationRecord,
    OrganizationSortField, ScanStatus, User, UserSortField,
};
use warden_core::ports::AFFILIATIONS;

use super::helpers::{count_to_u32, parse_column};
use super::window::PgCollection;

// =============================================================================
// Organizations
// =============================================================================

#[derive(FromRow)]
pub struct OrganizationRow {
    key: String,
    slug: String,
    name_en: String,
    acronym_en: String,
    city_en: String,
    name_fr: String,
    acronym_fr: String,
    city_fr: String,
    domain_count: i64,
    verified: bool,
}

impl PgCollection for OrganizationRecord {
    const TABLE: &'static str = "organization_summaries";
    const COLUMNS: &'static str = "key, slug, name_en, acronym_en, city_en, \
        name_fr, acronym_fr, city_fr, domain_count, verified";

    type Row = OrganizationRow;

    fn from_row(row: OrganizationRow) -> StorageResult<Self> {
        Ok(OrganizationRecord {
            key: row.key,
            slug: row.slug,
            en: OrganizationDetails {
                name: row.name_en,
                acronym: row.acronym_en,
                city: row.city_en,
            },
            fr: OrganizationDetails {
                name: row.name_fr,
                acronym: row.acronym_fr,
                city: row.city_fr,
            },
            domain_count: count_to_u32(row.domain_count, "organizations.domain_count")?,
            verified: row.verified,
        })
    }

    fn sort_expr(field: OrganizationSortField, language: Language) -> &'static str {
        match (field, language) {
            (OrganizationSortField::Name, Language::English) => "name_en",
            (OrganizationSortField::Name, Language::French) => "name_fr",
            (OrganizationSortField::Acronym, Language::English) => "acronym_en",
            (OrganizationSortField::Acronym, Language::French) => "acronym_fr",
            (OrganizationSortField::Slug, _) => "slug",
            (OrganizationSortField::DomainCount, _) => "domain_count",
            (OrganizationSortField::Verified, _) => "verified",
        }
    }

    fn search_exprs(language: Language) -> &'static [&'static str] {
        match language {
            Language::English => &["name_en", "acronym_en"],
            Language::French => &["name_fr", "acronym_fr"],
        }
    }

    fn filter_column(field: NoFilter) -> &'static str {
        match field {}
    }

    fn eligible_sql(relation: &str) -> Option<&'static str> {
        (relation == AFFILIATIONS).then_some("SELECT org_key FROM affiliations WHERE user_key = $1")
    }
}

// =============================================================================
// Domains
// =============================================================================

#[derive(FromRow)]
pub struct DomainRow {
    key: String,
    domain: String,
    last_ran: Option<DateTime<Utc>>,
    https_status: String,
    dmarc_status: String,
    spf_status: String,
    dkim_status: String,
    archived: bool,
}

impl PgCollection for Domain {
    const TABLE: &'static str = "domains";
    const COLUMNS: &'static str = "key, domain, last_ran, https_status, dmarc_status, \
        spf_status, dkim_status, archived";

    type Row = DomainRow;

    fn from_row(row: DomainRow) -> StorageResult<Self> {
        Ok(Domain {
            key: row.key,
            domain: row.domain,
            last_ran: row.last_ran,
            status: DomainStatus {
                https: parse_column(&row.https_status, "domains.https_status", ScanStatus::parse)?,
                dmarc: parse_column(&row.dmarc_status, "domains.dmarc_status", ScanStatus::parse)?,
                spf: parse_column(&row.spf_status, "domains.spf_status", ScanStatus::parse)?,
                dkim: parse_column(&row.dkim_status, "domains.dkim_status", ScanStatus::parse)?,
            },
            archived: row.archived,
        })
    }

    fn sort_expr(field: DomainSortField, _language: Language) -> &'static str {
        match field {
            DomainSortField::Domain => "domain",
            DomainSortField::LastRan => "COALESCE(last_ran, '-infinity'::timestamptz)",
            DomainSortField::HttpsStatus => "https_status",
            DomainSortField::DmarcStatus => "dmarc_status",
            DomainSortField::SpfStatus => "spf_status",
            DomainSortField::DkimStatus => "dkim_status",
        }
    }

    fn search_exprs(_language: Language) -> &'static [&'static str] {
        &["domain"]
    }

    fn filter_column(field: DomainFilterField) -> &'static str {
        match field {
            DomainFilterField::HttpsStatus => "https_status",
            DomainFilterField::DmarcStatus => "dmarc_status",
            DomainFilterField::SpfStatus => "spf_status",
            DomainFilterField::DkimStatus => "dkim_status",
        }
    }

    fn eligible_sql(relation: &str) -> Option<&'static str> {
        (relation == AFFILIATIONS).then_some(
            "SELECT DISTINCT c.domain_key FROM claims c \
             JOIN affiliations a ON a.org_key = c.org_key \
             WHERE a.user_key = $1",
        )
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(FromRow)]
pub struct UserRow {
    key: String,
    user_name: String,
    display_name: String,
    email_validated: bool,
}

impl PgCollection for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "key, user_name, display_name, email_validated";

    type Row = UserRow;

    fn from_row(row: UserRow) -> StorageResult<Self> {
        Ok(User {
            key: row.key,
            user_name: row.user_name,
            display_name: row.display_name,
            email_validated: row.email_validated,
        })
    }

    fn sort_expr(field: UserSortField, _language: Language) -> &'static str {
        match field {
            UserSortField::UserName => "user_name",
            UserSortField::DisplayName => "display_name",
            UserSortField::EmailValidated => "email_validated",
        }
    }

    fn search_exprs(_language: Language) -> &'static [&'static str] {
        &["user_name", "display_name"]
    }

    fn filter_column(field: NoFilter) -> &'static str {
        match field {}
    }

    fn eligible_sql(relation: &str) -> Option<&'static str> {
        (relation == AFFILIATIONS).then_some(
            "SELECT DISTINCT peer.user_key FROM affiliations own \
             JOIN affiliations peer ON peer.org_key = own.org_key \
             WHERE own.user_key = $1",
        )
    }
}

// =============================================================================
// Audit Logs
// =============================================================================

#[derive(FromRow)]
pub struct AuditLogRow {
    key: String,
    timestamp: DateTime<Utc>,
    initiated_by: String,
    action: String,
    target_resource: String,
    organization_key: String,
}

impl PgCollection for AuditLog {
    const TABLE: &'static str = "audit_logs";
    const COLUMNS: &'static str =
        "key, timestamp, initiated_by, action, target_resource, organization_key";

    type Row = AuditLogRow;

    fn from_row(row: AuditLogRow) -> StorageResult<Self> {
        Ok(AuditLog {
            key: row.key,
            timestamp: row.timestamp,
            initiated_by: row.initiated_by,
            action: parse_column(&row.action, "audit_logs.action", AuditAction::parse)?,
            target_resource: row.target_resource,
            organization_key: row.organization_key,
        })
    }

    fn sort_expr(field: AuditLogSortField, _language: Language) -> &'static str {
        match field {
            AuditLogSortField::Timestamp => "timestamp",
            AuditLogSortField::InitiatedBy => "initiated_by",
            AuditLogSortField::Action => "action",
            AuditLogSortField::Resource => "target_resource",
        }
    }

    fn search_exprs(_language: Language) -> &'static [&'static str] {
        &["initiated_by", "target_resource"]
    }

    fn filter_column(field: AuditLogFilterField) -> &'static str {
        match field {
            AuditLogFilterField::Action => "action",
        }
    }

    // Only organization admins see their organization's logs.
    fn eligible_sql(relation: &str) -> Option<&'static str> {
        (relation == AFFILIATIONS).then_some(
            "SELECT l.key FROM audit_logs l \
             JOIN affiliations a ON a.org_key = l.organization_key \
             WHERE a.user_key = $1 AND a.permission IN ('admin', 'super_admin')",
        )
    }
}
