//! GraphQL type definitions.

use async_graphql::{EmptyMutation, EmptySubscription, Enum, InputObject, Schema, SimpleObject};
use chrono::{DateTime, Utc};

use warden_core::models::{
    self, AuditAction, AuditLogFilterField, AuditLogSortField, DomainFilterField, DomainSortField,
    OrganizationSortField, ScanStatus, UserSortField,
};
use warden_core::ports::{Comparison, FilterCondition, OrderBy, OrderDirection};

use crate::schema::WardenQuery;

/// The GraphQL schema type.
pub type WardenSchema = Schema<WardenQuery, EmptyMutation, EmptySubscription>;

// -----------------------------------------------------------------------------
// Nodes
// -----------------------------------------------------------------------------

/// Organization, localized to the request language.
#[derive(SimpleObject)]
pub struct Organization {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub acronym: String,
    pub city: String,
    pub domain_count: i32,
    pub verified: bool,
}

impl From<models::Organization> for Organization {
    fn from(o: models::Organization) -> Self {
        Self {
            id: o.key,
            slug: o.slug,
            name: o.name,
            acronym: o.acronym,
            city: o.city,
            domain_count: i32::try_from(o.domain_count).unwrap_or(i32::MAX),
            verified: o.verified,
        }
    }
}

/// Outcome of one scan category.
#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusValue {
    Pass,
    Fail,
    Info,
}

impl From<ScanStatus> for StatusValue {
    fn from(status: ScanStatus) -> Self {
        match status {
            ScanStatus::Pass => Self::Pass,
            ScanStatus::Fail => Self::Fail,
            ScanStatus::Info => Self::Info,
        }
    }
}

impl From<StatusValue> for ScanStatus {
    fn from(status: StatusValue) -> Self {
        match status {
            StatusValue::Pass => Self::Pass,
            StatusValue::Fail => Self::Fail,
            StatusValue::Info => Self::Info,
        }
    }
}

#[derive(SimpleObject)]
pub struct DomainStatus {
    pub https: StatusValue,
    pub dmarc: StatusValue,
    pub spf: StatusValue,
    pub dkim: StatusValue,
}

/// Monitored domain with its latest scan summary.
#[derive(SimpleObject)]
pub struct Domain {
    pub id: String,
    pub domain: String,
    pub last_ran: Option<DateTime<Utc>>,
    pub status: DomainStatus,
    pub archived: bool,
}

impl From<models::Domain> for Domain {
    fn from(d: models::Domain) -> Self {
        Self {
            id: d.key,
            domain: d.domain,
            last_ran: d.last_ran,
            status: DomainStatus {
                https: d.status.https.into(),
                dmarc: d.status.dmarc.into(),
                spf: d.status.spf.into(),
                dkim: d.status.dkim.into(),
            },
            archived: d.archived,
        }
    }
}

#[derive(SimpleObject)]
pub struct User {
    pub id: String,
    pub user_name: String,
    pub display_name: String,
    pub email_validated: bool,
}

impl From<models::User> for User {
    fn from(u: models::User) -> Self {
        Self {
            id: u.key,
            user_name: u.user_name,
            display_name: u.display_name,
            email_validated: u.email_validated,
        }
    }
}

#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditActionValue {
    Add,
    Update,
    Remove,
}

impl From<AuditAction> for AuditActionValue {
    fn from(action: AuditAction) -> Self {
        match action {
            AuditAction::Add => Self::Add,
            AuditAction::Update => Self::Update,
            AuditAction::Remove => Self::Remove,
        }
    }
}

impl From<AuditActionValue> for AuditAction {
    fn from(action: AuditActionValue) -> Self {
        match action {
            AuditActionValue::Add => Self::Add,
            AuditActionValue::Update => Self::Update,
            AuditActionValue::Remove => Self::Remove,
        }
    }
}

#[derive(SimpleObject)]
pub struct AuditLog {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub initiated_by: String,
    pub action: AuditActionValue,
    pub target_resource: String,
    pub organization_id: String,
}

impl From<models::AuditLog> for AuditLog {
    fn from(l: models::AuditLog) -> Self {
        Self {
            id: l.key,
            timestamp: l.timestamp,
            initiated_by: l.initiated_by,
            action: l.action.into(),
            target_resource: l.target_resource,
            organization_id: l.organization_key,
        }
    }
}

// -----------------------------------------------------------------------------
// Ordering
// -----------------------------------------------------------------------------

/// Ordering direction.
#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl From<Order> for OrderDirection {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => OrderDirection::Asc,
            Order::Desc => OrderDirection::Desc,
        }
    }
}

/// Generate an `orderBy` input (field enum + direction) converting into the
/// collection's core [`OrderBy`].
macro_rules! define_order_input {
    ($input:ident, $field:ident, $core:ty { $($variant:ident),+ $(,)? }) => {
        #[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
        pub enum $field {
            $($variant),+
        }

        impl From<$field> for $core {
            fn from(field: $field) -> Self {
                match field {
                    $($field::$variant => <$core>::$variant),+
                }
            }
        }

        #[derive(InputObject, Clone, Copy, Debug)]
        pub struct $input {
            pub field: $field,
            #[graphql(default)]
            pub direction: Order,
        }

        impl From<$input> for OrderBy<$core> {
            fn from(input: $input) -> Self {
                OrderBy::new(input.field.into(), input.direction.into())
            }
        }
    };
}

define_order_input!(OrganizationOrder, OrganizationOrderField, OrganizationSortField {
    Name,
    Acronym,
    Slug,
    DomainCount,
    Verified,
});
define_order_input!(DomainOrder, DomainOrderField, DomainSortField {
    Domain,
    LastRan,
    HttpsStatus,
    DmarcStatus,
    SpfStatus,
    DkimStatus,
});
define_order_input!(UserOrder, UserOrderField, UserSortField {
    UserName,
    DisplayName,
    EmailValidated,
});
define_order_input!(AuditLogOrder, AuditLogOrderField, AuditLogSortField {
    Timestamp,
    InitiatedBy,
    Action,
    Resource,
});

// -----------------------------------------------------------------------------
// Filters
// -----------------------------------------------------------------------------

#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonValue {
    Equal,
    NotEqual,
}

impl From<ComparisonValue> for Comparison {
    fn from(value: ComparisonValue) -> Self {
        match value {
            ComparisonValue::Equal => Comparison::Equal,
            ComparisonValue::NotEqual => Comparison::NotEqual,
        }
    }
}

#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainFilterCategory {
    HttpsStatus,
    DmarcStatus,
    SpfStatus,
    DkimStatus,
}

/// One domain status filter, e.g. `HTTPS_STATUS NOT_EQUAL PASS`.
#[derive(InputObject, Clone, Copy, Debug)]
pub struct DomainFilter {
    pub filter_category: DomainFilterCategory,
    pub comparison: ComparisonValue,
    pub filter_value: StatusValue,
}

impl From<DomainFilter> for FilterCondition<DomainFilterField> {
    fn from(f: DomainFilter) -> Self {
        let field = match f.filter_category {
            DomainFilterCategory::HttpsStatus => DomainFilterField::HttpsStatus,
            DomainFilterCategory::DmarcStatus => DomainFilterField::DmarcStatus,
            DomainFilterCategory::SpfStatus => DomainFilterField::SpfStatus,
            DomainFilterCategory::DkimStatus => DomainFilterField::DkimStatus,
        };
        FilterCondition {
            field,
            comparison: f.comparison.into(),
            value: ScanStatus::from(f.filter_value).as_str().to_string(),
        }
    }
}

/// Audit log action filter.
#[derive(InputObject, Clone, Copy, Debug)]
pub struct AuditLogFilter {
    #[graphql(default_with = "ComparisonValue::Equal")]
    pub comparison: ComparisonValue,
    pub action: AuditActionValue,
}

impl From<AuditLogFilter> for FilterCondition<AuditLogFilterField> {
    fn from(f: AuditLogFilter) -> Self {
        FilterCondition {
            field: AuditLogFilterField::Action,
            comparison: f.comparison.into(),
            value: AuditAction::from(f.action).as_str().to_string(),
        }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

#[derive(SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// Generate Relay-style connection types (Edge + Connection) with From impl.
macro_rules! define_connection {
    ($node:ty, $core_model:ty, $edge:ident, $connection:ident) => {
        #[derive(SimpleObject)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(SimpleObject)]
        pub struct $connection {
            pub edges: Vec<$edge>,
            pub page_info: PageInfo,
            pub total_count: i64,
        }

        impl From<warden_core::ports::Connection<$core_model>> for $connection {
            fn from(conn: warden_core::ports::Connection<$core_model>) -> Self {
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: <$node>::from(e.node),
                            cursor: e.cursor.value,
                        })
                        .collect(),
                    page_info: PageInfo {
                        has_next_page: conn.page_info.has_next_page,
                        has_previous_page: conn.page_info.has_previous_page,
                        start_cursor: conn.page_info.start_cursor.map(|c| c.value),
                        end_cursor: conn.page_info.end_cursor.map(|c| c.value),
                    },
                    total_count: i64::try_from(conn.total_count).unwrap_or(i64::MAX),
                }
            }
        }
    };
}

define_connection!(Organization, models::Organization, OrganizationEdge, OrganizationConnection);
define_connection!(Domain, models::Domain, DomainEdge, DomainConnection);
define_connection!(User, models::User, UserEdge, UserConnection);
define_connection!(AuditLog, models::AuditLog, AuditLogEdge, AuditLogConnection);
