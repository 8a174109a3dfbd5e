//! Static entity-type registry.
//!
//! One entry per soft-deletable entity type, naming the relation keys that
//! must be stripped before an archived payload can be reinserted and the
//! retention window after which archive records become purgeable. Built
//! once at startup and injected by reference into the components that need
//! it; call sites never carry per-table exclusion knowledge themselves.

use std::collections::{BTreeSet, HashMap};

use crate::error::{RecycleError, RecycleResult};

/// Default retention window for archive records, in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Per-entity-type restore and retention policy.
#[derive(Debug, Clone)]
pub struct EntityPolicy {
    /// Relation keys embedded in archived payloads (joined sub-objects)
    /// that would violate the origin table's schema if reinserted verbatim.
    pub excluded_fields_on_restore: BTreeSet<String>,
    /// Days an archive record is kept before it is eligible for purge.
    pub retention_days: u32,
}

impl EntityPolicy {
    pub fn new() -> Self {
        Self {
            excluded_fields_on_restore: BTreeSet::new(),
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }

    /// Mark a relation key as stripped on restore.
    pub fn exclude(mut self, field: &str) -> Self {
        self.excluded_fields_on_restore.insert(field.to_string());
        self
    }

    /// Override the retention window.
    pub fn retention_days(mut self, days: u32) -> Self {
        self.retention_days = days;
        self
    }
}

impl Default for EntityPolicy {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable entity-type → policy lookup table.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entries: HashMap<String, EntityPolicy>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity type. Consuming builder style; intended for startup
    /// construction only.
    pub fn register(mut self, entity_type: &str, policy: EntityPolicy) -> Self {
        self.entries.insert(entity_type.to_string(), policy);
        self
    }

    /// Resolve the policy for an entity type.
    pub fn lookup(&self, entity_type: &str) -> RecycleResult<&EntityPolicy> {
        self.entries
            .get(entity_type)
            .ok_or_else(|| RecycleError::UnknownEntityType(entity_type.to_string()))
    }

    /// Returns `true` if `entity_type` is registered.
    pub fn contains(&self, entity_type: &str) -> bool {
        self.entries.contains_key(entity_type)
    }

    /// Iterate over all registered entity types and their policies.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntityPolicy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The registry for the admin dashboard's soft-deletable tables.
    ///
    /// Exclusions cover the relation sub-objects the dashboard's list
    /// queries embed into rows (and therefore into archived payloads):
    /// registrations and signups carry a joined `seminars` object,
    /// invoices a joined `users` object, and user subscriptions both a
    /// `subscription` and a `users` object.
    pub fn standard() -> Self {
        Self::new()
            .register("contact_us_messages", EntityPolicy::new())
            .register("invoice", EntityPolicy::new().exclude("users"))
            .register(
                "seminar_registration",
                EntityPolicy::new().exclude("seminars"),
            )
            .register("seminar_signup", EntityPolicy::new().exclude("seminars"))
            .register("seminars", EntityPolicy::new())
            .register("subscription", EntityPolicy::new())
            .register(
                "user_subscription",
                EntityPolicy::new().exclude("subscription").exclude("users"),
            )
            .register("users", EntityPolicy::new())
            .register("vip_tiers", EntityPolicy::new())
    }
}
