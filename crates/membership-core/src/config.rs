use core::time::Duration;
use std::collections::BTreeMap;

use membership_wire::Endpoint;
use serde::{Deserialize, Serialize};

use crate::error::{MembershipError, Result};

const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(10);
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_MAX_SUSPECT_TIME: Duration = Duration::from_secs(60);
const DEFAULT_MAX_SHUTDOWN_TIME: Duration = Duration::from_secs(60);
const DEFAULT_SYNC_GROUP: &str = "default";

/// Observer Hub fan-out channel capacity. Not part of spec.md's enumerated
/// configuration (§6); an ambient knob so a slow subscriber lags instead of
/// unboundedly growing memory — see SPEC_FULL.md §15.
const DEFAULT_OBSERVER_CAPACITY: usize = 1024;

/// Immutable configuration, consumed by value at construction.
///
/// Per spec.md §9's redesign note, "builder-style mutator setters before
/// start" become an immutable record: there is no runtime "already started"
/// check because [`MembershipConfigBuilder::build`] is the only way to
/// produce one, and the local lifecycle type takes it by value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct MembershipConfig {
    pub local_endpoint: Endpoint,
    pub local_metadata: BTreeMap<String, String>,
    pub seed_members: Vec<Endpoint>,
    pub sync_group: String,
    pub sync_period: Duration,
    pub sync_timeout: Duration,
    pub max_suspect_time: Duration,
    pub max_shutdown_time: Duration,
    pub observer_capacity: usize,
}

impl MembershipConfig {
    #[must_use]
    pub fn builder(local_endpoint: Endpoint) -> MembershipConfigBuilder {
        MembershipConfigBuilder::new(local_endpoint)
    }
}

/// Builder for [`MembershipConfig`]. Setters are only meaningful before
/// `build()`; once built, the config is immutable for the life of the
/// membership service (spec.md §6: "Setters are effective only before
/// `start()`").
#[derive(Clone, Debug)]
#[must_use]
pub struct MembershipConfigBuilder {
    local_endpoint: Endpoint,
    local_metadata: BTreeMap<String, String>,
    seed_members: Vec<Endpoint>,
    sync_group: String,
    sync_period: Duration,
    sync_timeout: Duration,
    max_suspect_time: Duration,
    max_shutdown_time: Duration,
    observer_capacity: usize,
}

impl MembershipConfigBuilder {
    pub fn new(local_endpoint: Endpoint) -> Self {
        Self {
            local_endpoint,
            local_metadata: BTreeMap::new(),
            seed_members: Vec::new(),
            sync_group: DEFAULT_SYNC_GROUP.to_owned(),
            sync_period: DEFAULT_SYNC_PERIOD,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
            max_suspect_time: DEFAULT_MAX_SUSPECT_TIME,
            max_shutdown_time: DEFAULT_MAX_SHUTDOWN_TIME,
            observer_capacity: DEFAULT_OBSERVER_CAPACITY,
        }
    }

    pub fn local_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.local_metadata = metadata;
        self
    }

    pub fn seed_members(mut self, seeds: Vec<Endpoint>) -> Self {
        self.seed_members = seeds;
        self
    }

    pub fn sync_group(mut self, group: impl Into<String>) -> Self {
        self.sync_group = group.into();
        self
    }

    pub const fn sync_period(mut self, period: Duration) -> Self {
        self.sync_period = period;
        self
    }

    pub const fn sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    pub const fn max_suspect_time(mut self, d: Duration) -> Self {
        self.max_suspect_time = d;
        self
    }

    pub const fn max_shutdown_time(mut self, d: Duration) -> Self {
        self.max_shutdown_time = d;
        self
    }

    pub const fn observer_capacity(mut self, capacity: usize) -> Self {
        self.observer_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<MembershipConfig> {
        if self.sync_group.is_empty() {
            return Err(MembershipError::InvalidConfig("sync_group must not be empty"));
        }
        if self.sync_timeout >= self.sync_period {
            return Err(MembershipError::InvalidConfig(
                "sync_timeout must be shorter than sync_period",
            ));
        }
        Ok(MembershipConfig {
            local_endpoint: self.local_endpoint,
            local_metadata: self.local_metadata,
            seed_members: self.seed_members,
            sync_group: self.sync_group,
            sync_period: self.sync_period,
            sync_timeout: self.sync_timeout,
            max_suspect_time: self.max_suspect_time,
            max_shutdown_time: self.max_shutdown_time,
            observer_capacity: self.observer_capacity,
        })
    }
}
