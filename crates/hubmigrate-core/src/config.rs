//! Centralized configuration for the migration engine.
//!
//! Legacy endpoint locations are hard-coded defaults relative to a base URL;
//! the only tunables are the batch size (never above the store's atomic-write
//! ceiling), the per-user progress interval and an optional request timeout.

use crate::entities::Entity;
use crate::error::{MigrationError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// HTTP method used to query a legacy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single legacy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub url: String,
    pub method: HttpMethod,
}

impl Endpoint {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Post,
        }
    }
}

/// The six legacy endpoints, one per entity category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyEndpoints {
    pub team: Endpoint,
    pub events: Endpoint,
    pub users: Endpoint,
    pub socials: Endpoint,
    /// Scoped to one user through the `email` request header.
    pub certificates: Endpoint,
    /// Scoped to one user through the `email` request header.
    pub registrations: Endpoint,
}

impl LegacyEndpoints {
    /// Build the endpoint set under a base URL (no trailing slash needed).
    pub fn from_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            team: Endpoint::get(format!("{base}/team/getall")),
            events: Endpoint::get(format!("{base}/events/getall")),
            users: Endpoint::get(format!("{base}/users/getall")),
            socials: Endpoint::get(format!("{base}/socials/getall")),
            certificates: Endpoint::post(format!("{base}/certificates/byemail")),
            registrations: Endpoint::post(format!("{base}/registrations/byemail")),
        }
    }

    /// Endpoint for an entity category.
    pub fn get(&self, entity: Entity) -> &Endpoint {
        match entity {
            Entity::Team => &self.team,
            Entity::Events => &self.events,
            Entity::Users => &self.users,
            Entity::Socials => &self.socials,
            Entity::Certificates => &self.certificates,
            Entity::Registrations => &self.registrations,
        }
    }
}

impl Default for LegacyEndpoints {
    fn default() -> Self {
        Self::from_base_url(MigrationConfig::DEFAULT_LEGACY_BASE_URL)
    }
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    pub endpoints: LegacyEndpoints,
    /// Records per atomic batch commit.
    pub batch_limit: usize,
    /// Emit a progress report every this many users in per-user migrations.
    pub user_progress_interval: usize,
    /// Per-request timeout for legacy fetches. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl MigrationConfig {
    /// The target store's atomic-write ceiling.
    pub const BATCH_LIMIT: usize = 450;
    pub const USER_PROGRESS_INTERVAL: usize = 10;
    pub const DEFAULT_LEGACY_BASE_URL: &'static str = "https://legacy.community-hub.org/api";
    /// Header carrying the user scope on per-user endpoints.
    pub const EMAIL_HEADER: &'static str = "email";
    pub const USER_AGENT: &'static str = "hubmigrate/0.3";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_legacy_base_url(mut self, base_url: &str) -> Self {
        self.endpoints = LegacyEndpoints::from_base_url(base_url);
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    pub fn with_user_progress_interval(mut self, interval: usize) -> Self {
        self.user_progress_interval = interval;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check the configuration before a run.
    pub fn validate(&self) -> Result<()> {
        if self.batch_limit == 0 || self.batch_limit > Self::BATCH_LIMIT {
            return Err(MigrationError::Validation {
                field: "batch_limit".into(),
                message: format!(
                    "must be between 1 and {}, got {}",
                    Self::BATCH_LIMIT,
                    self.batch_limit
                ),
            });
        }

        if self.user_progress_interval == 0 {
            return Err(MigrationError::Validation {
                field: "user_progress_interval".into(),
                message: "must be at least 1".into(),
            });
        }

        for entity in Entity::ALL {
            let endpoint = self.endpoints.get(entity);
            let parsed = url::Url::parse(&endpoint.url).map_err(|e| MigrationError::Config {
                message: format!("Invalid {} endpoint '{}': {}", entity, endpoint.url, e),
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(MigrationError::Config {
                    message: format!(
                        "Unsupported scheme for {} endpoint: {}",
                        entity,
                        parsed.scheme()
                    ),
                });
            }
        }

        Ok(())
    }
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            endpoints: LegacyEndpoints::default(),
            batch_limit: Self::BATCH_LIMIT,
            user_progress_interval: Self::USER_PROGRESS_INTERVAL,
            request_timeout: None,
        }
    }
}
