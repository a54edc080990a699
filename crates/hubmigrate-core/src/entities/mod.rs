//! Entity categories and their legacy → target schema mappings.
//!
//! Each submodule owns one category: which legacy fields it reads, how the
//! document key is derived and what the target document looks like.

pub mod certificates;
pub mod events;
pub mod registrations;
pub mod socials;
pub mod team;
pub mod users;

use crate::record::TargetRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A category of legacy data, migrated as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entity {
    Team,
    Events,
    Users,
    Socials,
    Certificates,
    Registrations,
}

impl Entity {
    /// Every category, in the order a full run migrates them.
    ///
    /// Users precede certificates and registrations, which enumerate them.
    pub const ALL: [Entity; 6] = [
        Entity::Team,
        Entity::Events,
        Entity::Users,
        Entity::Socials,
        Entity::Certificates,
        Entity::Registrations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Entity::Team => "team",
            Entity::Events => "events",
            Entity::Users => "users",
            Entity::Socials => "socials",
            Entity::Certificates => "certificates",
            Entity::Registrations => "registrations",
        }
    }

    /// Target collection name.
    pub fn collection(&self) -> &'static str {
        self.as_str()
    }

    /// Human label used in progress messages.
    pub fn label(&self) -> &'static str {
        match self {
            Entity::Team => "Team",
            Entity::Events => "Events",
            Entity::Users => "Users",
            Entity::Socials => "Socials",
            Entity::Certificates => "Certificates",
            Entity::Registrations => "Registrations",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Entity::ALL
            .into_iter()
            .find(|e| e.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| format!("unknown entity '{}'", s))
    }
}

/// Output of a per-record mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Mapped {
    pub record: TargetRecord,
    /// The key was generated, not derived; re-runs will duplicate this record.
    pub synthetic_key: bool,
}

impl Mapped {
    pub fn derived(record: TargetRecord) -> Self {
        Self {
            record,
            synthetic_key: false,
        }
    }

    pub fn synthetic(record: TargetRecord) -> Self {
        Self {
            record,
            synthetic_key: true,
        }
    }
}

/// A migrated user, as seen by the per-user migrations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    /// Target document key of the user.
    pub key: String,
    pub email: String,
}
