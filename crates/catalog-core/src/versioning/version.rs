//! Entity version types.
//!
//! Every mutation of a versioned entity produces a new immutable row; exactly
//! one row per entity is current at any time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business payload that can be stored with version history.
pub trait VersionedEntity:
    Serialize + DeserializeOwned + Clone + PartialEq + std::fmt::Debug + Send + Sync + 'static
{
    /// Name used in error messages, e.g. `"Product"`.
    const ENTITY_NAME: &'static str;
    /// Table that holds the version rows. Must be a plain SQL identifier.
    const TABLE: &'static str;
}

/// First version number assigned to a new entity.
pub const INITIAL_VERSION: u32 = 0;

/// What produced a version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Entity was created
    Created,
    /// Business fields were replaced by the caller
    Updated,
    /// Business fields were copied from an older version
    Reverted,
}

impl ChangeKind {
    /// Convert to string for storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Reverted => "reverted",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "reverted" => Some(Self::Reverted),
            _ => None,
        }
    }
}

/// One stored version of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityVersion<T> {
    /// Logical entity this row belongs to
    pub entity_id: Uuid,
    /// Sequential version number within this entity (0, 1, 2...)
    pub version: u32,
    /// Business fields at this version
    pub fields: T,
    /// Whether this row is the entity's present state
    pub is_current: bool,
    /// When this version was written
    pub created_at: DateTime<Utc>,
    /// When a newer version replaced this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_at: Option<DateTime<Utc>>,
    /// What type of change created this version
    pub change: ChangeKind,
    /// Source version for reverts
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_from: Option<u32>,
}

impl<T: VersionedEntity> EntityVersion<T> {
    /// Create the first version of a brand new entity.
    pub fn initial(fields: T, at: DateTime<Utc>) -> Self {
        Self {
            entity_id: Uuid::new_v4(),
            version: INITIAL_VERSION,
            fields,
            is_current: true,
            created_at: at,
            superseded_at: None,
            change: ChangeKind::Created,
            reverted_from: None,
        }
    }

    /// Whether this version was the entity's state at some point during
    /// `[from, to]`, compared at day granularity.
    pub fn active_during(&self, from: NaiveDate, to: NaiveDate) -> bool {
        let started = self.created_at.date_naive();
        let ended = self.superseded_at.map(|at| at.date_naive());
        started <= to && ended.map_or(true, |end| end >= from)
    }
}
