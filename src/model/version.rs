use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{generate_id, Id};

/// An immutable snapshot of a pacticipant. The number is opaque (a git sha, a
/// semver string, a build number...) and is never parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: Id,
    pub pacticipant_id: Id,
    pub number: String,
    /// Creation order within the relation, used to break timestamp ties
    pub order: i64,
    pub created_at: DateTime<Utc>,
}

impl Version {
    pub fn new(pacticipant_id: Id, number: String, order: i64) -> Self {
        Self {
            id: generate_id(),
            pacticipant_id,
            number,
            order,
            created_at: Utc::now(),
        }
    }

    /// Newer-than comparison: creation timestamp first, then creation order.
    pub fn is_newer_than(&self, other: &Version) -> bool {
        (self.created_at, self.order) > (other.created_at, other.order)
    }
}

/// A named line of development for a pacticipant.
///
/// The head is held here rather than as a flag on each version, so a branch can
/// never have two heads at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Id,
    pub pacticipant_id: Id,
    pub name: String,
    pub head_version_id: Option<Id>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Branch {
    pub fn new(pacticipant_id: Id, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            pacticipant_id,
            name,
            head_version_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_head(&self, version_id: &Id) -> bool {
        self.head_version_id.as_ref() == Some(version_id)
    }
}

/// Membership of a version in a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchVersion {
    pub pacticipant_id: Id,
    pub branch_name: String,
    pub version_id: Id,
    pub created_at: DateTime<Utc>,
}

/// Branch association as seen from a single version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchMembership {
    pub name: String,
    pub is_head: bool,
}

/// A free-form label applied to a version (e.g. "prod", "feat-x")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub version_id: Id,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: String, version_id: Id) -> Self {
        Self {
            name,
            version_id,
            created_at: Utc::now(),
        }
    }
}
