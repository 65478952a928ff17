use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{generate_id, names_match, Id};

/// A named application taking part in contract testing. Whether it acts as a
/// consumer or a provider depends on the pact, not on the pacticipant itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pacticipant {
    pub id: Id,
    pub name: String,
    pub display_name: Option<String>,
    pub repository_url: Option<String>,
    pub main_branch: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Pacticipant {
    pub fn new(name: String) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            name,
            display_name: None,
            repository_url: None,
            main_branch: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn matches_name(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// Input model for registering a pacticipant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPacticipant {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_branch: Option<String>,
}

impl NewPacticipant {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_main_branch(mut self, branch: &str) -> Self {
        self.main_branch = Some(branch.to_string());
        self
    }

    pub fn with_repository_url(mut self, url: &str) -> Self {
        self.repository_url = Some(url.to_string());
        self
    }

    /// Convert to a full Pacticipant with server-generated fields
    pub fn into_pacticipant(self) -> Pacticipant {
        let mut pacticipant = Pacticipant::new(self.name);
        pacticipant.display_name = self.display_name;
        pacticipant.repository_url = self.repository_url;
        pacticipant.main_branch = self.main_branch;
        pacticipant
    }
}
