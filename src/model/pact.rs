use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{content_sha, generate_id, Id};

/// A contract published by one consumer version against one provider.
/// The content is addressed by its SHA-256, so identical content published by
/// different consumer versions shares its verification results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pact {
    pub id: Id,
    pub consumer_id: Id,
    pub consumer_version_id: Id,
    pub provider_id: Id,
    pub content_sha: String,
    pub content: serde_json::Value,
    pub published_at: DateTime<Utc>,
    /// Publication order within the relation
    pub order: i64,
}

impl Pact {
    pub fn new(
        consumer_id: Id,
        consumer_version_id: Id,
        provider_id: Id,
        content: serde_json::Value,
        order: i64,
    ) -> Self {
        Self {
            id: generate_id(),
            consumer_id,
            consumer_version_id,
            provider_id,
            content_sha: content_sha(&content),
            content,
            published_at: Utc::now(),
            order,
        }
    }

    pub fn is_newer_than(&self, other: &Pact) -> bool {
        (self.published_at, self.order) > (other.published_at, other.order)
    }
}

/// The result of running a provider version against a pact's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verification {
    pub id: Id,
    /// The publication that was verified
    pub pact_id: Id,
    pub pact_content_sha: String,
    pub provider_id: Id,
    pub provider_version_id: Id,
    pub success: bool,
    pub execution_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_results: Option<serde_json::Value>,
    pub order: i64,
}

/// Input model for recording a verification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVerification {
    pub provider_version_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_branch: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_results: Option<serde_json::Value>,
}

impl NewVerification {
    pub fn new(provider_version_number: &str, success: bool) -> Self {
        Self {
            provider_version_number: provider_version_number.to_string(),
            provider_branch: None,
            success,
            build_url: None,
            test_results: None,
        }
    }

    pub fn on_branch(mut self, branch: &str) -> Self {
        self.provider_branch = Some(branch.to_string());
        self
    }

    pub fn into_verification(self, pact: &Pact, provider_version_id: Id, order: i64) -> Verification {
        Verification {
            id: generate_id(),
            pact_id: pact.id.clone(),
            pact_content_sha: pact.content_sha.clone(),
            provider_id: pact.provider_id.clone(),
            provider_version_id,
            success: self.success,
            execution_date: Utc::now(),
            build_url: self.build_url,
            test_results: self.test_results,
            order,
        }
    }
}
