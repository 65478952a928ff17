use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{generate_id, Id};

/// A deployment target such as "test" or "production"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub id: Id,
    pub name: String,
    pub display_name: Option<String>,
    pub production: bool,
    /// Whether several deployments of one pacticipant may be current at once
    /// (blue/green, per-tenant instances...), distinguished by target name.
    pub allows_multiple_targets: bool,
    pub created_at: DateTime<Utc>,
}

/// Input model for creating an environment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEnvironment {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub production: bool,
    #[serde(default)]
    pub allows_multiple_targets: bool,
}

impl NewEnvironment {
    pub fn named(name: &str, production: bool) -> Self {
        Self {
            name: name.to_string(),
            production,
            ..Self::default()
        }
    }

    pub fn into_environment(self) -> Environment {
        Environment {
            id: generate_id(),
            name: self.name,
            display_name: self.display_name,
            production: self.production,
            allows_multiple_targets: self.allows_multiple_targets,
            created_at: Utc::now(),
        }
    }
}

/// Record of a version being deployed to an environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedVersion {
    pub id: Id,
    pub pacticipant_id: Id,
    pub version_id: Id,
    pub environment_id: Id,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub currently_deployed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undeployed_at: Option<DateTime<Utc>>,
    pub order: i64,
}

impl DeployedVersion {
    pub fn new(
        pacticipant_id: Id,
        version_id: Id,
        environment_id: Id,
        target: Option<String>,
        order: i64,
    ) -> Self {
        Self {
            id: generate_id(),
            pacticipant_id,
            version_id,
            environment_id,
            target,
            currently_deployed: true,
            created_at: Utc::now(),
            undeployed_at: None,
            order,
        }
    }

    pub fn mark_undeployed(&mut self) {
        self.currently_deployed = false;
        self.undeployed_at = Some(Utc::now());
    }
}

/// Record of a version being released (e.g. a mobile app build) into an
/// environment. Several released versions can be supported at once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleasedVersion {
    pub id: Id,
    pub pacticipant_id: Id,
    pub version_id: Id,
    pub environment_id: Id,
    pub currently_supported: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub support_ended_at: Option<DateTime<Utc>>,
    pub order: i64,
}

impl ReleasedVersion {
    pub fn new(pacticipant_id: Id, version_id: Id, environment_id: Id, order: i64) -> Self {
        Self {
            id: generate_id(),
            pacticipant_id,
            version_id,
            environment_id,
            currently_supported: true,
            created_at: Utc::now(),
            support_ended_at: None,
            order,
        }
    }

    pub fn end_support(&mut self) {
        self.currently_supported = false;
        self.support_ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_environment_defaults() {
        let parsed: NewEnvironment = serde_json::from_str(r#"{"name": "test"}"#).unwrap();
        assert_eq!(parsed.name, "test");
        assert!(!parsed.production);
        assert!(!parsed.allows_multiple_targets);

        let production = NewEnvironment::named("production", true).into_environment();
        assert!(production.production);
    }

    #[test]
    fn test_deployment_lifecycle() {
        let mut deployed = DeployedVersion::new("p".into(), "v".into(), "e".into(), None, 1);
        assert!(deployed.currently_deployed);
        assert!(deployed.undeployed_at.is_none());

        deployed.mark_undeployed();
        assert!(!deployed.currently_deployed);
        assert!(deployed.undeployed_at.is_some());

        let mut released = ReleasedVersion::new("p".into(), "v".into(), "e".into(), 2);
        released.end_support();
        assert!(!released.currently_supported);
    }
}
