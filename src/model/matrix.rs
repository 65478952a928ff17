use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{SelectorKind, UnresolvedSelector};

/// Which verification record is authoritative when several could apply
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LatestBy {
    /// Consumer version / provider: one outcome per provider, taken from the
    /// most recent verification across the requested provider versions
    #[default]
    Cvp,
    /// Consumer version / provider version: one outcome per requested
    /// provider version
    Cvpv,
}

impl std::fmt::Display for LatestBy {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            LatestBy::Cvp => write!(f, "cvp"),
            LatestBy::Cvpv => write!(f, "cvpv"),
        }
    }
}

impl std::str::FromStr for LatestBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cvp" => Ok(LatestBy::Cvp),
            "cvpv" => Ok(LatestBy::Cvpv),
            _ => Err(format!("Unknown latestby mode: {}", s)),
        }
    }
}

/// How a pairing verified against some other provider version counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerifiedElsewherePolicy {
    /// Cannot be evaluated: the verdict becomes unknown
    #[default]
    Unknown,
    /// Count as verified
    Allow,
    /// Count as not verified
    Deny,
}

/// Options accompanying the selectors of a matrix query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_branch: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latestby: Option<LatestBy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verified_elsewhere: Option<VerifiedElsewherePolicy>,
}

impl MatrixOptions {
    /// Options for "can this version be deployed to the environment"
    pub fn for_environment(environment_name: &str) -> Self {
        Self {
            environment_name: Some(environment_name.to_string()),
            latestby: Some(LatestBy::Cvp),
            ..Self::default()
        }
    }

    /// Options for "can this version be merged": compare against the main
    /// branch head of every counterpart
    pub fn for_merge() -> Self {
        Self {
            main_branch: Some(true),
            latest: Some(true),
            latestby: Some(LatestBy::Cvp),
            ..Self::default()
        }
    }

    pub fn with_latestby(mut self, latestby: LatestBy) -> Self {
        self.latestby = Some(latestby);
        self
    }

    pub fn with_verified_elsewhere(mut self, policy: VerifiedElsewherePolicy) -> Self {
        self.verified_elsewhere = Some(policy);
        self
    }

    /// Which counterpart versions the selected versions are compared against
    pub fn target_kind(&self, resolved_selector_count: usize) -> TargetKind {
        if let Some(environment) = &self.environment_name {
            return TargetKind::Environment(environment.clone());
        }
        if self.main_branch == Some(true) {
            return TargetKind::MainBranch;
        }
        if self.latest != Some(true) && resolved_selector_count > 1 {
            return TargetKind::Selected;
        }
        TargetKind::Latest
    }
}

/// Comparison target for the counterpart side of a pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TargetKind {
    /// Versions currently deployed or released to the environment
    Environment(String),
    /// Head of the counterpart's main branch
    MainBranch,
    /// Newest counterpart version
    Latest,
    /// Only the versions named by the other selectors of the query
    Selected,
}

/// Where a version in a row came from; decides how the reason text reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Origin {
    Selected,
    Environment(String),
    Branch(String),
    UnconfiguredMainBranch,
    Latest,
}

/// One side of a matrix row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub pacticipant_name: String,
    pub version_number: Option<String>,
    pub origin: Origin,
}

impl VersionDescriptor {
    pub fn selected(pacticipant_name: &str, version_number: &str) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            version_number: Some(version_number.to_string()),
            origin: Origin::Selected,
        }
    }

    pub fn new(pacticipant_name: &str, version_number: Option<&str>, origin: Origin) -> Self {
        Self {
            pacticipant_name: pacticipant_name.to_string(),
            version_number: version_number.map(str::to_string),
            origin,
        }
    }

    pub fn describe(&self) -> String {
        let name = &self.pacticipant_name;
        match (&self.origin, &self.version_number) {
            (Origin::Selected, Some(number)) => format!("version {} of {}", number, name),
            (Origin::Selected, None) => format!("a version of {}", name),
            (Origin::Environment(environment), Some(number)) => format!(
                "the version of {} currently in {} ({})",
                name, environment, number
            ),
            (Origin::Environment(environment), None) => format!(
                "a version of {} currently in {} (no version is currently recorded as deployed/released in this environment)",
                name, environment
            ),
            (Origin::Branch(branch), Some(number)) => format!(
                "the latest version of {} from branch {} ({})",
                name, branch, number
            ),
            (Origin::Branch(branch), None) => format!(
                "a version of {} from branch {} (no such version exists)",
                name, branch
            ),
            (Origin::UnconfiguredMainBranch, _) => format!(
                "a version of {} from its main branch (no main branch is configured)",
                name
            ),
            (Origin::Latest, Some(number)) => {
                format!("the latest version of {} ({})", name, number)
            }
            (Origin::Latest, None) => format!("a version of {} (no versions exist)", name),
        }
    }
}

/// Terminal state of a single pairing evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingStatus {
    Verified,
    VerifiedElsewhere,
    Failed,
    Unverified,
    NoPact,
    Unresolvable,
}

impl PairingStatus {
    pub fn verdict(&self, policy: VerifiedElsewherePolicy) -> Verdict {
        match self {
            PairingStatus::Verified => Verdict::Deployable,
            PairingStatus::Failed | PairingStatus::Unverified | PairingStatus::NoPact => {
                Verdict::NotDeployable
            }
            PairingStatus::Unresolvable => Verdict::Unknown,
            PairingStatus::VerifiedElsewhere => match policy {
                VerifiedElsewherePolicy::Unknown => Verdict::Unknown,
                VerifiedElsewherePolicy::Allow => Verdict::Deployable,
                VerifiedElsewherePolicy::Deny => Verdict::NotDeployable,
            },
        }
    }
}

/// Three-valued deploy/merge verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Deployable,
    NotDeployable,
    /// Cannot be evaluated yet; distinct from "known incompatible"
    Unknown,
}

impl Verdict {
    /// A known incompatibility outweighs an unknown, which outweighs success
    pub fn combine(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::NotDeployable, _) | (_, Verdict::NotDeployable) => Verdict::NotDeployable,
            (Verdict::Unknown, _) | (_, Verdict::Unknown) => Verdict::Unknown,
            _ => Verdict::Deployable,
        }
    }

    pub fn from_all(verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
        verdicts
            .into_iter()
            .fold(Verdict::Deployable, Verdict::combine)
    }

    /// Wire encoding: `null` stands for unknown
    pub fn as_option(&self) -> Option<bool> {
        match self {
            Verdict::Deployable => Some(true),
            Verdict::NotDeployable => Some(false),
            Verdict::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub id: String,
    pub success: bool,
    pub provider_version_number: String,
    pub execution_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_url: Option<String>,
}

/// One evaluated consumer/provider pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixRow {
    pub consumer: VersionDescriptor,
    pub provider: VersionDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pact_content_sha: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationSummary>,
    pub status: PairingStatus,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedSelectorReport {
    pub pacticipant_name: String,
    pub version_number: String,
    pub kind: SelectorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedSelectorReport {
    pub selector: UnresolvedSelector,
    pub code: String,
    pub message: String,
}

/// Everything a matrix query computed, before decoration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
    pub selectors: Vec<UnresolvedSelector>,
    pub options: MatrixOptions,
    pub resolved_selectors: Vec<ResolvedSelectorReport>,
    pub unresolved_selectors: Vec<UnresolvedSelectorReport>,
    pub rows: Vec<MatrixRow>,
    pub warnings: Vec<String>,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latestby_parsing() {
        assert_eq!("cvp".parse::<LatestBy>().unwrap(), LatestBy::Cvp);
        assert_eq!("CVPV".parse::<LatestBy>().unwrap(), LatestBy::Cvpv);
        assert!("cp".parse::<LatestBy>().is_err());
        assert_eq!(LatestBy::Cvpv.to_string(), "cvpv");
        assert_eq!(LatestBy::default(), LatestBy::Cvp);
        assert_eq!(
            VerifiedElsewherePolicy::default(),
            VerifiedElsewherePolicy::Unknown
        );

        let options: MatrixOptions =
            serde_json::from_str(r#"{"latestby": "cvpv", "environment_name": "production"}"#)
                .unwrap();
        assert_eq!(options.latestby, Some(LatestBy::Cvpv));
    }

    #[test]
    fn test_target_kind_selection() {
        assert_eq!(
            MatrixOptions::for_environment("production").target_kind(1),
            TargetKind::Environment("production".to_string())
        );
        assert_eq!(MatrixOptions::for_merge().target_kind(1), TargetKind::MainBranch);
        assert_eq!(MatrixOptions::default().target_kind(1), TargetKind::Latest);
        assert_eq!(MatrixOptions::default().target_kind(2), TargetKind::Selected);
    }

    #[test]
    fn test_verdict_combination() {
        use Verdict::*;
        assert_eq!(Verdict::from_all(vec![]), Deployable);
        assert_eq!(Verdict::from_all(vec![Deployable, Unknown]), Unknown);
        assert_eq!(Verdict::from_all(vec![Unknown, NotDeployable]), NotDeployable);
        assert_eq!(Deployable.as_option(), Some(true));
        assert_eq!(NotDeployable.as_option(), Some(false));
        assert_eq!(Unknown.as_option(), None);
    }

    #[test]
    fn test_verified_elsewhere_policy() {
        let status = PairingStatus::VerifiedElsewhere;
        assert_eq!(status.verdict(VerifiedElsewherePolicy::Unknown), Verdict::Unknown);
        assert_eq!(status.verdict(VerifiedElsewherePolicy::Allow), Verdict::Deployable);
        assert_eq!(status.verdict(VerifiedElsewherePolicy::Deny), Verdict::NotDeployable);
        assert_eq!(
            PairingStatus::Unresolvable.verdict(VerifiedElsewherePolicy::Allow),
            Verdict::Unknown
        );
    }

    #[test]
    fn test_version_descriptions() {
        assert_eq!(
            VersionDescriptor::selected("Foo1", "1").describe(),
            "version 1 of Foo1"
        );
        assert_eq!(
            VersionDescriptor::new("Foo2", None, Origin::Environment("production".into()))
                .describe(),
            "a version of Foo2 currently in production (no version is currently recorded as deployed/released in this environment)"
        );
        assert_eq!(
            VersionDescriptor::new("Foo2", Some("abc"), Origin::Environment("production".into()))
                .describe(),
            "the version of Foo2 currently in production (abc)"
        );
        assert_eq!(
            VersionDescriptor::new("Foo2", Some("p_main_version"), Origin::Branch("foo2main".into()))
                .describe(),
            "the latest version of Foo2 from branch foo2main (p_main_version)"
        );
        assert_eq!(
            VersionDescriptor::new("Foo2", None, Origin::UnconfiguredMainBranch).describe(),
            "a version of Foo2 from its main branch (no main branch is configured)"
        );
    }
}
