use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{PairingStatus, QueryResults};

/// Deploy verdict for one environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployCheck {
    pub deployable: Option<bool>,
    pub reason: String,
    pub executed_at: String,
}

/// Merge verdict for one branch head
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeCheck {
    pub can_merge: Option<bool>,
    pub reason: String,
    pub executed_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixSummary {
    pub deployable: Option<bool>,
    pub reason: String,
    pub success: usize,
    pub failed: usize,
    pub unknown: usize,
}

/// Presents query results the way callers consume them
pub struct MatrixDecorator<'a> {
    results: &'a QueryResults,
}

impl<'a> MatrixDecorator<'a> {
    pub fn new(results: &'a QueryResults) -> Self {
        Self { results }
    }

    pub fn deployable(&self) -> Option<bool> {
        self.results.verdict.as_option()
    }

    pub fn reason(&self) -> String {
        self.results.reasons.join("; ")
    }

    pub fn summary(&self) -> MatrixSummary {
        let rows = &self.results.rows;
        let count = |wanted: &[PairingStatus]| {
            rows.iter().filter(|row| wanted.contains(&row.status)).count()
        };
        MatrixSummary {
            deployable: self.deployable(),
            reason: self.reason(),
            success: count(&[PairingStatus::Verified]),
            failed: count(&[
                PairingStatus::Failed,
                PairingStatus::Unverified,
                PairingStatus::NoPact,
            ]),
            unknown: count(&[PairingStatus::Unresolvable, PairingStatus::VerifiedElsewhere])
                + self.results.unresolved_selectors.len(),
        }
    }

    pub fn deploy_check(&self) -> DeployCheck {
        DeployCheck {
            deployable: self.deployable(),
            reason: self.reason(),
            executed_at: executed_at(),
        }
    }

    pub fn merge_check(&self) -> MergeCheck {
        MergeCheck {
            can_merge: self.deployable(),
            reason: self.reason(),
            executed_at: executed_at(),
        }
    }
}

fn executed_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MatrixOptions, Verdict};

    fn results(verdict: Verdict, reasons: &[&str]) -> QueryResults {
        QueryResults {
            selectors: Vec::new(),
            options: MatrixOptions::default(),
            resolved_selectors: Vec::new(),
            unresolved_selectors: Vec::new(),
            rows: Vec::new(),
            warnings: Vec::new(),
            verdict,
            reasons: reasons.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_deploy_check() {
        let results = results(Verdict::Unknown, &["first", "second"]);
        let check = MatrixDecorator::new(&results).deploy_check();

        assert_eq!(check.deployable, None);
        assert_eq!(check.reason, "first; second");
        assert!(check.executed_at.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&check.executed_at).is_ok());

        let json = serde_json::to_value(&check).unwrap();
        assert!(json["deployable"].is_null());
    }

    #[test]
    fn test_merge_check_uses_can_merge() {
        let results = results(Verdict::NotDeployable, &["nope"]);
        let check = MatrixDecorator::new(&results).merge_check();
        assert_eq!(check.can_merge, Some(false));

        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["can_merge"], serde_json::json!(false));
    }
}
