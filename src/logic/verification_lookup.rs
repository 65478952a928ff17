use crate::error::MatrixError;
use crate::model::{
    LatestBy, Pact, Pacticipant, PairingStatus, Verification, VerificationSummary, Version,
};
use crate::store::traits::Store;

/// What the relation knows about one consumer version against a provider target
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// A successful verification of the pact by the requested provider version
    Verified(Verification),
    /// The pact content was verified successfully, but by another provider version
    VerifiedElsewhere {
        verification: Verification,
        actual_provider_version: Version,
    },
    /// The latest verification by the requested provider version failed
    Failed(Verification),
    Unverified,
    /// The consumer version has no pact with the provider
    NoPact,
}

impl LookupOutcome {
    pub fn status(&self) -> PairingStatus {
        match self {
            LookupOutcome::Verified(_) => PairingStatus::Verified,
            LookupOutcome::VerifiedElsewhere { .. } => PairingStatus::VerifiedElsewhere,
            LookupOutcome::Failed(_) => PairingStatus::Failed,
            LookupOutcome::Unverified => PairingStatus::Unverified,
            LookupOutcome::NoPact => PairingStatus::NoPact,
        }
    }

    pub fn verification(&self) -> Option<&Verification> {
        match self {
            LookupOutcome::Verified(verification) | LookupOutcome::Failed(verification) => {
                Some(verification)
            }
            LookupOutcome::VerifiedElsewhere { verification, .. } => Some(verification),
            LookupOutcome::Unverified | LookupOutcome::NoPact => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupResult {
    /// The requested provider version this outcome speaks for
    pub provider_version: Version,
    pub pact: Option<Pact>,
    pub outcome: LookupOutcome,
}

impl LookupResult {
    /// Summary of the verification for the row, naming the provider version that ran it
    pub fn verification_summary(&self) -> Option<VerificationSummary> {
        let verification = self.outcome.verification()?;
        let provider_version_number = match &self.outcome {
            LookupOutcome::VerifiedElsewhere {
                actual_provider_version,
                ..
            } => actual_provider_version.number.clone(),
            _ => self.provider_version.number.clone(),
        };
        Some(VerificationSummary {
            id: verification.id.clone(),
            success: verification.success,
            provider_version_number,
            execution_date: verification.execution_date,
            build_url: verification.build_url.clone(),
        })
    }
}

pub struct VerificationLookup;

impl VerificationLookup {
    /// Look up the verification state of a consumer version's pact with a
    /// provider against the requested provider versions (newest first).
    ///
    /// With `cvpv` there is one result per requested provider version. With
    /// `cvp` there is exactly one: the most recent verification across the
    /// requested versions, ties going to the newest provider version.
    pub async fn lookup<S: Store + ?Sized>(
        store: &S,
        consumer_version: &Version,
        provider: &Pacticipant,
        requested: &[Version],
        mode: LatestBy,
    ) -> Result<Vec<LookupResult>, MatrixError> {
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let Some(pact) = store
            .find_latest_pact(&consumer_version.id, &provider.id)
            .await?
        else {
            let requested = match mode {
                LatestBy::Cvpv => requested,
                LatestBy::Cvp => &requested[..1],
            };
            return Ok(requested
                .iter()
                .map(|provider_version| LookupResult {
                    provider_version: provider_version.clone(),
                    pact: None,
                    outcome: LookupOutcome::NoPact,
                })
                .collect());
        };

        let verifications = store
            .find_verifications(&pact.content_sha, &provider.id)
            .await?;

        let mut results = Vec::new();
        match mode {
            LatestBy::Cvpv => {
                for provider_version in requested {
                    let outcome = match Self::latest_for(&verifications, provider_version) {
                        Some(verification) => Self::exact(verification.clone()),
                        None => Self::elsewhere_or_unverified(store, &verifications, requested).await?,
                    };
                    results.push(LookupResult {
                        provider_version: provider_version.clone(),
                        pact: Some(pact.clone()),
                        outcome,
                    });
                }
            }
            LatestBy::Cvp => {
                let latest = requested
                    .iter()
                    .filter_map(|provider_version| {
                        Self::latest_for(&verifications, provider_version)
                            .map(|verification| (provider_version, verification))
                    })
                    .max_by_key(|(provider_version, verification)| {
                        (
                            verification.execution_date,
                            provider_version.created_at,
                            provider_version.order,
                            verification.order,
                        )
                    });
                let result = match latest {
                    Some((provider_version, verification)) => LookupResult {
                        provider_version: provider_version.clone(),
                        pact: Some(pact.clone()),
                        outcome: Self::exact(verification.clone()),
                    },
                    None => LookupResult {
                        provider_version: requested[0].clone(),
                        pact: Some(pact.clone()),
                        outcome: Self::elsewhere_or_unverified(store, &verifications, requested)
                            .await?,
                    },
                };
                results.push(result);
            }
        }
        Ok(results)
    }

    fn latest_for<'a>(
        verifications: &'a [Verification],
        provider_version: &Version,
    ) -> Option<&'a Verification> {
        verifications
            .iter()
            .filter(|v| v.provider_version_id == provider_version.id)
            .max_by_key(|v| (v.execution_date, v.order))
    }

    fn exact(verification: Verification) -> LookupOutcome {
        if verification.success {
            LookupOutcome::Verified(verification)
        } else {
            LookupOutcome::Failed(verification)
        }
    }

    async fn elsewhere_or_unverified<S: Store + ?Sized>(
        store: &S,
        verifications: &[Verification],
        requested: &[Version],
    ) -> Result<LookupOutcome, MatrixError> {
        let elsewhere = verifications
            .iter()
            .filter(|v| v.success)
            .filter(|v| !requested.iter().any(|r| r.id == v.provider_version_id))
            .max_by_key(|v| (v.execution_date, v.order));

        let Some(verification) = elsewhere else {
            return Ok(LookupOutcome::Unverified);
        };
        match store.get_version(&verification.provider_version_id).await? {
            Some(actual_provider_version) => Ok(LookupOutcome::VerifiedElsewhere {
                verification: verification.clone(),
                actual_provider_version,
            }),
            None => Ok(LookupOutcome::Unverified),
        }
    }
}
