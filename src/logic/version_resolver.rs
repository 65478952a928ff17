use log::debug;

use crate::error::{MatrixError, ResolutionError};
use crate::model::{
    Origin, Pacticipant, SelectorKind, TargetKind, UnresolvedSelector, Version, VersionDescriptor,
};
use crate::store::traits::Store;

/// A selection outcome that is either a version or a business-level reason why not
pub type Resolution<T> = Result<T, ResolutionError>;

/// A selector pinned to one concrete version
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedVersion {
    pub pacticipant: Pacticipant,
    pub version: Version,
    pub selector: UnresolvedSelector,
    pub kind: SelectorKind,
}

impl ResolvedVersion {
    pub fn descriptor(&self) -> VersionDescriptor {
        VersionDescriptor::selected(&self.pacticipant.name, &self.version.number)
    }
}

/// The counterpart versions a selected version is compared against
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTarget {
    pub pacticipant: Pacticipant,
    pub origin: Origin,
    /// Newest first
    pub versions: Vec<Version>,
    pub failure: Option<ResolutionError>,
}

impl ComparisonTarget {
    fn resolved(pacticipant: &Pacticipant, origin: Origin, versions: Vec<Version>) -> Self {
        Self {
            pacticipant: pacticipant.clone(),
            origin,
            versions,
            failure: None,
        }
    }

    fn failed(pacticipant: &Pacticipant, origin: Origin, failure: ResolutionError) -> Self {
        Self {
            pacticipant: pacticipant.clone(),
            origin,
            versions: Vec::new(),
            failure: Some(failure),
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.versions.is_empty()
    }

    pub fn descriptor(&self, version: Option<&Version>) -> VersionDescriptor {
        VersionDescriptor::new(
            &self.pacticipant.name,
            version.map(|v| v.number.as_str()),
            self.origin.clone(),
        )
    }
}

pub struct VersionResolver;

impl VersionResolver {
    /// Pin a selector to a single version. The outer error is an
    /// infrastructure failure, the inner one a business outcome.
    pub async fn resolve<S: Store + ?Sized>(
        store: &S,
        selector: &UnresolvedSelector,
    ) -> Result<Resolution<ResolvedVersion>, MatrixError> {
        let Some(pacticipant) = store
            .find_pacticipant_by_name(&selector.pacticipant_name)
            .await?
        else {
            return Ok(Err(ResolutionError::PacticipantNotFound {
                name: selector.pacticipant_name.clone(),
            }));
        };

        let kind = selector.kind();
        let version = match &kind {
            SelectorKind::Version(number) => store
                .find_version(&pacticipant.id, number)
                .await?
                .ok_or_else(|| ResolutionError::NoMatchingVersion {
                    pacticipant: pacticipant.name.clone(),
                    criteria: format!("with number {}", number),
                }),
            SelectorKind::Branch(branch) => Self::branch_head(store, &pacticipant, branch).await?,
            SelectorKind::MainBranch => match &pacticipant.main_branch {
                Some(branch) => Self::branch_head(store, &pacticipant, branch).await?,
                None => Err(ResolutionError::NoMainBranchConfigured {
                    pacticipant: pacticipant.name.clone(),
                }),
            },
            SelectorKind::Tag(tag) => store
                .find_latest_version_with_tag(&pacticipant.id, tag)
                .await?
                .ok_or_else(|| ResolutionError::NoMatchingVersion {
                    pacticipant: pacticipant.name.clone(),
                    criteria: format!("with tag {}", tag),
                }),
            SelectorKind::Environment(environment) => {
                Self::environment_versions(store, &pacticipant, environment)
                    .await?
                    .and_then(|versions| {
                        versions.into_iter().next().ok_or_else(|| {
                            ResolutionError::NoCurrentlyDeployedVersion {
                                pacticipant: pacticipant.name.clone(),
                                environment: environment.clone(),
                            }
                        })
                    })
            }
            SelectorKind::Latest => store
                .find_latest_version(&pacticipant.id)
                .await?
                .ok_or_else(|| ResolutionError::NoMatchingVersion {
                    pacticipant: pacticipant.name.clone(),
                    criteria: "at all".to_string(),
                }),
        };

        match &version {
            Ok(version) => debug!(
                "Resolved {} to version {}",
                selector.description(),
                version.number
            ),
            Err(reason) => debug!("Could not resolve {}: {}", selector.description(), reason),
        }

        Ok(version.map(|version| ResolvedVersion {
            pacticipant,
            version,
            selector: selector.clone(),
            kind,
        }))
    }

    /// Resolve the counterpart versions for the other side of a pairing
    pub async fn resolve_target<S: Store + ?Sized>(
        store: &S,
        counterpart: &Pacticipant,
        kind: &TargetKind,
        selected: &[ResolvedVersion],
    ) -> Result<ComparisonTarget, MatrixError> {
        let target = match kind {
            TargetKind::Environment(environment) => {
                let origin = Origin::Environment(environment.clone());
                match Self::environment_versions(store, counterpart, environment).await? {
                    Ok(versions) if !versions.is_empty() => {
                        ComparisonTarget::resolved(counterpart, origin, versions)
                    }
                    Ok(_) => ComparisonTarget::failed(
                        counterpart,
                        origin,
                        ResolutionError::NoCurrentlyDeployedVersion {
                            pacticipant: counterpart.name.clone(),
                            environment: environment.clone(),
                        },
                    ),
                    Err(failure) => ComparisonTarget::failed(counterpart, origin, failure),
                }
            }
            TargetKind::MainBranch => match &counterpart.main_branch {
                Some(branch) => {
                    let origin = Origin::Branch(branch.clone());
                    match Self::branch_head(store, counterpart, branch).await? {
                        Ok(head) => ComparisonTarget::resolved(counterpart, origin, vec![head]),
                        Err(failure) => ComparisonTarget::failed(counterpart, origin, failure),
                    }
                }
                None => ComparisonTarget::failed(
                    counterpart,
                    Origin::UnconfiguredMainBranch,
                    ResolutionError::NoMainBranchConfigured {
                        pacticipant: counterpart.name.clone(),
                    },
                ),
            },
            TargetKind::Latest => match store.find_latest_version(&counterpart.id).await? {
                Some(latest) => ComparisonTarget::resolved(counterpart, Origin::Latest, vec![latest]),
                None => ComparisonTarget::failed(
                    counterpart,
                    Origin::Latest,
                    ResolutionError::NoMatchingVersion {
                        pacticipant: counterpart.name.clone(),
                        criteria: "at all".to_string(),
                    },
                ),
            },
            TargetKind::Selected => {
                let mut versions: Vec<Version> = selected
                    .iter()
                    .filter(|r| r.pacticipant.id == counterpart.id)
                    .map(|r| r.version.clone())
                    .collect();
                versions.sort_by_key(|v| std::cmp::Reverse((v.created_at, v.order)));
                versions.dedup_by(|a, b| a.id == b.id);
                ComparisonTarget::resolved(counterpart, Origin::Selected, versions)
            }
        };
        Ok(target)
    }

    async fn branch_head<S: Store + ?Sized>(
        store: &S,
        pacticipant: &Pacticipant,
        branch: &str,
    ) -> Result<Resolution<Version>, MatrixError> {
        Ok(store
            .find_branch_head(&pacticipant.id, branch)
            .await?
            .ok_or_else(|| ResolutionError::NoBranchHead {
                pacticipant: pacticipant.name.clone(),
                branch: branch.to_string(),
            }))
    }

    /// Versions currently deployed or released to the environment, most
    /// recent record first. An unknown environment cannot be resolved at all.
    async fn environment_versions<S: Store + ?Sized>(
        store: &S,
        pacticipant: &Pacticipant,
        environment_name: &str,
    ) -> Result<Resolution<Vec<Version>>, MatrixError> {
        let Some(environment) = store.find_environment_by_name(environment_name).await? else {
            return Ok(Err(ResolutionError::Unresolvable {
                pacticipant: pacticipant.name.clone(),
                detail: format!("no environment named {} exists", environment_name),
            }));
        };

        let deployed = store
            .find_currently_deployed_versions(&pacticipant.id, &environment.id)
            .await?;
        let released = store
            .find_currently_supported_versions(&pacticipant.id, &environment.id)
            .await?;

        let mut records: Vec<(i64, String)> = deployed
            .into_iter()
            .map(|d| (d.order, d.version_id))
            .chain(released.into_iter().map(|r| (r.order, r.version_id)))
            .collect();
        records.sort_by_key(|(order, _)| std::cmp::Reverse(*order));

        let mut versions: Vec<Version> = Vec::new();
        for (_, version_id) in records {
            if versions.iter().any(|v| v.id == version_id) {
                continue;
            }
            if let Some(version) = store.get_version(&version_id).await? {
                versions.push(version);
            }
        }
        Ok(Ok(versions))
    }
}
