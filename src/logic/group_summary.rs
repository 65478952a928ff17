use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::config::MatrixConfig;
use crate::error::MatrixError;
use crate::logic::decorator::{DeployCheck, MergeCheck};
use crate::logic::interaction_graph::{InteractionGraphBuilder, Network};
use crate::logic::matrix::MatrixService;
use crate::model::{Pacticipant, UnresolvedSelector, Version};
use crate::store::traits::Store;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentVersion {
    pub version_number: String,
    pub environment_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_version_number: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Everything shown about a pacticipant on its group page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub pacticipant_name: String,
    pub pacticipant: Option<Pacticipant>,
    pub repository_url: Option<String>,
    pub main_branch: Option<String>,
    pub main_version: Option<Version>,
    pub production_environments: Vec<String>,
    /// Keyed by environment name
    pub can_i_deploy: BTreeMap<String, DeployCheck>,
    pub deployed_versions: Vec<CurrentVersion>,
    pub released_versions: Vec<CurrentVersion>,
    /// Branches other than the main branch, most recently updated first
    pub branches: Vec<BranchSummary>,
    /// Keyed by branch name
    pub can_i_merge: BTreeMap<String, MergeCheck>,
    pub network: Network,
    pub max_pacticipants: usize,
    /// Checks that could not be evaluated, with the error
    pub failures: BTreeMap<String, String>,
}

pub struct PacticipantGroupService;

impl PacticipantGroupService {
    /// Summarise a pacticipant: deploy checks of its main version against the
    /// production environments, merge checks of its other branches, where it is
    /// currently deployed or released, and its integration network.
    ///
    /// An unknown pacticipant gives an empty summary.
    pub async fn summary<S: Store + 'static>(
        store: Arc<S>,
        pacticipant_name: &str,
        config: &MatrixConfig,
    ) -> Result<GroupSummary, MatrixError> {
        let mut summary = GroupSummary {
            pacticipant_name: pacticipant_name.to_string(),
            max_pacticipants: config.network_diagram_max_pacticipants,
            ..GroupSummary::default()
        };

        let Some(pacticipant) = store.find_pacticipant_by_name(pacticipant_name).await? else {
            return Ok(summary);
        };

        let production_environments: Vec<String> = store
            .list_environments()
            .await?
            .into_iter()
            .filter(|e| e.production)
            .map(|e| e.name)
            .collect();

        let main_version = match &pacticipant.main_branch {
            Some(branch) => store.find_branch_head(&pacticipant.id, branch).await?,
            None => None,
        };

        match &main_version {
            Some(version) => {
                let checks = MatrixService::can_i_deploy_to_environments(
                    store.clone(),
                    UnresolvedSelector::for_version(&pacticipant.name, &version.number),
                    production_environments.clone(),
                    config.clone(),
                )
                .await;
                for (environment_name, check) in checks {
                    match check {
                        Ok(check) => {
                            summary.can_i_deploy.insert(environment_name, check);
                        }
                        Err(err) => {
                            summary
                                .failures
                                .insert(format!("environment:{}", environment_name), err.to_string());
                        }
                    }
                }
            }
            None => warn!(
                "No main version found for pacticipant '{}' and branch '{}'",
                pacticipant.name,
                pacticipant.main_branch.as_deref().unwrap_or_default()
            ),
        }

        summary.deployed_versions = Self::deployed_versions(store.as_ref(), &pacticipant).await?;
        summary.released_versions = Self::released_versions(store.as_ref(), &pacticipant).await?;

        let mut branches = store.list_branches_for_pacticipant(&pacticipant.id).await?;
        branches.sort_by_key(|b| std::cmp::Reverse(b.updated_at));
        for branch in branches {
            if pacticipant.main_branch.as_deref() == Some(branch.name.as_str()) {
                continue;
            }
            let head_version_number = match &branch.head_version_id {
                Some(id) => store.get_version(id).await?.map(|v| v.number),
                None => None,
            };
            summary.branches.push(BranchSummary {
                name: branch.name,
                head_version_number,
                updated_at: branch.updated_at,
            });
        }

        let branch_names = summary.branches.iter().map(|b| b.name.clone()).collect();
        let merge_checks = MatrixService::can_i_merge_branches(
            store.clone(),
            &pacticipant.name,
            branch_names,
            config.clone(),
        )
        .await;
        for (branch_name, check) in merge_checks {
            match check {
                Ok(check) => {
                    summary.can_i_merge.insert(branch_name, check);
                }
                Err(err) => {
                    summary
                        .failures
                        .insert(format!("branch:{}", branch_name), err.to_string());
                }
            }
        }

        for (check, message) in &summary.failures {
            error!("Summary of {}: {} failed: {}", pacticipant.name, check, message);
        }

        summary.network = InteractionGraphBuilder::network(
            store.as_ref(),
            &pacticipant.name,
            config.network_diagram_max_pacticipants,
        )
        .await?;
        summary.production_environments = production_environments;
        summary.main_branch = pacticipant.main_branch.clone();
        summary.repository_url = pacticipant.repository_url.clone();
        summary.main_version = main_version;
        summary.pacticipant = Some(pacticipant);

        Ok(summary)
    }

    async fn deployed_versions<S: Store + ?Sized>(
        store: &S,
        pacticipant: &Pacticipant,
    ) -> Result<Vec<CurrentVersion>, MatrixError> {
        let environments = store.list_environments().await?;
        let mut current = Vec::new();
        for deployed in store
            .list_currently_deployed_for_pacticipant(&pacticipant.id)
            .await?
        {
            let Some(version) = store.get_version(&deployed.version_id).await? else {
                continue;
            };
            let Some(environment) = environments.iter().find(|e| e.id == deployed.environment_id)
            else {
                continue;
            };
            current.push(CurrentVersion {
                version_number: version.number,
                environment_name: environment.name.clone(),
                target: deployed.target,
                since: deployed.created_at,
            });
        }
        Ok(current)
    }

    async fn released_versions<S: Store + ?Sized>(
        store: &S,
        pacticipant: &Pacticipant,
    ) -> Result<Vec<CurrentVersion>, MatrixError> {
        let environments = store.list_environments().await?;
        let mut current = Vec::new();
        for released in store
            .list_currently_supported_for_pacticipant(&pacticipant.id)
            .await?
        {
            let Some(version) = store.get_version(&released.version_id).await? else {
                continue;
            };
            let Some(environment) = environments.iter().find(|e| e.id == released.environment_id)
            else {
                continue;
            };
            current.push(CurrentVersion {
                version_number: version.number,
                environment_name: environment.name.clone(),
                target: None,
                since: released.created_at,
            });
        }
        Ok(current)
    }
}
