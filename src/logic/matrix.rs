use std::collections::BTreeMap;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, error, info};

use crate::config::MatrixConfig;
use crate::error::MatrixError;
use crate::logic::decorator::{DeployCheck, MatrixDecorator, MergeCheck};
use crate::logic::interaction_graph::InteractionGraphBuilder;
use crate::logic::reasons::{pairing_reason, ALL_VERIFIED, NO_DEPENDENCIES};
use crate::logic::verification_lookup::{LookupOutcome, LookupResult, VerificationLookup};
use crate::logic::version_resolver::{ComparisonTarget, ResolvedVersion, VersionResolver};
use crate::model::{
    LatestBy, MatrixOptions, MatrixRow, PairingStatus, QueryResults, ResolvedSelectorReport,
    TargetKind, UnresolvedSelector, UnresolvedSelectorReport, Verdict, VersionDescriptor,
};
use crate::store::traits::Store;

/// Rows and warnings collected while walking the integrations of the selected versions
#[derive(Debug, Default)]
struct Evaluation {
    rows: Vec<MatrixRow>,
    warnings: Vec<String>,
}

pub struct MatrixService;

impl MatrixService {
    /// Decide whether the selected versions can be deployed together with the
    /// counterpart versions the options point at.
    ///
    /// Selectors that cannot be resolved and counterparts that cannot be
    /// resolved make the verdict unknown; they never fail the call.
    pub async fn can_i_deploy<S: Store + ?Sized>(
        store: &S,
        selectors: &[UnresolvedSelector],
        options: &MatrixOptions,
        config: &MatrixConfig,
    ) -> Result<QueryResults, MatrixError> {
        if selectors.is_empty() {
            return Err(MatrixError::InvalidSelector(
                "At least one selector is required".to_string(),
            ));
        }
        for selector in selectors {
            selector.validate().map_err(MatrixError::InvalidSelector)?;
        }

        let latestby = options.latestby.unwrap_or(config.default_latestby);
        let policy = options
            .verified_elsewhere
            .unwrap_or(config.verified_elsewhere);

        let mut resolved: Vec<ResolvedVersion> = Vec::new();
        let mut unresolved: Vec<UnresolvedSelectorReport> = Vec::new();
        for selector in selectors {
            match VersionResolver::resolve(store, selector).await? {
                Ok(version) => resolved.push(version),
                Err(failure) => unresolved.push(UnresolvedSelectorReport {
                    selector: selector.clone(),
                    code: failure.code().to_string(),
                    message: failure.to_string(),
                }),
            }
        }
        let resolved: Vec<ResolvedVersion> = resolved
            .into_iter()
            .unique_by(|r| r.version.id.clone())
            .collect();

        let target_kind = options.target_kind(resolved.len());
        let evaluation = Self::evaluate(store, &resolved, &target_kind, latestby).await?;

        let mut rows = evaluation.rows;
        rows.sort_by(|a, b| Self::row_key(a).cmp(&Self::row_key(b)));

        let verdict = Verdict::from_all(
            unresolved
                .iter()
                .map(|_| Verdict::Unknown)
                .chain(rows.iter().map(|row| row.status.verdict(policy))),
        );

        let mut reasons: Vec<String> = unresolved
            .iter()
            .map(|u| u.message.clone())
            .chain(
                rows.iter()
                    .filter(|row| row.status.verdict(policy) != Verdict::Deployable)
                    .map(|row| row.reason.clone()),
            )
            .unique()
            .collect();
        if reasons.is_empty() {
            let reason = if rows.is_empty() {
                NO_DEPENDENCIES
            } else {
                ALL_VERIFIED
            };
            reasons.push(reason.to_string());
        }

        info!(
            "Matrix query for {} evaluated {} pairing(s): {:?}",
            selectors.iter().map(|s| s.description()).join(", "),
            rows.len(),
            verdict
        );

        Ok(QueryResults {
            selectors: selectors.to_vec(),
            options: options.clone(),
            resolved_selectors: resolved
                .iter()
                .map(|r| ResolvedSelectorReport {
                    pacticipant_name: r.pacticipant.name.clone(),
                    version_number: r.version.number.clone(),
                    kind: r.kind.clone(),
                })
                .collect(),
            unresolved_selectors: unresolved,
            rows,
            warnings: evaluation.warnings,
            verdict,
            reasons,
        })
    }

    /// Whether the selected versions can be merged: every counterpart is
    /// taken from the head of its main branch
    pub async fn can_i_merge<S: Store + ?Sized>(
        store: &S,
        selectors: &[UnresolvedSelector],
        config: &MatrixConfig,
    ) -> Result<QueryResults, MatrixError> {
        Self::can_i_deploy(store, selectors, &MatrixOptions::for_merge(), config).await
    }

    /// Evaluate one selector against several environments concurrently.
    /// Each environment gets its own result; one failing leaves the others intact.
    pub async fn can_i_deploy_to_environments<S: Store + 'static>(
        store: Arc<S>,
        selector: UnresolvedSelector,
        environment_names: Vec<String>,
        config: MatrixConfig,
    ) -> BTreeMap<String, Result<DeployCheck, MatrixError>> {
        let mut handles = Vec::new();
        for environment_name in environment_names {
            let store = store.clone();
            let selector = selector.clone();
            let config = config.clone();
            let options = MatrixOptions::for_environment(&environment_name);
            handles.push((
                environment_name,
                tokio::spawn(async move {
                    let results = Self::can_i_deploy(
                        store.as_ref(),
                        std::slice::from_ref(&selector),
                        &options,
                        &config,
                    )
                    .await?;
                    Ok::<_, MatrixError>(MatrixDecorator::new(&results).deploy_check())
                }),
            ));
        }

        let mut checks = BTreeMap::new();
        for (environment_name, handle) in handles {
            let check = match handle.await {
                Ok(check) => check,
                Err(join_error) => Err(MatrixError::from(join_error)),
            };
            if let Err(err) = &check {
                error!("can-i-deploy to {} failed: {}", environment_name, err);
            }
            checks.insert(environment_name, check);
        }
        checks
    }

    /// Evaluate the heads of several branches of one pacticipant for merging,
    /// concurrently and independently
    pub async fn can_i_merge_branches<S: Store + 'static>(
        store: Arc<S>,
        pacticipant_name: &str,
        branch_names: Vec<String>,
        config: MatrixConfig,
    ) -> BTreeMap<String, Result<MergeCheck, MatrixError>> {
        let mut handles = Vec::new();
        for branch_name in branch_names {
            let store = store.clone();
            let config = config.clone();
            let selector = UnresolvedSelector::for_branch(pacticipant_name, &branch_name);
            handles.push((
                branch_name,
                tokio::spawn(async move {
                    let results = Self::can_i_merge(
                        store.as_ref(),
                        std::slice::from_ref(&selector),
                        &config,
                    )
                    .await?;
                    Ok::<_, MatrixError>(MatrixDecorator::new(&results).merge_check())
                }),
            ));
        }

        let mut checks = BTreeMap::new();
        for (branch_name, handle) in handles {
            let check = match handle.await {
                Ok(check) => check,
                Err(join_error) => Err(MatrixError::from(join_error)),
            };
            if let Err(err) = &check {
                error!("can-i-merge for branch {} failed: {}", branch_name, err);
            }
            checks.insert(branch_name, check);
        }
        checks
    }

    async fn evaluate<S: Store + ?Sized>(
        store: &S,
        resolved: &[ResolvedVersion],
        target_kind: &TargetKind,
        latestby: LatestBy,
    ) -> Result<Evaluation, MatrixError> {
        let pairwise = *target_kind == TargetKind::Selected;
        let mut evaluation = Evaluation::default();

        for selected in resolved {
            let graph = InteractionGraphBuilder::build(
                store,
                &selected.pacticipant,
                Some(&selected.version),
            )
            .await?;
            debug!(
                "{} has {} provider(s) and {} consumer(s)",
                selected.pacticipant.name,
                graph.as_consumer.len(),
                graph.as_provider.len()
            );

            for integration in &graph.as_consumer {
                if pairwise {
                    if !resolved
                        .iter()
                        .any(|r| r.pacticipant.id == integration.provider.id)
                    {
                        continue;
                    }
                } else if !integration.live {
                    evaluation.warnings.push(format!(
                        "{} has no pact with {}, which earlier versions of {} had; that integration is not checked",
                        selected.descriptor().describe(),
                        integration.provider.name,
                        selected.pacticipant.name
                    ));
                    continue;
                }

                let target = VersionResolver::resolve_target(
                    store,
                    &integration.provider,
                    target_kind,
                    resolved,
                )
                .await?;
                let rows = Self::consumer_rows(store, selected, &target, latestby).await?;
                evaluation.rows.extend(rows);
            }

            // both sides of a selected pair are covered from the consumer end
            if pairwise {
                continue;
            }

            for integration in &graph.as_provider {
                let target = VersionResolver::resolve_target(
                    store,
                    &integration.consumer,
                    target_kind,
                    resolved,
                )
                .await?;
                if !target.is_resolved() {
                    let detail = target
                        .failure
                        .as_ref()
                        .map(|f| f.to_string())
                        .unwrap_or_default();
                    evaluation.warnings.push(format!(
                        "Consumer {} of {} is not checked: {}",
                        integration.consumer.name,
                        selected.pacticipant.name,
                        detail
                    ));
                    continue;
                }

                for consumer_version in &target.versions {
                    let consumer = target.descriptor(Some(consumer_version));
                    let results = VerificationLookup::lookup(
                        store,
                        consumer_version,
                        &selected.pacticipant,
                        std::slice::from_ref(&selected.version),
                        latestby,
                    )
                    .await?;
                    for result in results {
                        if result.outcome == LookupOutcome::NoPact {
                            evaluation.warnings.push(format!(
                                "{} has no pact with {}",
                                consumer.describe(),
                                selected.pacticipant.name
                            ));
                            continue;
                        }
                        evaluation
                            .rows
                            .push(Self::row(consumer.clone(), selected.descriptor(), &result));
                    }
                }
            }
        }

        Ok(evaluation)
    }

    async fn consumer_rows<S: Store + ?Sized>(
        store: &S,
        selected: &ResolvedVersion,
        target: &ComparisonTarget,
        latestby: LatestBy,
    ) -> Result<Vec<MatrixRow>, MatrixError> {
        let consumer = selected.descriptor();

        if !target.is_resolved() {
            let provider = target.descriptor(None);
            if let Some(failure) = &target.failure {
                debug!("Counterpart not resolved: {}", failure);
            }
            let pact = store
                .find_latest_pact(&selected.version.id, &target.pacticipant.id)
                .await?;
            return Ok(vec![MatrixRow {
                reason: pairing_reason(PairingStatus::Unresolvable, &consumer, &provider, None),
                consumer,
                provider,
                pact_content_sha: pact.map(|p| p.content_sha),
                verification: None,
                status: PairingStatus::Unresolvable,
            }]);
        }

        let results = VerificationLookup::lookup(
            store,
            &selected.version,
            &target.pacticipant,
            &target.versions,
            latestby,
        )
        .await?;
        Ok(results
            .iter()
            .map(|result| {
                Self::row(
                    consumer.clone(),
                    target.descriptor(Some(&result.provider_version)),
                    result,
                )
            })
            .collect())
    }

    fn row(
        consumer: VersionDescriptor,
        provider: VersionDescriptor,
        result: &LookupResult,
    ) -> MatrixRow {
        let status = result.outcome.status();
        let verified_by = match &result.outcome {
            LookupOutcome::VerifiedElsewhere {
                actual_provider_version,
                ..
            } => Some(actual_provider_version.number.as_str()),
            _ => None,
        };
        let reason = pairing_reason(status, &consumer, &provider, verified_by);
        debug!("{}", reason);
        MatrixRow {
            consumer,
            provider,
            pact_content_sha: result.pact.as_ref().map(|p| p.content_sha.clone()),
            verification: result.verification_summary(),
            status,
            reason,
        }
    }

    fn row_key(row: &MatrixRow) -> (String, String, String, String) {
        (
            row.consumer.pacticipant_name.to_lowercase(),
            row.consumer.version_number.clone().unwrap_or_default(),
            row.provider.pacticipant_name.to_lowercase(),
            row.provider.version_number.clone().unwrap_or_default(),
        )
    }
}
