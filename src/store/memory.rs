use anyhow::{Context, Result};
use chrono::Utc;
use itertools::Itertools;
use parking_lot::RwLock;

use crate::model::{
    names_match, Branch, BranchMembership, BranchVersion, DeployedVersion, Environment, Id,
    NewEnvironment, NewPacticipant, NewVerification, Pact, Pacticipant, ReleasedVersion, Tag,
    Verification, Version,
};
use crate::store::traits::{
    BranchStore, DeploymentStore, EnvironmentStore, PactStore, PacticipantStore,
    VerificationStore, VersionStore,
};

/// The publishing relation: everything the broker has been told, in insertion order
#[derive(Debug, Default)]
struct Relation {
    sequence: i64,
    pacticipants: Vec<Pacticipant>,
    versions: Vec<Version>,
    branches: Vec<Branch>,
    branch_versions: Vec<BranchVersion>,
    tags: Vec<Tag>,
    pacts: Vec<Pact>,
    verifications: Vec<Verification>,
    environments: Vec<Environment>,
    deployed_versions: Vec<DeployedVersion>,
    released_versions: Vec<ReleasedVersion>,
}

impl Relation {
    fn next_order(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn pacticipant_by_name(&self, name: &str) -> Option<&Pacticipant> {
        self.pacticipants.iter().find(|p| p.matches_name(name))
    }

    fn ensure_pacticipant(&mut self, name: &str) -> Result<Pacticipant> {
        if name.trim().is_empty() {
            anyhow::bail!("Pacticipant name cannot be empty");
        }
        if let Some(existing) = self.pacticipant_by_name(name) {
            return Ok(existing.clone());
        }
        let pacticipant = Pacticipant::new(name.to_string());
        self.pacticipants.push(pacticipant.clone());
        Ok(pacticipant)
    }

    fn ensure_version(&mut self, pacticipant_id: &Id, number: &str) -> Result<Version> {
        if number.trim().is_empty() {
            anyhow::bail!("Version number cannot be empty");
        }
        if let Some(existing) = self
            .versions
            .iter()
            .find(|v| &v.pacticipant_id == pacticipant_id && v.number == number)
        {
            return Ok(existing.clone());
        }
        let order = self.next_order();
        let version = Version::new(pacticipant_id.clone(), number.to_string(), order);
        self.versions.push(version.clone());
        Ok(version)
    }

    fn version(&self, version_id: &Id) -> Result<Version> {
        self.versions
            .iter()
            .find(|v| &v.id == version_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Version not found: {}", version_id))
    }

    fn environment_by_name(&self, name: &str) -> Result<Environment> {
        self.environments
            .iter()
            .find(|e| names_match(&e.name, name))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Environment not found: {}", name))
    }

    /// Add the version to the branch and move the head to the newest member
    fn attach_to_branch(&mut self, version: &Version, branch_name: &str) -> Result<Branch> {
        if branch_name.trim().is_empty() {
            anyhow::bail!("Branch name cannot be empty");
        }
        let pacticipant_id = version.pacticipant_id.clone();

        if !self.branch_versions.iter().any(|bv| {
            bv.pacticipant_id == pacticipant_id
                && bv.branch_name == branch_name
                && bv.version_id == version.id
        }) {
            self.branch_versions.push(BranchVersion {
                pacticipant_id: pacticipant_id.clone(),
                branch_name: branch_name.to_string(),
                version_id: version.id.clone(),
                created_at: Utc::now(),
            });
        }

        let head = self
            .branch_versions
            .iter()
            .filter(|bv| bv.pacticipant_id == pacticipant_id && bv.branch_name == branch_name)
            .filter_map(|bv| self.versions.iter().find(|v| v.id == bv.version_id))
            .max_by_key(|v| (v.created_at, v.order))
            .map(|v| v.id.clone());

        let index = match self
            .branches
            .iter()
            .position(|b| b.pacticipant_id == pacticipant_id && b.name == branch_name)
        {
            Some(index) => index,
            None => {
                self.branches
                    .push(Branch::new(pacticipant_id.clone(), branch_name.to_string()));
                self.branches.len() - 1
            }
        };
        let branch = &mut self.branches[index];
        branch.head_version_id = head;
        branch.updated_at = Utc::now();
        Ok(branch.clone())
    }
}

/// Thread-safe in-memory publishing relation.
///
/// Readers take a short read lock and clone what they need; the lock is never
/// held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    relation: RwLock<Relation>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pacticipant, or return the existing one with the same name.
    /// A main branch or repository URL given here updates an existing record.
    pub fn create_pacticipant(&self, new_pacticipant: NewPacticipant) -> Result<Pacticipant> {
        let mut relation = self.relation.write();
        if let Some(existing) = relation
            .pacticipants
            .iter_mut()
            .find(|p| p.matches_name(&new_pacticipant.name))
        {
            if new_pacticipant.main_branch.is_some() {
                existing.main_branch = new_pacticipant.main_branch;
            }
            if new_pacticipant.repository_url.is_some() {
                existing.repository_url = new_pacticipant.repository_url;
            }
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }
        if new_pacticipant.name.trim().is_empty() {
            anyhow::bail!("Pacticipant name cannot be empty");
        }
        let pacticipant = new_pacticipant.into_pacticipant();
        relation.pacticipants.push(pacticipant.clone());
        Ok(pacticipant)
    }

    /// Create a version (and its pacticipant when unknown), optionally on a branch
    pub fn create_version(
        &self,
        pacticipant_name: &str,
        number: &str,
        branch: Option<&str>,
    ) -> Result<Version> {
        let mut relation = self.relation.write();
        let pacticipant = relation.ensure_pacticipant(pacticipant_name)?;
        let version = relation.ensure_version(&pacticipant.id, number)?;
        if let Some(branch) = branch {
            relation.attach_to_branch(&version, branch)?;
        }
        Ok(version)
    }

    pub fn tag_version(&self, version_id: &Id, tag_name: &str) -> Result<Tag> {
        let mut relation = self.relation.write();
        relation.version(version_id)?;
        if let Some(existing) = relation
            .tags
            .iter()
            .find(|t| &t.version_id == version_id && t.name == tag_name)
        {
            return Ok(existing.clone());
        }
        let tag = Tag::new(tag_name.to_string(), version_id.clone());
        relation.tags.push(tag.clone());
        Ok(tag)
    }

    /// Publish pact content from a consumer version to a provider. Unknown
    /// pacticipants and versions are created on the way.
    pub fn publish_pact(
        &self,
        consumer_name: &str,
        consumer_version_number: &str,
        provider_name: &str,
        content: serde_json::Value,
        branch: Option<&str>,
    ) -> Result<Pact> {
        let mut relation = self.relation.write();
        let consumer = relation.ensure_pacticipant(consumer_name)?;
        let provider = relation.ensure_pacticipant(provider_name)?;
        if consumer.id == provider.id {
            anyhow::bail!("A pacticipant cannot publish a pact with itself: {}", consumer.name);
        }
        let version = relation.ensure_version(&consumer.id, consumer_version_number)?;
        if let Some(branch) = branch {
            relation.attach_to_branch(&version, branch)?;
        }
        let order = relation.next_order();
        let pact = Pact::new(consumer.id, version.id, provider.id, content, order);
        relation.pacts.push(pact.clone());
        Ok(pact)
    }

    /// Record the result of a provider version verifying a publication
    pub fn record_verification(
        &self,
        pact_id: &Id,
        new_verification: NewVerification,
    ) -> Result<Verification> {
        let mut relation = self.relation.write();
        let pact = relation
            .pacts
            .iter()
            .find(|p| &p.id == pact_id)
            .cloned()
            .with_context(|| format!("Pact not found: {}", pact_id))?;
        let provider_version =
            relation.ensure_version(&pact.provider_id, &new_verification.provider_version_number)?;
        if let Some(branch) = new_verification.provider_branch.clone() {
            relation.attach_to_branch(&provider_version, &branch)?;
        }
        let order = relation.next_order();
        let verification = new_verification.into_verification(&pact, provider_version.id, order);
        relation.verifications.push(verification.clone());
        Ok(verification)
    }

    pub fn create_environment(&self, new_environment: NewEnvironment) -> Result<Environment> {
        let mut relation = self.relation.write();
        if new_environment.name.trim().is_empty() {
            anyhow::bail!("Environment name cannot be empty");
        }
        if relation.environment_by_name(&new_environment.name).is_ok() {
            anyhow::bail!("Environment already exists: {}", new_environment.name);
        }
        let environment = new_environment.into_environment();
        relation.environments.push(environment.clone());
        Ok(environment)
    }

    /// Record a deployment. The previous current deployment of the same
    /// pacticipant in the environment (same target, when the environment
    /// allows several) stops being current.
    pub fn record_deployment(
        &self,
        version_id: &Id,
        environment_name: &str,
        target: Option<&str>,
    ) -> Result<DeployedVersion> {
        let mut relation = self.relation.write();
        let version = relation.version(version_id)?;
        let environment = relation.environment_by_name(environment_name)?;
        let target = target.map(str::to_string);

        for deployed in relation.deployed_versions.iter_mut().filter(|d| {
            d.currently_deployed
                && d.pacticipant_id == version.pacticipant_id
                && d.environment_id == environment.id
                && (!environment.allows_multiple_targets || d.target == target)
        }) {
            deployed.mark_undeployed();
        }

        let order = relation.next_order();
        let deployed = DeployedVersion::new(
            version.pacticipant_id,
            version.id,
            environment.id,
            target,
            order,
        );
        relation.deployed_versions.push(deployed.clone());
        Ok(deployed)
    }

    pub fn record_undeployment(&self, deployed_version_id: &Id) -> Result<()> {
        let mut relation = self.relation.write();
        let deployed = relation
            .deployed_versions
            .iter_mut()
            .find(|d| &d.id == deployed_version_id)
            .with_context(|| format!("Deployed version not found: {}", deployed_version_id))?;
        if deployed.currently_deployed {
            deployed.mark_undeployed();
        }
        Ok(())
    }

    /// Record a release. Releases never replace one another.
    pub fn record_release(&self, version_id: &Id, environment_name: &str) -> Result<ReleasedVersion> {
        let mut relation = self.relation.write();
        let version = relation.version(version_id)?;
        let environment = relation.environment_by_name(environment_name)?;
        if let Some(existing) = relation.released_versions.iter().find(|r| {
            r.currently_supported && r.version_id == version.id && r.environment_id == environment.id
        }) {
            return Ok(existing.clone());
        }
        let order = relation.next_order();
        let released =
            ReleasedVersion::new(version.pacticipant_id, version.id, environment.id, order);
        relation.released_versions.push(released.clone());
        Ok(released)
    }

    pub fn end_support(&self, released_version_id: &Id) -> Result<()> {
        let mut relation = self.relation.write();
        let released = relation
            .released_versions
            .iter_mut()
            .find(|r| &r.id == released_version_id)
            .with_context(|| format!("Released version not found: {}", released_version_id))?;
        if released.currently_supported {
            released.end_support();
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PacticipantStore for InMemoryStore {
    async fn find_pacticipant_by_name(&self, name: &str) -> Result<Option<Pacticipant>> {
        Ok(self.relation.read().pacticipant_by_name(name).cloned())
    }

    async fn get_pacticipant(&self, id: &Id) -> Result<Option<Pacticipant>> {
        let relation = self.relation.read();
        Ok(relation.pacticipants.iter().find(|p| &p.id == id).cloned())
    }

    async fn list_pacticipants(&self) -> Result<Vec<Pacticipant>> {
        let relation = self.relation.read();
        Ok(relation
            .pacticipants
            .iter()
            .sorted_by_key(|p| p.name.to_lowercase())
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl VersionStore for InMemoryStore {
    async fn get_version(&self, id: &Id) -> Result<Option<Version>> {
        let relation = self.relation.read();
        Ok(relation.versions.iter().find(|v| &v.id == id).cloned())
    }

    async fn find_version(&self, pacticipant_id: &Id, number: &str) -> Result<Option<Version>> {
        let relation = self.relation.read();
        Ok(relation
            .versions
            .iter()
            .find(|v| &v.pacticipant_id == pacticipant_id && v.number == number)
            .cloned())
    }

    async fn find_latest_version(&self, pacticipant_id: &Id) -> Result<Option<Version>> {
        let relation = self.relation.read();
        Ok(relation
            .versions
            .iter()
            .filter(|v| &v.pacticipant_id == pacticipant_id)
            .max_by_key(|v| (v.created_at, v.order))
            .cloned())
    }

    async fn find_latest_version_with_tag(
        &self,
        pacticipant_id: &Id,
        tag: &str,
    ) -> Result<Option<Version>> {
        let relation = self.relation.read();
        Ok(relation
            .versions
            .iter()
            .filter(|v| &v.pacticipant_id == pacticipant_id)
            .filter(|v| {
                relation
                    .tags
                    .iter()
                    .any(|t| t.version_id == v.id && t.name == tag)
            })
            .max_by_key(|v| (v.created_at, v.order))
            .cloned())
    }
}

#[async_trait::async_trait]
impl BranchStore for InMemoryStore {
    async fn list_branches_for_pacticipant(&self, pacticipant_id: &Id) -> Result<Vec<Branch>> {
        let relation = self.relation.read();
        Ok(relation
            .branches
            .iter()
            .filter(|b| &b.pacticipant_id == pacticipant_id)
            .cloned()
            .collect())
    }

    async fn find_branch_head(&self, pacticipant_id: &Id, name: &str) -> Result<Option<Version>> {
        let relation = self.relation.read();
        let head_id = relation
            .branches
            .iter()
            .find(|b| &b.pacticipant_id == pacticipant_id && b.name == name)
            .and_then(|b| b.head_version_id.clone());
        Ok(head_id.and_then(|id| relation.versions.iter().find(|v| v.id == id).cloned()))
    }

    async fn branches_for_version(&self, version_id: &Id) -> Result<Vec<BranchMembership>> {
        let relation = self.relation.read();
        Ok(relation
            .branch_versions
            .iter()
            .filter(|bv| &bv.version_id == version_id)
            .map(|bv| BranchMembership {
                name: bv.branch_name.clone(),
                is_head: relation.branches.iter().any(|b| {
                    b.pacticipant_id == bv.pacticipant_id
                        && b.name == bv.branch_name
                        && b.is_head(version_id)
                }),
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl PactStore for InMemoryStore {
    async fn find_latest_pact(
        &self,
        consumer_version_id: &Id,
        provider_id: &Id,
    ) -> Result<Option<Pact>> {
        let relation = self.relation.read();
        Ok(relation
            .pacts
            .iter()
            .filter(|p| &p.consumer_version_id == consumer_version_id && &p.provider_id == provider_id)
            .max_by_key(|p| (p.published_at, p.order))
            .cloned())
    }

    async fn list_pacts_for_consumer(&self, consumer_id: &Id) -> Result<Vec<Pact>> {
        let relation = self.relation.read();
        Ok(relation
            .pacts
            .iter()
            .filter(|p| &p.consumer_id == consumer_id)
            .cloned()
            .collect())
    }

    async fn list_pacts_for_provider(&self, provider_id: &Id) -> Result<Vec<Pact>> {
        let relation = self.relation.read();
        Ok(relation
            .pacts
            .iter()
            .filter(|p| &p.provider_id == provider_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl VerificationStore for InMemoryStore {
    async fn find_verifications(
        &self,
        pact_content_sha: &str,
        provider_id: &Id,
    ) -> Result<Vec<Verification>> {
        let relation = self.relation.read();
        Ok(relation
            .verifications
            .iter()
            .filter(|v| v.pact_content_sha == pact_content_sha && &v.provider_id == provider_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl EnvironmentStore for InMemoryStore {
    async fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>> {
        Ok(self.relation.read().environment_by_name(name).ok())
    }

    async fn list_environments(&self) -> Result<Vec<Environment>> {
        Ok(self.relation.read().environments.clone())
    }
}

#[async_trait::async_trait]
impl DeploymentStore for InMemoryStore {
    async fn find_currently_deployed_versions(
        &self,
        pacticipant_id: &Id,
        environment_id: &Id,
    ) -> Result<Vec<DeployedVersion>> {
        let relation = self.relation.read();
        Ok(relation
            .deployed_versions
            .iter()
            .filter(|d| {
                d.currently_deployed
                    && &d.pacticipant_id == pacticipant_id
                    && &d.environment_id == environment_id
            })
            .cloned()
            .collect())
    }

    async fn find_currently_supported_versions(
        &self,
        pacticipant_id: &Id,
        environment_id: &Id,
    ) -> Result<Vec<ReleasedVersion>> {
        let relation = self.relation.read();
        Ok(relation
            .released_versions
            .iter()
            .filter(|r| {
                r.currently_supported
                    && &r.pacticipant_id == pacticipant_id
                    && &r.environment_id == environment_id
            })
            .cloned()
            .collect())
    }

    async fn list_currently_deployed_for_pacticipant(
        &self,
        pacticipant_id: &Id,
    ) -> Result<Vec<DeployedVersion>> {
        let relation = self.relation.read();
        Ok(relation
            .deployed_versions
            .iter()
            .filter(|d| d.currently_deployed && &d.pacticipant_id == pacticipant_id)
            .cloned()
            .collect())
    }

    async fn list_currently_supported_for_pacticipant(
        &self,
        pacticipant_id: &Id,
    ) -> Result<Vec<ReleasedVersion>> {
        let relation = self.relation.read();
        Ok(relation
            .released_versions
            .iter()
            .filter(|r| r.currently_supported && &r.pacticipant_id == pacticipant_id)
            .cloned()
            .collect())
    }
}
