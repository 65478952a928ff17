use crate::model::{
    Branch, BranchMembership, DeployedVersion, Environment, Id, Pact, Pacticipant,
    ReleasedVersion, Verification, Version,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait PacticipantStore: Send + Sync {
    /// Name lookup is case-insensitive
    async fn find_pacticipant_by_name(&self, name: &str) -> Result<Option<Pacticipant>>;
    async fn get_pacticipant(&self, id: &Id) -> Result<Option<Pacticipant>>;
    async fn list_pacticipants(&self) -> Result<Vec<Pacticipant>>;
}

#[async_trait::async_trait]
pub trait VersionStore: Send + Sync {
    async fn get_version(&self, id: &Id) -> Result<Option<Version>>;
    async fn find_version(&self, pacticipant_id: &Id, number: &str) -> Result<Option<Version>>;
    async fn find_latest_version(&self, pacticipant_id: &Id) -> Result<Option<Version>>;
    async fn find_latest_version_with_tag(
        &self,
        pacticipant_id: &Id,
        tag: &str,
    ) -> Result<Option<Version>>;
}

#[async_trait::async_trait]
pub trait BranchStore: Send + Sync {
    async fn list_branches_for_pacticipant(&self, pacticipant_id: &Id) -> Result<Vec<Branch>>;
    async fn find_branch_head(&self, pacticipant_id: &Id, name: &str) -> Result<Option<Version>>;
    async fn branches_for_version(&self, version_id: &Id) -> Result<Vec<BranchMembership>>;
}

#[async_trait::async_trait]
pub trait PactStore: Send + Sync {
    /// Most recent publication by the consumer version for the provider
    async fn find_latest_pact(
        &self,
        consumer_version_id: &Id,
        provider_id: &Id,
    ) -> Result<Option<Pact>>;
    async fn list_pacts_for_consumer(&self, consumer_id: &Id) -> Result<Vec<Pact>>;
    async fn list_pacts_for_provider(&self, provider_id: &Id) -> Result<Vec<Pact>>;
}

#[async_trait::async_trait]
pub trait VerificationStore: Send + Sync {
    /// All verifications of the given pact content by the provider, any provider version
    async fn find_verifications(
        &self,
        pact_content_sha: &str,
        provider_id: &Id,
    ) -> Result<Vec<Verification>>;
}

#[async_trait::async_trait]
pub trait EnvironmentStore: Send + Sync {
    async fn find_environment_by_name(&self, name: &str) -> Result<Option<Environment>>;
    async fn list_environments(&self) -> Result<Vec<Environment>>;
}

#[async_trait::async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn find_currently_deployed_versions(
        &self,
        pacticipant_id: &Id,
        environment_id: &Id,
    ) -> Result<Vec<DeployedVersion>>;
    async fn find_currently_supported_versions(
        &self,
        pacticipant_id: &Id,
        environment_id: &Id,
    ) -> Result<Vec<ReleasedVersion>>;
    async fn list_currently_deployed_for_pacticipant(
        &self,
        pacticipant_id: &Id,
    ) -> Result<Vec<DeployedVersion>>;
    async fn list_currently_supported_for_pacticipant(
        &self,
        pacticipant_id: &Id,
    ) -> Result<Vec<ReleasedVersion>>;
}

pub trait Store:
    PacticipantStore
    + VersionStore
    + BranchStore
    + PactStore
    + VerificationStore
    + EnvironmentStore
    + DeploymentStore
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: PacticipantStore
        + VersionStore
        + BranchStore
        + PactStore
        + VerificationStore
        + EnvironmentStore
        + DeploymentStore
        + Send
        + Sync
{
}
