use anyhow::{anyhow, Result};
use serde_json::json;

use crate::model::{
    generate_id, Environment, NewEnvironment, NewPacticipant, NewVerification, Pact, Pacticipant,
    Verification, Version,
};
use crate::store::InMemoryStore;

/// Fluent builder for populating an `InMemoryStore`.
///
/// Each step remembers what it created so the next step can refer to it:
/// `publish_pact` uses the current consumer and provider, `create_verification`
/// verifies the most recently published pact, and so on.
pub struct TestDataBuilder<'a> {
    store: &'a InMemoryStore,
    consumer: Option<Pacticipant>,
    provider: Option<Pacticipant>,
    consumer_version: Option<Version>,
    provider_version: Option<Version>,
    pact: Option<Pact>,
    verification: Option<Verification>,
    environments: Vec<Environment>,
}

impl<'a> TestDataBuilder<'a> {
    pub fn new(store: &'a InMemoryStore) -> Self {
        Self {
            store,
            consumer: None,
            provider: None,
            consumer_version: None,
            provider_version: None,
            pact: None,
            verification: None,
            environments: Vec::new(),
        }
    }

    pub fn create_consumer(mut self, name: &str, main_branch: Option<&str>) -> Result<Self> {
        self.consumer = Some(self.create_pacticipant(name, main_branch)?);
        Ok(self)
    }

    pub fn create_provider(mut self, name: &str, main_branch: Option<&str>) -> Result<Self> {
        self.provider = Some(self.create_pacticipant(name, main_branch)?);
        Ok(self)
    }

    /// Switch the current consumer to an existing or new pacticipant
    pub fn use_consumer(mut self, name: &str) -> Result<Self> {
        self.consumer = Some(self.store.create_pacticipant(NewPacticipant::named(name))?);
        Ok(self)
    }

    /// Switch the current provider to an existing or new pacticipant
    pub fn use_provider(mut self, name: &str) -> Result<Self> {
        self.provider = Some(self.store.create_pacticipant(NewPacticipant::named(name))?);
        Ok(self)
    }

    pub fn create_environment(mut self, name: &str, production: bool) -> Result<Self> {
        let environment = self
            .store
            .create_environment(NewEnvironment::named(name, production))?;
        self.environments.push(environment);
        Ok(self)
    }

    pub fn create_consumer_version(mut self, number: &str, branch: Option<&str>) -> Result<Self> {
        let consumer = self.current_consumer()?;
        self.consumer_version = Some(self.store.create_version(&consumer.name, number, branch)?);
        Ok(self)
    }

    pub fn create_provider_version(mut self, number: &str, branch: Option<&str>) -> Result<Self> {
        let provider = self.current_provider()?;
        self.provider_version = Some(self.store.create_version(&provider.name, number, branch)?);
        Ok(self)
    }

    pub fn tag_consumer_version(self, tag: &str) -> Result<Self> {
        let version = self
            .consumer_version
            .as_ref()
            .ok_or_else(|| anyhow!("No consumer version to tag"))?;
        self.store.tag_version(&version.id, tag)?;
        Ok(self)
    }

    /// Publish a pact from the current consumer to the current provider.
    /// The content is unique per call, so every publication needs its own
    /// verification.
    pub fn publish_pact(self, consumer_version_number: &str, branch: Option<&str>) -> Result<Self> {
        let content = json!({
            "consumer": { "name": self.current_consumer()?.name },
            "provider": { "name": self.current_provider()?.name },
            "interactions": [{ "description": generate_id() }],
        });
        self.publish_pact_with_content(consumer_version_number, branch, content)
    }

    pub fn publish_pact_with_content(
        mut self,
        consumer_version_number: &str,
        branch: Option<&str>,
        content: serde_json::Value,
    ) -> Result<Self> {
        let consumer = self.current_consumer()?;
        let provider = self.current_provider()?;
        let pact = self.store.publish_pact(
            &consumer.name,
            consumer_version_number,
            &provider.name,
            content,
            branch,
        )?;
        self.consumer_version = Some(self.store.create_version(
            &consumer.name,
            consumer_version_number,
            None,
        )?);
        self.pact = Some(pact);
        Ok(self)
    }

    /// Verify the most recently published pact with the given provider version
    pub fn create_verification(
        mut self,
        provider_version_number: &str,
        branch: Option<&str>,
        success: bool,
    ) -> Result<Self> {
        let pact = self
            .pact
            .as_ref()
            .ok_or_else(|| anyhow!("No pact has been published to verify"))?;
        let mut new_verification = NewVerification::new(provider_version_number, success);
        if let Some(branch) = branch {
            new_verification = new_verification.on_branch(branch);
        }
        let verification = self.store.record_verification(&pact.id, new_verification)?;
        let provider = self.current_provider()?;
        self.provider_version = Some(self.store.create_version(
            &provider.name,
            provider_version_number,
            None,
        )?);
        self.verification = Some(verification);
        Ok(self)
    }

    pub fn create_deployed_version_for_consumer_version(self, environment: &str) -> Result<Self> {
        let version = self
            .consumer_version
            .as_ref()
            .ok_or_else(|| anyhow!("No consumer version to deploy"))?;
        self.store.record_deployment(&version.id, environment, None)?;
        Ok(self)
    }

    pub fn create_deployed_version_for_provider_version(self, environment: &str) -> Result<Self> {
        let version = self
            .provider_version
            .as_ref()
            .ok_or_else(|| anyhow!("No provider version to deploy"))?;
        self.store.record_deployment(&version.id, environment, None)?;
        Ok(self)
    }

    pub fn create_released_version_for_provider_version(self, environment: &str) -> Result<Self> {
        let version = self
            .provider_version
            .as_ref()
            .ok_or_else(|| anyhow!("No provider version to release"))?;
        self.store.record_release(&version.id, environment)?;
        Ok(self)
    }

    pub fn consumer(&self) -> Option<&Pacticipant> {
        self.consumer.as_ref()
    }

    pub fn provider(&self) -> Option<&Pacticipant> {
        self.provider.as_ref()
    }

    pub fn consumer_version(&self) -> Option<&Version> {
        self.consumer_version.as_ref()
    }

    pub fn provider_version(&self) -> Option<&Version> {
        self.provider_version.as_ref()
    }

    pub fn pact(&self) -> Option<&Pact> {
        self.pact.as_ref()
    }

    pub fn verification(&self) -> Option<&Verification> {
        self.verification.as_ref()
    }

    pub fn environments(&self) -> &[Environment] {
        &self.environments
    }

    fn create_pacticipant(&self, name: &str, main_branch: Option<&str>) -> Result<Pacticipant> {
        let mut new_pacticipant = NewPacticipant::named(name);
        if let Some(branch) = main_branch {
            new_pacticipant = new_pacticipant.with_main_branch(branch);
        }
        self.store.create_pacticipant(new_pacticipant)
    }

    fn current_consumer(&self) -> Result<Pacticipant> {
        self.consumer
            .clone()
            .ok_or_else(|| anyhow!("No consumer has been created"))
    }

    fn current_provider(&self) -> Result<Pacticipant> {
        self.provider
            .clone()
            .ok_or_else(|| anyhow!("No provider has been created"))
    }
}
