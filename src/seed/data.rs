use anyhow::Result;
use log::info;

use crate::seed::TestDataBuilder;
use crate::store::InMemoryStore;

/// Load a small demonstration relation:
///
/// - `Foo1` (main branch `foo1main`) consumes `Foo2` (main branch `foo2main`)
/// - version 1 of Foo1 is verified by Foo2's `foo2main` head, which is deployed to production
/// - version 2 of Foo1 on `feat/new-thing` has an unverified pact
/// - `Web` consumes Foo2 and its version in test has a failing verification
pub fn load_seed_data(store: &InMemoryStore) -> Result<()> {
    TestDataBuilder::new(store)
        .create_environment("test", false)?
        .create_environment("production", true)?
        .create_consumer("Foo1", Some("foo1main"))?
        .create_provider("Foo2", Some("foo2main"))?
        .publish_pact("1", Some("foo1main"))?
        .create_verification("1315e0b1924cb6f42751f977789be3559373033a", Some("foo2main"), true)?
        .create_deployed_version_for_provider_version("production")?
        .create_deployed_version_for_consumer_version("production")?
        .create_consumer_version("6c992f831da299364cf31be6008ee4752189f6d4", Some("feat/new-thing"))?
        .publish_pact("2", Some("feat/new-thing"))?
        .create_consumer("Web", Some("main"))?
        .publish_pact("web-1", Some("main"))?
        .create_deployed_version_for_consumer_version("test")?
        .create_verification("1315e0b1924cb6f42751f977789be3559373033a", Some("foo2main"), false)?;

    info!("Seeded demonstration data for Foo1, Foo2 and Web");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PacticipantStore;

    #[tokio::test]
    async fn test_seed_data_loads() {
        let store = InMemoryStore::new();
        load_seed_data(&store).unwrap();

        let names: Vec<String> = store
            .list_pacticipants()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Foo1", "Foo2", "Web"]);

        // loading twice trips over the existing environments
        assert!(load_seed_data(&store).is_err());
    }
}
