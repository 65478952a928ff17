use crate::model::{PairingStatus, VersionDescriptor};

pub const ALL_VERIFIED: &str = "All required verification results are published and successful";
pub const NO_DEPENDENCIES: &str = "There are no missing dependencies";

/// Reason sentence for one evaluated pairing
pub fn pairing_reason(
    status: PairingStatus,
    consumer: &VersionDescriptor,
    provider: &VersionDescriptor,
    verified_by: Option<&str>,
) -> String {
    let consumer = consumer.describe();
    let provider_description = provider.describe();
    match status {
        PairingStatus::Verified => format!(
            "The pact between {} and {} has been successfully verified",
            consumer, provider_description
        ),
        PairingStatus::VerifiedElsewhere => match verified_by {
            Some(number) => format!(
                "The pact between {} and {} has not been verified against that version, but was verified by version {} of {}",
                consumer, provider_description, number, provider.pacticipant_name
            ),
            None => no_verified_pact(&consumer, &provider_description),
        },
        PairingStatus::Failed => format!(
            "The verification for the pact between {} and {} failed",
            consumer, provider_description
        ),
        PairingStatus::NoPact => format!(
            "There is no pact published between {} and {}",
            consumer, provider_description
        ),
        PairingStatus::Unverified | PairingStatus::Unresolvable => {
            no_verified_pact(&consumer, &provider_description)
        }
    }
}

fn no_verified_pact(consumer: &str, provider: &str) -> String {
    format!("There is no verified pact between {} and {}", consumer, provider)
}
