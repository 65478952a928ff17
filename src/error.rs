use thiserror::Error;

/// Why a selector or comparison target could not be pinned to a version.
///
/// These are business outcomes: they turn into a `null` verdict with the
/// message as reason, never into a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No pacticipant with name '{name}' found")]
    PacticipantNotFound { name: String },

    #[error("No version of {pacticipant} found {criteria}")]
    NoMatchingVersion { pacticipant: String, criteria: String },

    #[error("No version of {pacticipant} is currently the head of branch {branch}")]
    NoBranchHead { pacticipant: String, branch: String },

    #[error("No version of {pacticipant} is currently recorded as deployed or released in environment {environment}")]
    NoCurrentlyDeployedVersion {
        pacticipant: String,
        environment: String,
    },

    #[error("No main branch set for pacticipant {pacticipant}")]
    NoMainBranchConfigured { pacticipant: String },

    #[error("Cannot resolve a version of {pacticipant}: {detail}")]
    Unresolvable { pacticipant: String, detail: String },
}

impl ResolutionError {
    /// Stable machine-readable code for API consumers
    pub fn code(&self) -> &'static str {
        match self {
            ResolutionError::PacticipantNotFound { .. } => "pacticipant_not_found",
            ResolutionError::NoMatchingVersion { .. } => "no_matching_version",
            ResolutionError::NoBranchHead { .. } => "no_branch_head",
            ResolutionError::NoCurrentlyDeployedVersion { .. } => "no_currently_deployed_version",
            ResolutionError::NoMainBranchConfigured { .. } => "no_main_branch_configured",
            ResolutionError::Unresolvable { .. } => "unresolvable",
        }
    }
}

/// Failures that abort a matrix evaluation
#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Store error: {0}")]
    Store(#[from] anyhow::Error),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Evaluation task failed: {0}")]
    TaskFailed(String),
}

impl From<tokio::task::JoinError> for MatrixError {
    fn from(err: tokio::task::JoinError) -> Self {
        MatrixError::TaskFailed(err.to_string())
    }
}
