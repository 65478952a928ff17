pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use error::{MatrixError, ResolutionError};

// Export logic types
pub use logic::{
    DeployCheck, GroupSummary, InteractionGraphBuilder, MatrixDecorator, MatrixService, MergeCheck,
    PacticipantGroupService, VerificationLookup, VersionResolver,
};

// Export all model types
pub use model::*;

// Export seed module
pub use seed::*;

// Export store types
pub use store::{InMemoryStore, Store};

/// Build the application router over a store
pub fn build_app<S: Store + 'static>(
    store: std::sync::Arc<S>,
    config: &crate::config::AppConfig,
) -> axum::Router {
    let state = std::sync::Arc::new(api::handlers::BrokerState::new(
        store,
        config.matrix.clone(),
    ));
    api::routes::create_router().with_state(state)
}
