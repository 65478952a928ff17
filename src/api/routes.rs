use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Matrix queries
        .route("/matrix/can-i-deploy", post(handlers::can_i_deploy::<S>))
        .route(
            "/matrix/can-i-deploy/environments",
            post(handlers::can_i_deploy_to_environments::<S>),
        )
        .route("/matrix/can-i-merge", post(handlers::can_i_merge::<S>))
        // Pacticipant overview
        .route(
            "/pacticipants/:name/summary",
            get(handlers::pacticipant_summary::<S>),
        )
}
