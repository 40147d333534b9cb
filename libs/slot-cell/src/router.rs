// libs/slot-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn slot_routes(state: Arc<AppConfig>) -> Router {
    // All slot operations require authentication
    let protected_routes = Router::new()
        .route("/", get(handlers::list_slot_days))
        .route("/generate/{doctor_id}", post(handlers::generate_initial_slots))
        .route("/generate/{doctor_id}/day", post(handlers::generate_day))
        .route(
            "/{slot_day_id}/{slot_id}/availability",
            patch(handlers::toggle_availability),
        )
        .route("/book", post(handlers::book_slot))
        .route("/maintenance/run", post(handlers::run_maintenance))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
