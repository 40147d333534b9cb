use std::sync::Arc;

use axum::{routing::get, Router};

use appointment_cell::router::appointment_routes;
use doctor_cell::router::doctor_routes;
use shared_config::AppConfig;
use slot_cell::router::slot_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Medislot API is running!" }))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/slots", slot_routes(state.clone()))
        .nest("/appointments", appointment_routes(state))
}
