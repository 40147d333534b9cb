use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use slot_cell::services::SlotMaintenanceService;

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Medislot API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Create shared state
    let state = Arc::new(config);

    // Background slot maintenance: roll the horizon forward and purge
    // expired days on a fixed interval
    spawn_maintenance_scheduler(Arc::clone(&state));

    // Build the application router
    let app = router::create_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn spawn_maintenance_scheduler(state: Arc<AppConfig>) {
    let interval_hours = state.maintenance_interval_hours.max(1);

    tokio::spawn(async move {
        let service = SlotMaintenanceService::new(&state);
        let mut ticker =
            tokio::time::interval(Duration::from_secs(interval_hours * 60 * 60));

        loop {
            ticker.tick().await;

            // Scheduled runs have no user JWT; they authenticate with the
            // service-role key so RLS does not block the writes
            match service.run(state.maintenance_token()).await {
                Ok(summary) => info!(
                    "Scheduled maintenance: {} generated, {} skipped, {} purged",
                    summary.days_generated, summary.days_skipped, summary.days_purged
                ),
                Err(e) => error!("Scheduled maintenance failed: {}", e),
            }
        }
    });
}
