use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_database::supabase::{representation_headers, SupabaseClient};

/// Best-effort activity log emission. Observability must never fail a
/// booking or a maintenance run, so errors are logged and swallowed.
pub struct ActivityLogService {
    supabase: Arc<SupabaseClient>,
}

impl ActivityLogService {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    pub async fn record(&self, action: &str, detail: Value, auth_token: &str) {
        let entry = json!({
            "action": action,
            "detail": detail,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/activity_logs",
                Some(auth_token),
                Some(entry),
                Some(representation_headers()),
            )
            .await;

        match result {
            Ok(_) => debug!("Recorded activity: {}", action),
            Err(e) => warn!("Failed to record activity {}: {}", action, e),
        }
    }
}
