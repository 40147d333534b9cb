// libs/slot-cell/src/services/maintenance.rs
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{DayOutcome, MaintenanceSummary, SlotError, SlotScheduleConfig};
use crate::services::activity::ActivityLogService;
use crate::services::generator::SlotGeneratorService;

/// Recurring job that keeps the booking horizon rolling and bounds storage:
/// extends each opted-in doctor's calendar by one day at the far edge, then
/// purges slot days older than today.
pub struct SlotMaintenanceService {
    supabase: Arc<SupabaseClient>,
    generator: SlotGeneratorService,
    activity: ActivityLogService,
    schedule: SlotScheduleConfig,
}

impl SlotMaintenanceService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_schedule(config, SlotScheduleConfig::default())
    }

    pub fn with_schedule(config: &AppConfig, schedule: SlotScheduleConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let activity = ActivityLogService::new(Arc::clone(&supabase));
        let generator = SlotGeneratorService::with_schedule(config, schedule.clone());

        Self {
            supabase,
            generator,
            activity,
            schedule,
        }
    }

    /// Run both maintenance steps. Extension failures are isolated per
    /// doctor and never stop the retention pass.
    pub async fn run(&self, auth_token: &str) -> Result<MaintenanceSummary, SlotError> {
        let today = Utc::now().date_naive();
        info!("Running slot maintenance for {}", today);

        let mut summary = MaintenanceSummary::default();

        match self.extend_horizon(today, auth_token).await {
            Ok((processed, generated, skipped, failed)) => {
                summary.doctors_processed = processed;
                summary.days_generated = generated;
                summary.days_skipped = skipped;
                summary.doctors_failed = failed;
            }
            Err(e) => {
                // Retention still runs even if the doctor scan itself failed.
                warn!("Horizon extension failed: {}", e);
            }
        }

        summary.days_purged = self.purge_expired_days(today, auth_token).await?;

        info!(
            "Maintenance complete: {} doctors, {} generated, {} skipped, {} failed, {} purged",
            summary.doctors_processed,
            summary.days_generated,
            summary.days_skipped,
            summary.doctors_failed,
            summary.days_purged
        );

        self.activity
            .record("slot_maintenance", json!(summary), auth_token)
            .await;

        Ok(summary)
    }

    /// For every doctor that already has slot days, generate the day at
    /// `today + horizon` unless it is excluded or already covered. Doctors
    /// with no slot days have not opted into slot scheduling and are never
    /// seeded here.
    async fn extend_horizon(
        &self,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<(usize, usize, usize, usize), SlotError> {
        let doctors = self.doctors_with_slot_days(auth_token).await?;
        let target_date = today + ChronoDuration::days(self.schedule.horizon_days);

        let mut generated = 0;
        let mut skipped = 0;
        let mut failed = 0;

        for doctor_id in &doctors {
            match self
                .generator
                .generate_day(*doctor_id, target_date, auth_token)
                .await
            {
                Ok(DayOutcome::Generated) => generated += 1,
                Ok(DayOutcome::SkippedExcludedWeekday) | Ok(DayOutcome::AlreadyExists) => {
                    skipped += 1
                }
                Err(e) => {
                    warn!(
                        "Horizon extension failed for doctor {} on {}: {}",
                        doctor_id, target_date, e
                    );
                    failed += 1;
                }
            }
        }

        Ok((doctors.len(), generated, skipped, failed))
    }

    /// Hard-delete every slot day dated strictly before today, archived or
    /// not. A day dated exactly today survives until tomorrow's run.
    async fn purge_expired_days(
        &self,
        today: NaiveDate,
        auth_token: &str,
    ) -> Result<usize, SlotError> {
        let list_path = format!("/rest/v1/slot_days?date=lt.{}&select=id", today);
        let expired: Vec<Value> = self
            .supabase
            .request(Method::GET, &list_path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if expired.is_empty() {
            debug!("No expired slot days to purge");
            return Ok(0);
        }

        let day_ids: Vec<String> = expired
            .iter()
            .filter_map(|row| row["id"].as_str().map(str::to_string))
            .collect();

        // Child rows first; appointments keep their denormalized snapshots
        // and are never touched here.
        let slots_path = format!("/rest/v1/slots?slot_day_id=in.({})", day_ids.join(","));
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &slots_path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let days_path = format!("/rest/v1/slot_days?date=lt.{}", today);
        let _: Vec<Value> = self
            .supabase
            .request(Method::DELETE, &days_path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        info!("Purged {} expired slot days", day_ids.len());
        Ok(day_ids.len())
    }

    async fn doctors_with_slot_days(&self, auth_token: &str) -> Result<Vec<Uuid>, SlotError> {
        let path = "/rest/v1/slot_days?select=doctor_id";
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        // BTreeSet for a stable processing order in logs and tests
        let doctors: BTreeSet<Uuid> = rows
            .iter()
            .filter_map(|row| row["doctor_id"].as_str())
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect();

        Ok(doctors.into_iter().collect())
    }
}
