// libs/slot-cell/src/services/generator.rs
use std::sync::Arc;

use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::{representation_headers, SupabaseClient};

use crate::models::{
    derive_slot_id, DayOutcome, GenerationSummary, SlotError, SlotScheduleConfig,
};

/// Populates a doctor's near-term calendar with bookable slots: a full
/// horizon once per doctor, then one day at a time via the maintenance job.
pub struct SlotGeneratorService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
    schedule: SlotScheduleConfig,
}

impl SlotGeneratorService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_schedule(config, SlotScheduleConfig::default())
    }

    pub fn with_schedule(config: &AppConfig, schedule: SlotScheduleConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let doctor_service = DoctorService::with_client(Arc::clone(&supabase));

        Self {
            supabase,
            doctor_service,
            schedule,
        }
    }

    pub fn schedule(&self) -> &SlotScheduleConfig {
        &self.schedule
    }

    /// Seed the full booking horizon for a doctor with no active slot days.
    ///
    /// Generates one slot day per calendar day for `today+1 ..= today+horizon`,
    /// skipping the excluded weekday entirely. Fails with
    /// `DuplicateGeneration` if the doctor already has any active slot day;
    /// a persistence failure mid-loop leaves already-created days in place.
    pub async fn generate_initial_slots(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<GenerationSummary, SlotError> {
        info!("Generating initial slots for doctor {}", doctor_id);

        self.doctor_service
            .get_doctor(doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => SlotError::DoctorNotFound,
                DoctorError::DatabaseError(msg) => SlotError::DatabaseError(msg),
            })?;

        if self.has_active_slot_days(doctor_id, auth_token).await? {
            return Err(SlotError::DuplicateGeneration);
        }

        let today = Utc::now().date_naive();
        let mut generated_dates = Vec::new();
        let mut skipped_days = 0;

        for offset in 1..=self.schedule.horizon_days {
            let date = today + ChronoDuration::days(offset);

            if date.weekday() == self.schedule.excluded_weekday {
                skipped_days += 1;
                continue;
            }

            self.create_slot_day(doctor_id, date, auth_token).await?;
            generated_dates.push(date);
        }

        info!(
            "Generated {} slot days for doctor {} ({} skipped)",
            generated_dates.len(),
            doctor_id,
            skipped_days
        );

        Ok(GenerationSummary {
            doctor_id,
            generated_days: generated_dates.len(),
            generated_dates,
            skipped_days,
        })
    }

    /// Generate a single slot day if the date is eligible. Used by horizon
    /// extension and the admin on-demand endpoint; an already-covered date or
    /// the excluded weekday is a skip, not an error.
    pub async fn generate_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<DayOutcome, SlotError> {
        if date.weekday() == self.schedule.excluded_weekday {
            debug!("Skipping {} for doctor {}: excluded weekday", date, doctor_id);
            return Ok(DayOutcome::SkippedExcludedWeekday);
        }

        let path = format!(
            "/rest/v1/slot_days?doctor_id=eq.{}&date=eq.{}&limit=1",
            doctor_id, date
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if !existing.is_empty() {
            debug!("Slot day already exists for doctor {} on {}", doctor_id, date);
            return Ok(DayOutcome::AlreadyExists);
        }

        self.create_slot_day(doctor_id, date, auth_token).await?;
        Ok(DayOutcome::Generated)
    }

    async fn has_active_slot_days(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SlotError> {
        let path = format!(
            "/rest/v1/slot_days?doctor_id=eq.{}&is_archived=eq.false&limit=1",
            doctor_id
        );
        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        Ok(!existing.is_empty())
    }

    async fn create_slot_day(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<(), SlotError> {
        let now = Utc::now();
        let day_id = Uuid::new_v4();

        let day_data = json!({
            "id": day_id,
            "doctor_id": doctor_id,
            "date": date,
            "is_archived": false,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/slot_days",
                Some(auth_token),
                Some(day_data),
                Some(representation_headers()),
            )
            .await;

        match result {
            Ok(rows) if rows.is_empty() => {
                return Err(SlotError::DatabaseError("Failed to create slot day".to_string()))
            }
            Ok(_) => {}
            // The unique (doctor_id, date) index surfaces a concurrent seeding
            // attempt as 409, which the database layer reports as a conflict.
            Err(e) if e.to_string().starts_with("Conflict") => {
                return Err(SlotError::DuplicateGeneration)
            }
            Err(e) => return Err(SlotError::DatabaseError(e.to_string())),
        }

        let labels = self.schedule.time_labels();
        let slot_rows: Vec<Value> = labels
            .iter()
            .enumerate()
            .map(|(position, label)| {
                json!({
                    "id": derive_slot_id(doctor_id, date, position),
                    "slot_day_id": day_id,
                    "position": position as i32,
                    "time_label": label,
                    "is_booked": false,
                    "is_available": true,
                })
            })
            .collect();

        let created: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/slots",
                Some(auth_token),
                Some(Value::Array(slot_rows)),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if created.len() != labels.len() {
            return Err(SlotError::DatabaseError(format!(
                "Expected {} slots for {}, created {}",
                labels.len(),
                date,
                created.len()
            )));
        }

        debug!("Created slot day {} for doctor {} on {}", day_id, doctor_id, date);
        Ok(())
    }
}
