// libs/slot-cell/src/services/availability.rs
use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use doctor_cell::models::Doctor;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::{representation_headers, SupabaseClient};

use crate::models::{Slot, SlotDay, SlotDayView, SlotError, SlotStats};

/// Read-side projection of slot days plus the manual availability override.
pub struct SlotAvailabilityService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
}

impl SlotAvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let doctor_service = DoctorService::with_client(Arc::clone(&supabase));

        Self {
            supabase,
            doctor_service,
        }
    }

    /// All non-archived slot days, optionally filtered by doctor, each tagged
    /// with the owning doctor's display name and specialty.
    pub async fn list_slot_days(
        &self,
        doctor_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<SlotDayView>, SlotError> {
        debug!("Listing slot days (doctor filter: {:?})", doctor_id);

        let mut path = "/rest/v1/slot_days?is_archived=eq.false".to_string();
        if let Some(id) = doctor_id {
            path.push_str(&format!("&doctor_id=eq.{}", id));
        }
        path.push_str("&order=date.asc");

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let days: Vec<SlotDay> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<SlotDay>, _>>()
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot days: {}", e)))?;

        if days.is_empty() {
            return Ok(vec![]);
        }

        let mut slots_by_day = self.fetch_slots_for_days(&days, auth_token).await?;

        let mut doctor_ids: Vec<Uuid> = days.iter().map(|d| d.doctor_id).collect();
        doctor_ids.sort();
        doctor_ids.dedup();

        let doctors: HashMap<Uuid, Doctor> = self
            .doctor_service
            .get_doctors_by_ids(&doctor_ids, auth_token)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?
            .into_iter()
            .map(|d| (d.id, d))
            .collect();

        let views = days
            .into_iter()
            .map(|day| {
                let (doctor_name, specialty) = doctors
                    .get(&day.doctor_id)
                    .map(|d| (d.full_name.clone(), d.specialty.clone()))
                    .unwrap_or_else(|| ("Unknown".to_string(), "General".to_string()));

                SlotDayView {
                    id: day.id,
                    doctor_id: day.doctor_id,
                    doctor_name,
                    specialty,
                    date: day.date,
                    slots: slots_by_day.remove(&day.id).unwrap_or_default(),
                }
            })
            .collect();

        Ok(views)
    }

    /// Classify every slot into exactly one bucket: booked wins, then
    /// available, else unavailable.
    pub fn compute_stats(days: &[SlotDayView]) -> SlotStats {
        let mut stats = SlotStats::default();

        for day in days {
            for slot in &day.slots {
                stats.total += 1;
                if slot.is_booked {
                    stats.booked += 1;
                } else if slot.is_available {
                    stats.available += 1;
                } else {
                    stats.unavailable += 1;
                }
            }
        }

        stats
    }

    /// Flip a slot's manual availability override.
    ///
    /// The flip is unconditional: toggling a booked slot is permitted and has
    /// no effect on its booking, which callers are expected to surface in
    /// their UI. Concurrent toggles of the same slot are last-write-wins.
    pub async fn toggle_availability(
        &self,
        slot_day_id: Uuid,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Slot, SlotError> {
        debug!("Toggling availability for slot {} in day {}", slot_id, slot_day_id);

        let day_path = format!(
            "/rest/v1/slot_days?id=eq.{}&is_archived=eq.false",
            slot_day_id
        );
        let day_result: Vec<Value> = self
            .supabase
            .request(Method::GET, &day_path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if day_result.is_empty() {
            return Err(SlotError::DayNotFound);
        }

        let slot_path = format!(
            "/rest/v1/slots?id=eq.{}&slot_day_id=eq.{}",
            slot_id, slot_day_id
        );
        let slot_result: Vec<Value> = self
            .supabase
            .request(Method::GET, &slot_path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if slot_result.is_empty() {
            return Err(SlotError::SlotNotFound);
        }

        let slot: Slot = serde_json::from_value(slot_result[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))?;

        let updated: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &slot_path,
                Some(auth_token),
                Some(json!({ "is_available": !slot.is_available })),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if updated.is_empty() {
            return Err(SlotError::SlotNotFound);
        }

        serde_json::from_value(updated[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    async fn fetch_slots_for_days(
        &self,
        days: &[SlotDay],
        auth_token: &str,
    ) -> Result<HashMap<Uuid, Vec<Slot>>, SlotError> {
        let id_list = days
            .iter()
            .map(|d| d.id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let path = format!(
            "/rest/v1/slots?slot_day_id=in.({})&order=position.asc",
            id_list
        );

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        let slots: Vec<Slot> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Slot>, _>>()
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slots: {}", e)))?;

        let mut by_day: HashMap<Uuid, Vec<Slot>> = HashMap::new();
        for slot in slots {
            by_day.entry(slot.slot_day_id).or_default().push(slot);
        }

        Ok(by_day)
    }
}
