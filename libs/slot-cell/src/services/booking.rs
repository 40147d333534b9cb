// libs/slot-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::Appointment;
use doctor_cell::models::DoctorError;
use doctor_cell::services::DoctorService;
use shared_config::AppConfig;
use shared_database::supabase::{representation_headers, SupabaseClient};

use crate::models::{format_slot_date, BookSlotRequest, Slot, SlotDay, SlotError};
use crate::services::activity::ActivityLogService;

/// The single write path that turns an available slot into a confirmed
/// appointment.
///
/// The claim itself is one conditional PATCH keyed on the slot's current
/// unbooked, available state, so two concurrent bookings of the same slot
/// resolve to exactly one winner. The appointment row is written after the
/// claim: a crash between the two leaves the slot stuck booked (recoverable)
/// rather than double-sellable.
pub struct SlotBookingService {
    supabase: Arc<SupabaseClient>,
    doctor_service: DoctorService,
    activity: ActivityLogService,
}

impl SlotBookingService {
    pub fn new(config: &AppConfig) -> Self {
        let supabase = Arc::new(SupabaseClient::new(config));
        let doctor_service = DoctorService::with_client(Arc::clone(&supabase));
        let activity = ActivityLogService::new(Arc::clone(&supabase));

        Self {
            supabase,
            doctor_service,
            activity,
        }
    }

    pub async fn book_slot(
        &self,
        request: BookSlotRequest,
        auth_token: &str,
    ) -> Result<Appointment, SlotError> {
        info!(
            "Booking slot {} in day {} for user {}",
            request.slot_id, request.slot_day_id, request.user_id
        );

        let day = self.get_active_day(request.slot_day_id, auth_token).await?;
        let slot = self
            .get_slot(request.slot_day_id, request.slot_id, auth_token)
            .await?;

        // Fast rejection before any write; the conditional update below is
        // what actually closes the race.
        if !slot.is_bookable() {
            debug!(
                "Slot {} rejected up front (booked: {}, available: {})",
                slot.id, slot.is_booked, slot.is_available
            );
            return Err(SlotError::SlotUnavailable);
        }

        let doctor = self
            .doctor_service
            .get_doctor(request.doctor_id, auth_token)
            .await
            .map_err(|e| match e {
                DoctorError::NotFound => SlotError::DoctorNotFound,
                DoctorError::DatabaseError(msg) => SlotError::DatabaseError(msg),
            })?;

        self.claim_slot(&request, auth_token).await?;

        let appointment = self
            .create_appointment(&request, &day, &slot, doctor.consultation_fee, auth_token)
            .await?;

        self.activity
            .record(
                "slot_booked",
                json!({
                    "appointment_id": appointment.id,
                    "doctor_id": request.doctor_id,
                    "slot_day_id": request.slot_day_id,
                    "slot_id": request.slot_id,
                    "slot_date": appointment.slot_date,
                    "slot_time": appointment.slot_time,
                }),
                auth_token,
            )
            .await;

        info!(
            "Slot {} booked, appointment {} created",
            request.slot_id, appointment.id
        );
        Ok(appointment)
    }

    async fn get_active_day(
        &self,
        slot_day_id: Uuid,
        auth_token: &str,
    ) -> Result<SlotDay, SlotError> {
        let path = format!(
            "/rest/v1/slot_days?id=eq.{}&is_archived=eq.false",
            slot_day_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SlotError::DayNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot day: {}", e)))
    }

    async fn get_slot(
        &self,
        slot_day_id: Uuid,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<Slot, SlotError> {
        let path = format!(
            "/rest/v1/slots?id=eq.{}&slot_day_id=eq.{}",
            slot_id, slot_day_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(SlotError::SlotNotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse slot: {}", e)))
    }

    /// Atomic claim: the filter only matches a slot that is still unbooked
    /// and available, so of N concurrent callers exactly one sees a row come
    /// back. An empty result means someone else won.
    async fn claim_slot(
        &self,
        request: &BookSlotRequest,
        auth_token: &str,
    ) -> Result<(), SlotError> {
        let path = format!(
            "/rest/v1/slots?id=eq.{}&slot_day_id=eq.{}&is_booked=eq.false&is_available=eq.true",
            request.slot_id, request.slot_day_id
        );

        let claimed: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": true })),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| SlotError::DatabaseError(e.to_string()))?;

        if claimed.is_empty() {
            debug!("Lost booking race for slot {}", request.slot_id);
            return Err(SlotError::SlotUnavailable);
        }

        Ok(())
    }

    async fn create_appointment(
        &self,
        request: &BookSlotRequest,
        day: &SlotDay,
        slot: &Slot,
        amount: f64,
        auth_token: &str,
    ) -> Result<Appointment, SlotError> {
        let now = Utc::now();

        let appointment_data = json!({
            "id": Uuid::new_v4(),
            "user_id": request.user_id,
            "patient_id": request.patient_id,
            "doctor_id": request.doctor_id,
            "slot_day_id": request.slot_day_id,
            "slot_id": request.slot_id,
            "amount": amount,
            "slot_time": slot.time_label,
            "slot_date": format_slot_date(day.date),
            "cancelled": false,
            "is_completed": false,
            "payment": false,
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(auth_token),
                Some(appointment_data),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| {
                // The slot stays claimed; there is no compensating rollback
                // here, a reconciliation pass handles orphaned reservations.
                warn!(
                    "Appointment creation failed after claiming slot {}: {}",
                    request.slot_id, e
                );
                SlotError::DatabaseError(e.to_string())
            })?;

        if result.is_empty() {
            warn!(
                "Appointment insert returned no rows for claimed slot {}",
                request.slot_id
            );
            return Err(SlotError::DatabaseError("Failed to create appointment".to_string()));
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| SlotError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }
}
