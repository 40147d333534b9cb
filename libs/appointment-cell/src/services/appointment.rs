use std::sync::Arc;

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{representation_headers, SupabaseClient};

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};

/// Read and lifecycle operations over appointments created by the slot
/// booking service. Cancellation restores the originating slot's
/// bookability; completion and payment only flip flags.
pub struct AppointmentService {
    supabase: Arc<SupabaseClient>,
}

impl AppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Fetching appointment: {}", appointment_id);

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        let appointment: Appointment = serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))?;

        Ok(appointment)
    }

    pub async fn search_appointments(
        &self,
        query: AppointmentSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, AppointmentError> {
        debug!("Searching appointments with filters: {:?}", query);

        let mut query_parts = Vec::new();

        if let Some(user_id) = query.user_id {
            query_parts.push(format!("user_id=eq.{}", user_id));
        }
        if let Some(patient_id) = query.patient_id {
            query_parts.push(format!("patient_id=eq.{}", patient_id));
        }
        if let Some(doctor_id) = query.doctor_id {
            query_parts.push(format!("doctor_id=eq.{}", doctor_id));
        }
        if let Some(cancelled) = query.cancelled {
            query_parts.push(format!("cancelled=eq.{}", cancelled));
        }
        if let Some(is_completed) = query.is_completed {
            query_parts.push(format!("is_completed=eq.{}", is_completed));
        }

        let mut path = format!(
            "/rest/v1/appointments?{}&order=created_at.desc",
            query_parts.join("&")
        );

        if let Some(limit) = query.limit {
            path.push_str(&format!("&limit={}", limit));
        }
        if let Some(offset) = query.offset {
            path.push_str(&format!("&offset={}", offset));
        }

        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        let appointments: Vec<Appointment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Appointment>, _>>()
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointments: {}", e)))?;

        Ok(appointments)
    }

    /// Cancel an appointment and free its slot for rebooking.
    ///
    /// Completed appointments cannot be cancelled. The slot release is a
    /// conditional update keyed on `is_booked=true`; if the slot day was
    /// already purged by maintenance the release matches nothing and the
    /// cancellation still stands.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Cancelling appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.cancelled {
            return Err(AppointmentError::AlreadyCancelled);
        }
        if current.is_completed {
            return Err(AppointmentError::AlreadyCompleted);
        }

        let cancelled = self
            .update_flags(appointment_id, json!({ "cancelled": true }), auth_token)
            .await?;

        self.release_slot(&current, auth_token).await;

        info!("Appointment {} cancelled", appointment_id);
        Ok(cancelled)
    }

    /// Mark an appointment completed. Cancelled appointments are rejected so
    /// the cancelled+completed state cannot arise.
    pub async fn complete_appointment(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Completing appointment: {}", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.cancelled {
            return Err(AppointmentError::AlreadyCancelled);
        }
        if current.is_completed {
            return Err(AppointmentError::AlreadyCompleted);
        }

        let completed = self
            .update_flags(appointment_id, json!({ "is_completed": true }), auth_token)
            .await?;

        info!("Appointment {} completed", appointment_id);
        Ok(completed)
    }

    /// Record that the appointment has been paid for.
    pub async fn mark_paid(
        &self,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!("Marking appointment {} as paid", appointment_id);

        let current = self.get_appointment(appointment_id, auth_token).await?;

        if current.cancelled {
            return Err(AppointmentError::AlreadyCancelled);
        }

        self.update_flags(appointment_id, json!({ "payment": true }), auth_token)
            .await
    }

    async fn update_flags(
        &self,
        appointment_id: Uuid,
        mut flags: Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        if let Some(map) = flags.as_object_mut() {
            map.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));
        }

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(flags),
                Some(representation_headers()),
            )
            .await
            .map_err(|e| AppointmentError::DatabaseError(e.to_string()))?;

        if result.is_empty() {
            return Err(AppointmentError::NotFound);
        }

        serde_json::from_value(result[0].clone())
            .map_err(|e| AppointmentError::DatabaseError(format!("Failed to parse appointment: {}", e)))
    }

    async fn release_slot(&self, appointment: &Appointment, auth_token: &str) {
        let path = format!(
            "/rest/v1/slots?id=eq.{}&slot_day_id=eq.{}&is_booked=eq.true",
            appointment.slot_id, appointment.slot_day_id
        );

        let released: Result<Vec<Value>, _> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(json!({ "is_booked": false })),
                Some(representation_headers()),
            )
            .await;

        match released {
            Ok(rows) if rows.is_empty() => {
                debug!(
                    "Slot {} for appointment {} no longer present or not booked",
                    appointment.slot_id, appointment.id
                );
            }
            Ok(_) => {
                info!(
                    "Slot {} released after cancellation of appointment {}",
                    appointment.slot_id, appointment.id
                );
            }
            Err(e) => {
                // Cancellation already persisted; a stuck-booked slot is
                // recoverable by support action.
                warn!(
                    "Failed to release slot {} for appointment {}: {}",
                    appointment.slot_id, appointment.id, e
                );
            }
        }
    }
}
