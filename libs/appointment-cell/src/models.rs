use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// APPOINTMENT MODELS
// ==============================================================================

/// A confirmed reservation produced by the slot booking service.
///
/// Fee, time label and date are denormalized snapshots taken at booking time,
/// so the record stays meaningful after the referenced slot day is purged by
/// the maintenance job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_day_id: Uuid,
    pub slot_id: Uuid,
    pub amount: f64,
    /// Human-readable slot time, e.g. "09:00 AM".
    pub slot_time: String,
    /// Day_month_year token form, e.g. "10_6_2024".
    pub slot_date: String,
    pub cancelled: bool,
    pub is_completed: bool,
    pub payment: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentSearchQuery {
    pub user_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub cancelled: Option<bool>,
    pub is_completed: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Appointment is already cancelled")]
    AlreadyCancelled,

    #[error("Appointment is already completed")]
    AlreadyCompleted,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
