// libs/slot-cell/src/models.rs
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ==============================================================================
// CORE SLOT MODELS
// ==============================================================================

/// One calendar day of bookable slots for one doctor.
///
/// At most one non-archived row exists per (doctor_id, date); the storage
/// layer enforces this with a unique index, so concurrent seeding fails
/// cleanly instead of duplicating a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDay {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub date: NaiveDate,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single time slot within a day. Position preserves template order, which
/// is chronological order within the day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: Uuid,
    pub slot_day_id: Uuid,
    pub position: i32,
    /// Human-readable time, e.g. "09:00 AM".
    pub time_label: String,
    pub is_booked: bool,
    pub is_available: bool,
}

impl Slot {
    /// A slot can be booked only when it is available and not yet booked.
    pub fn is_bookable(&self) -> bool {
        self.is_available && !self.is_booked
    }
}

/// Slot day enriched with the owning doctor's display info (read-only join,
/// not an ownership relation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotDayView {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub doctor_name: String,
    pub specialty: String,
    pub date: NaiveDate,
    pub slots: Vec<Slot>,
}

/// Aggregate slot counts. Buckets are mutually exclusive and exhaustive:
/// booked wins over availability, so the three counts always sum to total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotStats {
    pub available: usize,
    pub booked: usize,
    pub unavailable: usize,
    pub total: usize,
}

// ==============================================================================
// SCHEDULE CONFIGURATION
// ==============================================================================

/// Generation parameters: slot-time template, horizon length and the weekday
/// the clinic is closed.
#[derive(Debug, Clone)]
pub struct SlotScheduleConfig {
    pub horizon_days: i64,
    pub excluded_weekday: Weekday,
    pub slot_times: Vec<NaiveTime>,
}

impl Default for SlotScheduleConfig {
    fn default() -> Self {
        // Hourly business-day template, 09:00 through 17:00
        let slot_times = (9..=17)
            .map(|hour| NaiveTime::from_hms_opt(hour, 0, 0).expect("valid template hour"))
            .collect();

        Self {
            horizon_days: 30,
            excluded_weekday: Weekday::Fri,
            slot_times,
        }
    }
}

impl SlotScheduleConfig {
    pub fn time_labels(&self) -> Vec<String> {
        self.slot_times
            .iter()
            .map(|t| t.format("%I:%M %p").to_string())
            .collect()
    }
}

/// Deterministic slot id: UUIDv5 of (doctor, date, template position). Stable
/// across regeneration attempts and unique within a day by construction.
pub fn derive_slot_id(doctor_id: Uuid, date: NaiveDate, position: usize) -> Uuid {
    let name = format!("{}:{}:{}", doctor_id, date, position);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

/// Day_month_year token form used for the appointment snapshot,
/// e.g. 2024-06-10 -> "10_6_2024".
pub fn format_slot_date(date: NaiveDate) -> String {
    format!("{}_{}_{}", date.day(), date.month(), date.year())
}

// ==============================================================================
// OPERATION RESULTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSummary {
    pub doctor_id: Uuid,
    pub generated_dates: Vec<NaiveDate>,
    pub generated_days: usize,
    pub skipped_days: usize,
}

/// Outcome of single-day generation, used by the maintenance job and the
/// admin on-demand endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayOutcome {
    Generated,
    SkippedExcludedWeekday,
    AlreadyExists,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MaintenanceSummary {
    pub doctors_processed: usize,
    pub days_generated: usize,
    pub days_skipped: usize,
    pub doctors_failed: usize,
    pub days_purged: usize,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookSlotRequest {
    pub user_id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub slot_day_id: Uuid,
    pub slot_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateDayRequest {
    pub date: NaiveDate,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Slot day not found")]
    DayNotFound,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Doctor already has slots")]
    DuplicateGeneration,

    #[error("Slot is not available for booking")]
    SlotUnavailable,

    #[error("Database error: {0}")]
    DatabaseError(String),
}
