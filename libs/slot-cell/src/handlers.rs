// libs/slot-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{BookSlotRequest, DayOutcome, GenerateDayRequest, SlotError};
use crate::services::{
    SlotAvailabilityService, SlotBookingService, SlotGeneratorService, SlotMaintenanceService,
};

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotListQuery {
    pub doctor_id: Option<Uuid>,
}

fn map_slot_error(e: SlotError) -> AppError {
    match e {
        SlotError::DoctorNotFound => AppError::NotFound("Doctor not found".to_string()),
        SlotError::DayNotFound => AppError::NotFound("Slot day not found".to_string()),
        SlotError::SlotNotFound => AppError::NotFound("Slot not found".to_string()),
        SlotError::DuplicateGeneration => {
            AppError::Conflict("Doctor already has slots".to_string())
        }
        SlotError::SlotUnavailable => {
            AppError::BadRequest("Slot is no longer available".to_string())
        }
        SlotError::DatabaseError(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// GENERATION HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn generate_initial_slots(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only admins can generate slots".to_string()));
    }

    let generator = SlotGeneratorService::new(&state);

    let summary = generator
        .generate_initial_slots(doctor_id, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "generation": summary,
        "message": "Slots generated"
    })))
}

#[axum::debug_handler]
pub async fn generate_day(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<GenerateDayRequest>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only admins can generate slots".to_string()));
    }

    let generator = SlotGeneratorService::new(&state);

    let outcome = generator
        .generate_day(doctor_id, request.date, auth.token())
        .await
        .map_err(map_slot_error)?;

    let (generated, message) = match outcome {
        DayOutcome::Generated => (true, "Slot day generated"),
        DayOutcome::SkippedExcludedWeekday => (false, "Date falls on the excluded weekday"),
        DayOutcome::AlreadyExists => (false, "Slot day already exists for this date"),
    };

    Ok(Json(json!({
        "success": true,
        "generated": generated,
        "date": request.date,
        "message": message
    })))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_slot_days(
    State(state): State<Arc<AppConfig>>,
    Query(query): Query<SlotListQuery>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = SlotAvailabilityService::new(&state);

    let days = service
        .list_slot_days(query.doctor_id, auth.token())
        .await
        .map_err(map_slot_error)?;

    let stats = SlotAvailabilityService::compute_stats(&days);

    Ok(Json(json!({
        "success": true,
        "slot_days": days,
        "stats": stats
    })))
}

#[axum::debug_handler]
pub async fn toggle_availability(
    State(state): State<Arc<AppConfig>>,
    Path((slot_day_id, slot_id)): Path<(Uuid, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Auth(
            "Only doctors and admins can change slot availability".to_string(),
        ));
    }

    let service = SlotAvailabilityService::new(&state);

    let slot = service
        .toggle_availability(slot_day_id, slot_id, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
        "message": "Availability updated"
    })))
}

// ==============================================================================
// BOOKING HANDLER
// ==============================================================================

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookSlotRequest>,
) -> Result<Json<Value>, AppError> {
    // Users book for themselves; admins can book on anyone's behalf
    let is_self = request.user_id.to_string() == user.id;
    if !is_self && !user.is_admin() {
        return Err(AppError::Auth(
            "Not authorized to book a slot for this user".to_string(),
        ));
    }

    let service = SlotBookingService::new(&state);

    let appointment = service
        .book_slot(request, auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Slot booked"
    })))
}

// ==============================================================================
// MAINTENANCE HANDLER
// ==============================================================================

#[axum::debug_handler]
pub async fn run_maintenance(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_admin() {
        return Err(AppError::Auth("Only admins can run maintenance".to_string()));
    }

    let service = SlotMaintenanceService::new(&state);

    let summary = service
        .run(auth.token())
        .await
        .map_err(map_slot_error)?;

    Ok(Json(json!({
        "success": true,
        "maintenance": summary
    })))
}
