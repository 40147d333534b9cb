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

use crate::models::{Appointment, AppointmentError, AppointmentSearchQuery};
use crate::services::AppointmentService;

#[derive(Debug, Deserialize)]
pub struct AppointmentQueryParams {
    pub user_id: Option<Uuid>,
    pub patient_id: Option<Uuid>,
    pub doctor_id: Option<Uuid>,
    pub cancelled: Option<bool>,
    pub is_completed: Option<bool>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

fn can_access(appointment: &Appointment, user: &User) -> bool {
    appointment.user_id.to_string() == user.id
        || appointment.doctor_id.to_string() == user.id
        || user.is_admin()
}

fn map_error(e: AppointmentError) -> AppError {
    match e {
        AppointmentError::NotFound => AppError::NotFound("Appointment not found".to_string()),
        AppointmentError::AlreadyCancelled => {
            AppError::BadRequest("Appointment is already cancelled".to_string())
        }
        AppointmentError::AlreadyCompleted => {
            AppError::BadRequest("Appointment is already completed".to_string())
        }
        AppointmentError::DatabaseError(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let appointment = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    if !can_access(&appointment, &user) {
        return Err(AppError::Auth("Not authorized to view this appointment".to_string()));
    }

    Ok(Json(json!(appointment)))
}

#[axum::debug_handler]
pub async fn search_appointments(
    State(state): State<Arc<AppConfig>>,
    Query(params): Query<AppointmentQueryParams>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    // Non-admins only see their own side of the ledger
    let mut query = AppointmentSearchQuery {
        user_id: params.user_id,
        patient_id: params.patient_id,
        doctor_id: params.doctor_id,
        cancelled: params.cancelled,
        is_completed: params.is_completed,
        limit: params.limit,
        offset: params.offset,
    };

    if !user.is_admin() {
        if user.is_doctor() {
            query.doctor_id = Uuid::parse_str(&user.id).ok();
        } else {
            query.user_id = Uuid::parse_str(&user.id).ok();
        }
    }

    let service = AppointmentService::new(&state);

    let appointments = service
        .search_appointments(query, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointments": appointments
    })))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let current = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    if !can_access(&current, &user) {
        return Err(AppError::Auth("Not authorized to cancel this appointment".to_string()));
    }

    let appointment = service
        .cancel_appointment(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment cancelled"
    })))
}

#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    if !user.is_doctor() && !user.is_admin() {
        return Err(AppError::Auth("Only doctors can complete appointments".to_string()));
    }

    let service = AppointmentService::new(&state);

    let appointment = service
        .complete_appointment(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment completed"
    })))
}

#[axum::debug_handler]
pub async fn mark_paid(
    State(state): State<Arc<AppConfig>>,
    Path(appointment_id): Path<Uuid>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    let service = AppointmentService::new(&state);

    let current = service
        .get_appointment(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    if !can_access(&current, &user) {
        return Err(AppError::Auth("Not authorized to update this appointment".to_string()));
    }

    let appointment = service
        .mark_paid(appointment_id, auth.token())
        .await
        .map_err(map_error)?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Payment recorded"
    })))
}
