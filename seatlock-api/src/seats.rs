use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{get, post},
    Json, Router,
};
use seatlock_booking::{BookingReceipt, LockReceipt, ReleaseReceipt};
use seatlock_shared::SeatSnapshot;
use serde::{Deserialize, Serialize};
use tracing::warn;
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatActionRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeatListResponse {
    pub seats: Vec<SeatSnapshot>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/seats", get(list_seats))
        .route("/seats/{id}", get(get_seat))
        .route("/seats/{id}/lock", post(lock_seat))
        .route("/seats/{id}/confirm", post(confirm_seat))
        .route("/seats/{id}/release", post(release_seat))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /seats
async fn list_seats(State(state): State<AppState>) -> Json<SeatListResponse> {
    Json(SeatListResponse {
        seats: state.facade.list_seats().await,
    })
}

/// GET /seats/{id}
async fn get_seat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SeatSnapshot>, AppError> {
    let seat_id = parse_seat_id(&id)?;
    Ok(Json(state.facade.get_seat(seat_id).await?))
}

/// POST /seats/{id}/lock
/// Temporarily lock a seat for a user, or extend a lock they already hold
async fn lock_seat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SeatActionRequest>, JsonRejection>,
) -> Result<Json<LockReceipt>, AppError> {
    let seat_id = parse_seat_id(&id)?;
    let Json(req) = body?;

    let receipt = state
        .facade
        .lock_seat(seat_id, req.user_id.as_deref())
        .await
        .inspect_err(|e| warn!("Lock on seat {} refused: {}", seat_id, e))?;

    Ok(Json(receipt))
}

/// POST /seats/{id}/confirm
/// Finalize a booking; only the lock holder may confirm
async fn confirm_seat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SeatActionRequest>, JsonRejection>,
) -> Result<Json<BookingReceipt>, AppError> {
    let seat_id = parse_seat_id(&id)?;
    let Json(req) = body?;

    let receipt = state
        .facade
        .confirm_seat(seat_id, req.user_id.as_deref())
        .await
        .inspect_err(|e| warn!("Confirm on seat {} refused: {}", seat_id, e))?;

    Ok(Json(receipt))
}

/// POST /seats/{id}/release
async fn release_seat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<SeatActionRequest>, JsonRejection>,
) -> Result<Json<ReleaseReceipt>, AppError> {
    let seat_id = parse_seat_id(&id)?;
    let Json(req) = body?;

    let receipt = state
        .facade
        .release_seat(seat_id, req.user_id.as_deref())
        .await
        .inspect_err(|e| warn!("Release on seat {} refused: {}", seat_id, e))?;

    Ok(Json(receipt))
}

fn parse_seat_id(raw: &str) -> Result<u32, AppError> {
    raw.parse::<u32>()
        .map_err(|_| AppError::ValidationError(format!("Invalid seat id '{}'.", raw)))
}
