use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures_util::stream::{Stream, StreamExt};
use promo_core::OfferStats;
use promo_offer::OfferView;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;

use crate::error::AppError;
use crate::forms::OfferForm;
use crate::offers::parse_offer_id;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleStatusRequest {
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct OfferMutationResponse {
    pub success: bool,
    pub message: String,
    pub offer: OfferView,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: OfferStats,
}

fn mutation(message: &str, offer: &promo_offer::Offer) -> Json<OfferMutationResponse> {
    Json(OfferMutationResponse {
        success: true,
        message: message.to_string(),
        offer: offer.view_at(Utc::now()),
    })
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /offers
pub async fn create_offer(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<OfferMutationResponse>), AppError> {
    let (input, image) = OfferForm::from_multipart(multipart?).await?.for_create()?;
    let offer = state.admin.create(input, image).await?;

    Ok((StatusCode::CREATED, mutation("Special offer created successfully", &offer)))
}

/// PUT /offers/{id}
pub async fn update_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<OfferMutationResponse>, AppError> {
    let id = parse_offer_id(&id)?;
    let (input, image) = OfferForm::from_multipart(multipart?).await?.for_update()?;
    let offer = state.admin.update(id, input, image).await?;

    Ok(mutation("Special offer updated successfully", &offer))
}

/// PATCH /offers/{id}/toggle-status
/// Without a body (or without `isActive`) the flag flips.
pub async fn toggle_offer_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<OfferMutationResponse>, AppError> {
    let id = parse_offer_id(&id)?;
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        ToggleStatusRequest::default()
    } else {
        serde_json::from_slice::<ToggleStatusRequest>(&body)
            .map_err(|e| AppError::validation("isActive", format!("Invalid request body: {}", e)))?
    };

    let offer = state.admin.toggle_status(id, request.is_active).await?;
    let message = if offer.is_active {
        "Special offer activated successfully"
    } else {
        "Special offer deactivated successfully"
    };

    Ok(mutation(message, &offer))
}

/// DELETE /offers/{id}
pub async fn delete_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let id = parse_offer_id(&id)?;
    state.admin.delete(id).await?;

    Ok(Json(DeleteResponse {
        success: true,
        message: "Special offer deleted successfully".to_string(),
    }))
}

/// GET /offers/stats
pub async fn offer_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let stats = state.catalog.stats(Utc::now()).await?;
    Ok(Json(StatsResponse { success: true, stats }))
}

/// GET /offers/events
/// Server-sent stream of offer notifications, one event per change.
pub async fn offer_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.notifier.subscribe()).filter_map(|msg| async move {
        match msg {
            Ok(event) => match Event::default().event(event.kind()).json_data(&event) {
                Ok(sse) => Some(Ok(sse)),
                Err(e) => {
                    tracing::warn!("failed to encode offer event: {}", e);
                    None
                }
            },
            Err(e) => {
                tracing::debug!("offer event subscriber lagged: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
