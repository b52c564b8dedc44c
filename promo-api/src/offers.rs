use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use promo_core::catalog::category_filter;
use promo_core::{OfferFilter, Pagination, WindowFilter};
use promo_offer::{DiscountTerms, OfferView, PublicOffer, ValidationErrors};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query string of `GET /offers`. Kept as raw strings so bad values come back
/// as field errors instead of a bare extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListOffersParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub validity: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OfferListResponse {
    pub offers: Vec<OfferView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Deserialize)]
pub struct PublicOffersParams {
    pub category: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PublicOffersResponse {
    pub success: bool,
    pub offers: Vec<PublicOffer>,
}

#[derive(Debug, Serialize)]
pub struct OfferResponse {
    pub success: bool,
    pub offer: OfferView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemRequest {
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub success: bool,
    pub message: String,
    pub offer: DiscountTerms,
    pub remaining_redemptions: Option<i32>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /offers
pub async fn list_offers(
    State(state): State<AppState>,
    Query(params): Query<ListOffersParams>,
) -> Result<Json<OfferListResponse>, AppError> {
    let now = Utc::now();
    let mut errors = ValidationErrors::new();

    let is_active = match params.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some("active") => Some(true),
        Some("inactive") => Some(false),
        Some(other) => {
            errors.add("status", format!("Unknown status filter: {}", other));
            None
        }
    };
    let window = match params.validity.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some("current") => Some(WindowFilter::Current),
        Some("expired") => Some(WindowFilter::Expired),
        Some("upcoming") => Some(WindowFilter::Upcoming),
        Some(other) => {
            errors.add("validity", format!("Unknown validity filter: {}", other));
            None
        }
    };
    let page = parse_number(&mut errors, "page", params.page.as_deref());
    let limit = parse_number(&mut errors, "limit", params.limit.as_deref());
    errors.check().map_err(AppError::Validation)?;

    let filter = OfferFilter {
        is_active,
        window,
        ..OfferFilter::all(now)
    }
    .with_category(category_filter(params.category));
    let pagination = Pagination::new(page, limit);

    let (offers, total) = state.catalog.list(filter, pagination).await?;

    Ok(Json(OfferListResponse {
        offers: offers.iter().map(|o| o.view_at(now)).collect(),
        total,
        page: pagination.page,
        limit: pagination.limit,
    }))
}

/// GET /offers/public/active
pub async fn public_active_offers(
    State(state): State<AppState>,
    Query(params): Query<PublicOffersParams>,
) -> Result<Json<PublicOffersResponse>, AppError> {
    let mut errors = ValidationErrors::new();
    let limit = parse_number(&mut errors, "limit", params.limit.as_deref());
    errors.check().map_err(AppError::Validation)?;

    let offers = state
        .catalog
        .public_active(params.category, limit, Utc::now())
        .await?;

    Ok(Json(PublicOffersResponse { success: true, offers }))
}

/// GET /offers/{id}
pub async fn get_offer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<OfferResponse>, AppError> {
    let id = parse_offer_id(&id)?;
    let offer = state.catalog.get(id).await?;

    Ok(Json(OfferResponse {
        success: true,
        offer: offer.view_at(Utc::now()),
    }))
}

/// POST /offers/redeem/{promo_code}
/// The body is optional: `{ "productId": "<uuid>" }`.
pub async fn redeem_offer(
    State(state): State<AppState>,
    Path(promo_code): Path<String>,
    body: Bytes,
) -> Result<Json<RedeemResponse>, AppError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        RedeemRequest::default()
    } else {
        serde_json::from_slice::<RedeemRequest>(&body)
            .map_err(|e| AppError::validation("productId", format!("Invalid request body: {}", e)))?
    };

    let redemption = state.redemption.redeem(&promo_code, request.product_id).await?;

    Ok(Json(RedeemResponse {
        success: true,
        message: "Promo code applied successfully".to_string(),
        offer: redemption.terms,
        remaining_redemptions: redemption.remaining_redemptions,
    }))
}

/// Malformed ids can't name an offer, so they're reported like missing ones.
pub(crate) fn parse_offer_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("Special offer not found".to_string()))
}

fn parse_number(errors: &mut ValidationErrors, field: &str, raw: Option<&str>) -> Option<i64> {
    let raw = raw.map(str::trim).filter(|v| !v.is_empty())?;
    match raw.parse::<i64>() {
        Ok(n) => Some(n),
        Err(_) => {
            errors.add(field, format!("{} must be a whole number", field));
            None
        }
    }
}
