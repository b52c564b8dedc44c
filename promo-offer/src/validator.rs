//! Redeemability check for a single offer.
//!
//! Pure function of (snapshot, now, product): no I/O, no mutation. The checks
//! run in a fixed order and stop at the first failure, so callers always see
//! the most fundamental reason an offer cannot be used.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{DiscountTerms, Offer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedemptionError {
    #[error("Invalid or unknown promo code")]
    NotFound,

    #[error("This offer is currently inactive")]
    Inactive,

    #[error("This offer is not valid at this time")]
    OutOfWindow,

    #[error("This offer has reached its maximum redemption limit")]
    RedemptionLimitReached,

    #[error("This offer is not applicable to the selected product")]
    ProductNotEligible,

    /// The conditional increment kept losing to concurrent writers.
    #[error("This offer is busy, please try again")]
    Contended,
}

impl RedemptionError {
    pub fn code(&self) -> &'static str {
        match self {
            RedemptionError::NotFound => "PROMO_CODE_NOT_FOUND",
            RedemptionError::Inactive => "OFFER_INACTIVE",
            RedemptionError::OutOfWindow => "OFFER_OUT_OF_WINDOW",
            RedemptionError::RedemptionLimitReached => "REDEMPTION_LIMIT_REACHED",
            RedemptionError::ProductNotEligible => "PRODUCT_NOT_ELIGIBLE",
            RedemptionError::Contended => "REDEMPTION_CONTENDED",
        }
    }
}

/// Decide whether `offer` (the result of a promo-code lookup) can be redeemed
/// right now, optionally for a specific product.
pub fn validate_redemption(
    offer: Option<&Offer>,
    now: DateTime<Utc>,
    product_id: Option<Uuid>,
) -> Result<DiscountTerms, RedemptionError> {
    let offer = offer.ok_or(RedemptionError::NotFound)?;
    check_redeemable(offer, now, product_id)?;
    Ok(offer.discount_terms())
}

/// Checks 2..5 on an offer that is known to exist. Stores reuse this as the
/// guard of their conditional increment.
pub fn check_redeemable(
    offer: &Offer,
    now: DateTime<Utc>,
    product_id: Option<Uuid>,
) -> Result<(), RedemptionError> {
    if !offer.is_active {
        return Err(RedemptionError::Inactive);
    }

    if !offer.is_within_window(now) {
        return Err(RedemptionError::OutOfWindow);
    }

    if !offer.has_capacity() {
        return Err(RedemptionError::RedemptionLimitReached);
    }

    // No product chosen yet: the code can be checked before checkout.
    if let Some(product_id) = product_id {
        if !offer.applies_to(product_id) {
            return Err(RedemptionError::ProductNotEligible);
        }
    }

    Ok(())
}
