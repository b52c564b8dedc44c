use chrono::{DateTime, Utc};
use promo_offer::{validate_redemption, DiscountTerms, PromoCode, RedemptionError};
use promo_shared::OfferEvent;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::notify::OfferNotifier;
use crate::repository::OfferRepository;
use crate::CoreResult;

/// How many times a redemption re-reads and retries after its conditional
/// increment lost to a concurrent writer while the offer still looked valid.
pub const MAX_REDEEM_ATTEMPTS: usize = 3;

/// Outcome of a successful redemption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Redemption {
    pub offer_id: Uuid,
    pub terms: DiscountTerms,
    pub current_redemptions: i32,
    pub remaining_redemptions: Option<i32>,
}

#[derive(Clone)]
pub struct RedemptionService {
    repo: Arc<dyn OfferRepository>,
    notifier: OfferNotifier,
}

impl RedemptionService {
    pub fn new(repo: Arc<dyn OfferRepository>, notifier: OfferNotifier) -> Self {
        Self { repo, notifier }
    }

    pub async fn redeem(
        &self,
        promo_code: &str,
        product_id: Option<Uuid>,
    ) -> CoreResult<Redemption> {
        self.redeem_at(promo_code, product_id, Utc::now()).await
    }

    /// Validate against a fresh snapshot, then apply the store's atomic
    /// increment-if-still-redeemable. The snapshot check only picks the error
    /// to report; the store's guard is what enforces the cap.
    pub async fn redeem_at(
        &self,
        promo_code: &str,
        product_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> CoreResult<Redemption> {
        // A code that can't be parsed can't be stored either.
        let Ok(code) = PromoCode::parse(promo_code) else {
            return Err(RedemptionError::NotFound.into());
        };

        for attempt in 1..=MAX_REDEEM_ATTEMPTS {
            let snapshot = self.repo.find_by_code(&code).await?;
            validate_redemption(snapshot.as_ref(), now, product_id)?;
            let Some(offer) = snapshot else {
                return Err(RedemptionError::NotFound.into());
            };

            match self.repo.redeem(offer.id, now, product_id).await? {
                Some(updated) => {
                    tracing::info!(
                        offer_id = %updated.id,
                        promo_code = %updated.promo_code,
                        current = updated.current_redemptions,
                        "promo code redeemed"
                    );
                    self.notifier.publish(OfferEvent::Redeemed {
                        offer_id: updated.id,
                        promo_code: updated.promo_code.clone(),
                        product_id,
                        current_redemptions: updated.current_redemptions,
                        at: now,
                    });
                    return Ok(Redemption {
                        offer_id: updated.id,
                        terms: updated.discount_terms(),
                        current_redemptions: updated.current_redemptions,
                        remaining_redemptions: updated.remaining_redemptions(),
                    });
                }
                None => {
                    tracing::debug!(
                        %code,
                        attempt,
                        "conditional increment did not apply, re-reading"
                    );
                }
            }
        }

        tracing::warn!(%code, "giving up on redemption after {} attempts", MAX_REDEEM_ATTEMPTS);
        Err(RedemptionError::Contended.into())
    }
}
