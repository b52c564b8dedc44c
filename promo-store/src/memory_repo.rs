use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_core::repository::{OfferFilter, OfferQuery, OfferRepository, OfferStats, StoreError};
use promo_offer::{check_redeemable, Offer, OfferFields, PromoCode};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local offer store. Every mutation happens under one write lock, so
/// the redemption guard and increment are atomic with respect to each other.
#[derive(Default)]
pub struct InMemoryOfferRepository {
    offers: RwLock<HashMap<Uuid, Offer>>,
}

impl InMemoryOfferRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(a: &&Offer, b: &&Offer) -> std::cmp::Ordering {
    b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
}

#[async_trait]
impl OfferRepository for InMemoryOfferRepository {
    async fn insert(&self, offer: &Offer) -> Result<Offer, StoreError> {
        let mut offers = self.offers.write().await;
        if offers.values().any(|o| o.promo_code == offer.promo_code) {
            return Err(StoreError::DuplicateKey(offer.promo_code.clone()));
        }
        offers.insert(offer.id, offer.clone());
        Ok(offer.clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Offer>, StoreError> {
        Ok(self.offers.read().await.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Offer>, StoreError> {
        let offers = self.offers.read().await;
        Ok(offers.values().find(|o| o.promo_code == code.as_str()).cloned())
    }

    async fn list(&self, query: &OfferQuery) -> Result<Vec<Offer>, StoreError> {
        let offers = self.offers.read().await;
        let mut matching: Vec<&Offer> =
            offers.values().filter(|o| query.filter.matches(o)).collect();
        matching.sort_by(newest_first);

        Ok(matching
            .into_iter()
            .skip(query.skip.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count(&self, filter: &OfferFilter) -> Result<i64, StoreError> {
        let offers = self.offers.read().await;
        Ok(offers.values().filter(|o| filter.matches(o)).count() as i64)
    }

    async fn update(
        &self,
        id: Uuid,
        fields: &OfferFields,
        now: DateTime<Utc>,
    ) -> Result<Option<Offer>, StoreError> {
        let mut offers = self.offers.write().await;

        let code = fields.promo_code.as_str();
        if offers.values().any(|o| o.id != id && o.promo_code == code) {
            return Err(StoreError::DuplicateKey(code.to_string()));
        }

        let Some(offer) = offers.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(max) = fields.max_redemptions {
            if offer.current_redemptions > max {
                return Ok(None);
            }
        }

        offer.apply(fields.clone(), now);
        Ok(Some(offer.clone()))
    }

    async fn set_active(
        &self,
        id: Uuid,
        is_active: Option<bool>,
    ) -> Result<Option<Offer>, StoreError> {
        let mut offers = self.offers.write().await;
        let Some(offer) = offers.get_mut(&id) else {
            return Ok(None);
        };
        offer.is_active = is_active.unwrap_or(!offer.is_active);
        offer.updated_at = Utc::now();
        Ok(Some(offer.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Offer>, StoreError> {
        Ok(self.offers.write().await.remove(&id))
    }

    async fn redeem(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        product_id: Option<Uuid>,
    ) -> Result<Option<Offer>, StoreError> {
        let mut offers = self.offers.write().await;
        let Some(offer) = offers.get_mut(&id) else {
            return Ok(None);
        };
        if check_redeemable(offer, now, product_id).is_err() {
            return Ok(None);
        }

        offer.current_redemptions += 1;
        offer.updated_at = Utc::now();
        Ok(Some(offer.clone()))
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<OfferStats, StoreError> {
        let offers = self.offers.read().await;
        let mut stats = OfferStats::default();
        for offer in offers.values() {
            stats.total += 1;
            if offer.is_active {
                stats.active += 1;
            }
            if offer.valid_until < now {
                stats.expired += 1;
            }
            if offer.is_valid_at(now) {
                stats.valid += 1;
            }
            stats.redemptions += i64::from(offer.current_redemptions);
        }
        Ok(stats)
    }
}
