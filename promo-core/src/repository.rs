use async_trait::async_trait;
use chrono::{DateTime, Utc};
use promo_offer::{Offer, OfferFields, PromoCode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique index on the promo code was violated.
    #[error("duplicate promo code: {0}")]
    DuplicateKey(String),
    #[error("{0}")]
    Backend(String),
}

/// Position of an offer's validity window relative to `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFilter {
    /// `valid_from <= now <= valid_until`
    Current,
    /// `valid_until < now`
    Expired,
    /// `now < valid_from`
    Upcoming,
}

#[derive(Debug, Clone)]
pub struct OfferFilter {
    pub is_active: Option<bool>,
    pub category: Option<String>,
    pub window: Option<WindowFilter>,
    pub now: DateTime<Utc>,
}

impl OfferFilter {
    pub fn all(now: DateTime<Utc>) -> Self {
        Self {
            is_active: None,
            category: None,
            window: None,
            now,
        }
    }

    /// Active and inside the window: the storefront's notion of "valid".
    pub fn currently_valid(now: DateTime<Utc>) -> Self {
        Self {
            is_active: Some(true),
            category: None,
            window: Some(WindowFilter::Current),
            now,
        }
    }

    pub fn with_category(mut self, category: Option<String>) -> Self {
        self.category = category;
        self
    }

    /// In-process evaluation; SQL stores translate the same conditions.
    pub fn matches(&self, offer: &Offer) -> bool {
        if let Some(active) = self.is_active {
            if offer.is_active != active {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &offer.category != category {
                return false;
            }
        }
        match self.window {
            Some(WindowFilter::Current) => offer.is_within_window(self.now),
            Some(WindowFilter::Expired) => offer.valid_until < self.now,
            Some(WindowFilter::Upcoming) => self.now < offer.valid_from,
            None => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OfferQuery {
    pub filter: OfferFilter,
    pub skip: i64,
    pub limit: i64,
}

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferStats {
    pub total: i64,
    pub active: i64,
    pub expired: i64,
    pub valid: i64,
    pub redemptions: i64,
}

/// Durable storage for offers.
///
/// Listings are ordered newest first (`created_at` desc, then `id` desc).
/// `promo_code` is unique; violations surface as [`StoreError::DuplicateKey`].
#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn insert(&self, offer: &Offer) -> Result<Offer, StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Offer>, StoreError>;

    async fn find_by_code(&self, code: &PromoCode) -> Result<Option<Offer>, StoreError>;

    async fn list(&self, query: &OfferQuery) -> Result<Vec<Offer>, StoreError>;

    async fn count(&self, filter: &OfferFilter) -> Result<i64, StoreError>;

    /// Replace the admin-editable fields. Never writes `current_redemptions`.
    /// Returns `None` when the offer is gone or the new cap would sit below
    /// the live counter.
    async fn update(
        &self,
        id: Uuid,
        fields: &OfferFields,
        now: DateTime<Utc>,
    ) -> Result<Option<Offer>, StoreError>;

    /// Set `is_active`, or flip it when `is_active` is `None`.
    async fn set_active(
        &self,
        id: Uuid,
        is_active: Option<bool>,
    ) -> Result<Option<Offer>, StoreError>;

    /// Remove and return the record.
    async fn delete(&self, id: Uuid) -> Result<Option<Offer>, StoreError>;

    /// Increment `current_redemptions` by one if, at the moment of the write,
    /// the offer is still active, inside its window, below its cap and
    /// applicable to `product_id`. Check and increment are a single atomic
    /// operation. Returns `None` when the guard did not hold.
    async fn redeem(
        &self,
        id: Uuid,
        now: DateTime<Utc>,
        product_id: Option<Uuid>,
    ) -> Result<Option<Offer>, StoreError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<OfferStats, StoreError>;
}
