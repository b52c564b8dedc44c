use chrono::{DateTime, Utc};
use promo_offer::{Offer, PublicOffer};
use std::sync::Arc;
use uuid::Uuid;

use crate::repository::{OfferFilter, OfferQuery, OfferRepository, OfferStats};
use crate::{CoreError, CoreResult};

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 100;
pub const DEFAULT_PUBLIC_LIMIT: i64 = 10;
pub const MAX_PUBLIC_LIMIT: i64 = 50;

/// Storefront filter value meaning "every category".
pub const ALL_CATEGORIES: &str = "All Brands";

/// 1-based page with a clamped limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT),
        }
    }

    /// Saturates for absurd page numbers; such pages are simply empty.
    pub fn skip(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// Drops the "all" sentinel and blank values.
pub fn category_filter(category: Option<String>) -> Option<String> {
    category
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && c != ALL_CATEGORIES)
}

/// Read side shared by the admin listing and the storefront.
#[derive(Clone)]
pub struct OfferCatalog {
    repo: Arc<dyn OfferRepository>,
}

impl OfferCatalog {
    pub fn new(repo: Arc<dyn OfferRepository>) -> Self {
        Self { repo }
    }

    pub async fn get(&self, id: Uuid) -> CoreResult<Offer> {
        self.repo.get(id).await?.ok_or(CoreError::NotFound(id))
    }

    /// One page of offers plus the total matching the filter.
    pub async fn list(
        &self,
        filter: OfferFilter,
        page: Pagination,
    ) -> CoreResult<(Vec<Offer>, i64)> {
        let total = self.repo.count(&filter).await?;
        let offers = self
            .repo
            .list(&OfferQuery {
                filter,
                skip: page.skip(),
                limit: page.limit,
            })
            .await?;
        Ok((offers, total))
    }

    /// Currently redeemable offers in customer-safe form.
    pub async fn public_active(
        &self,
        category: Option<String>,
        limit: Option<i64>,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<PublicOffer>> {
        let query = OfferQuery {
            filter: OfferFilter::currently_valid(now).with_category(category_filter(category)),
            skip: 0,
            limit: limit.unwrap_or(DEFAULT_PUBLIC_LIMIT).clamp(1, MAX_PUBLIC_LIMIT),
        };
        let offers = self.repo.list(&query).await?;
        Ok(offers.iter().map(Offer::public_view).collect())
    }

    pub async fn stats(&self, now: DateTime<Utc>) -> CoreResult<OfferStats> {
        Ok(self.repo.stats(now).await?)
    }
}
