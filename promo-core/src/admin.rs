use chrono::Utc;
use promo_offer::{Offer, OfferInput, ValidationErrors};
use promo_shared::OfferEvent;
use std::sync::Arc;
use uuid::Uuid;

use crate::notify::OfferNotifier;
use crate::repository::OfferRepository;
use crate::storage::{ImageStore, ImageUpload};
use crate::{CoreError, CoreResult};

/// Admin write operations: create, update, toggle, delete.
///
/// Image files and records are not written transactionally. A failed record
/// write removes the freshly stored image; a replaced or deleted record's old
/// image is removed after the record write, best effort.
#[derive(Clone)]
pub struct OfferAdminService {
    repo: Arc<dyn OfferRepository>,
    images: Arc<dyn ImageStore>,
    notifier: OfferNotifier,
}

impl OfferAdminService {
    pub fn new(
        repo: Arc<dyn OfferRepository>,
        images: Arc<dyn ImageStore>,
        notifier: OfferNotifier,
    ) -> Self {
        Self { repo, images, notifier }
    }

    pub async fn create(&self, input: OfferInput, image: Option<ImageUpload>) -> CoreResult<Offer> {
        let mut fields = input.into_new()?;

        if self.repo.find_by_code(&fields.promo_code).await?.is_some() {
            return Err(CoreError::DuplicatePromoCode(fields.promo_code.into_inner()));
        }

        if let Some(upload) = image {
            fields.image = Some(self.images.save(upload).await?);
        }

        let offer = Offer::create(fields, Utc::now());
        let stored = match self.repo.insert(&offer).await {
            Ok(stored) => stored,
            Err(e) => {
                self.discard_image(offer.image.as_deref()).await;
                return Err(e.into());
            }
        };

        tracing::info!(
            offer_id = %stored.id,
            promo_code = %stored.promo_code,
            "special offer created"
        );
        self.notifier.publish(OfferEvent::Created {
            offer_id: stored.id,
            promo_code: stored.promo_code.clone(),
            at: stored.created_at,
        });
        Ok(stored)
    }

    pub async fn update(
        &self,
        id: Uuid,
        input: OfferInput,
        image: Option<ImageUpload>,
    ) -> CoreResult<Offer> {
        let existing = self.repo.get(id).await?.ok_or(CoreError::NotFound(id))?;
        let mut fields = input.merge_onto(&existing)?;

        if fields.promo_code.as_str() != existing.promo_code {
            if let Some(other) = self.repo.find_by_code(&fields.promo_code).await? {
                if other.id != id {
                    return Err(CoreError::DuplicatePromoCode(fields.promo_code.into_inner()));
                }
            }
        }

        let new_image = match image {
            Some(upload) => Some(self.images.save(upload).await?),
            None => None,
        };
        if new_image.is_some() {
            fields.image = new_image.clone();
        }

        let updated = match self.repo.update(id, &fields, Utc::now()).await {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                self.discard_image(new_image.as_deref()).await;
                // Either deleted meanwhile, or redemptions overtook the new cap.
                return Err(match self.repo.get(id).await? {
                    None => CoreError::NotFound(id),
                    Some(current) => CoreError::Validation(ValidationErrors::single(
                        "maxRedemptions",
                        format!(
                            "maxRedemptions cannot be lower than current redemptions ({})",
                            current.current_redemptions
                        ),
                    )),
                });
            }
            Err(e) => {
                self.discard_image(new_image.as_deref()).await;
                return Err(e.into());
            }
        };

        if new_image.is_some() {
            self.discard_image(existing.image.as_deref()).await;
        }

        tracing::info!(offer_id = %updated.id, "special offer updated");
        self.notifier.publish(OfferEvent::Updated {
            offer_id: updated.id,
            promo_code: updated.promo_code.clone(),
            at: updated.updated_at,
        });
        Ok(updated)
    }

    /// Set the activation flag, or flip it when `is_active` is `None`.
    pub async fn toggle_status(&self, id: Uuid, is_active: Option<bool>) -> CoreResult<Offer> {
        let offer = self
            .repo
            .set_active(id, is_active)
            .await?
            .ok_or(CoreError::NotFound(id))?;

        tracing::info!(
            offer_id = %offer.id,
            is_active = offer.is_active,
            "special offer status changed"
        );
        self.notifier.publish(OfferEvent::StatusChanged {
            offer_id: offer.id,
            is_active: offer.is_active,
            at: Utc::now(),
        });
        Ok(offer)
    }

    pub async fn delete(&self, id: Uuid) -> CoreResult<Offer> {
        let removed = self.repo.delete(id).await?.ok_or(CoreError::NotFound(id))?;
        self.discard_image(removed.image.as_deref()).await;

        tracing::info!(
            offer_id = %removed.id,
            promo_code = %removed.promo_code,
            "special offer deleted"
        );
        self.notifier.publish(OfferEvent::Deleted {
            offer_id: removed.id,
            promo_code: removed.promo_code.clone(),
            at: Utc::now(),
        });
        Ok(removed)
    }

    async fn discard_image(&self, path: Option<&str>) {
        let Some(path) = path else { return };
        if let Err(e) = self.images.remove(path).await {
            tracing::warn!(image = path, error = %e, "failed to delete offer image");
        }
    }
}
