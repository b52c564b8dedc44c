pub mod admin;
pub mod catalog;
pub mod notify;
pub mod redemption;
pub mod repository;
pub mod storage;

use promo_offer::{RedemptionError, ValidationErrors};
use uuid::Uuid;

pub use admin::OfferAdminService;
pub use catalog::{OfferCatalog, Pagination};
pub use notify::OfferNotifier;
pub use redemption::{Redemption, RedemptionService};
pub use repository::{
    OfferFilter, OfferQuery, OfferRepository, OfferStats, StoreError, WindowFilter,
};
pub use storage::{ImageError, ImageStore, ImageUpload};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("Promo code already exists. Please use a different code.")]
    DuplicatePromoCode(String),
    #[error("Special offer not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Redemption(#[from] RedemptionError),
    #[error("Storage failure: {0}")]
    Storage(String),
    #[error("Image storage failure: {0}")]
    Image(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(code) => CoreError::DuplicatePromoCode(code),
            StoreError::Backend(msg) => CoreError::Storage(msg),
        }
    }
}

impl From<ImageError> for CoreError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::UnsupportedType(_) | ImageError::TooLarge { .. } => {
                CoreError::Validation(ValidationErrors::single("image", err.to_string()))
            }
            ImageError::Io(e) => CoreError::Image(e.to_string()),
        }
    }
}
