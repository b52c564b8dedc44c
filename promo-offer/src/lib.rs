pub mod changes;
pub mod models;
pub mod promo_code;
pub mod validator;

pub use changes::{FieldError, OfferFields, OfferInput, ValidationErrors};
pub use models::{DiscountTerms, DiscountType, Offer, OfferView, ProductDetails, PublicOffer};
pub use promo_code::{PromoCode, PromoCodeError};
pub use validator::{check_redeemable, validate_redemption, RedemptionError};
