use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::changes::OfferFields;

/// How `discount_value` is applied at checkout
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    #[default]
    Percentage,
    Fixed,
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountType::Percentage => write!(f, "percentage"),
            DiscountType::Fixed => write!(f, "fixed"),
        }
    }
}

impl FromStr for DiscountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" => Ok(DiscountType::Percentage),
            "fixed" => Ok(DiscountType::Fixed),
            other => Err(format!("unknown discount type '{}'", other)),
        }
    }
}

/// Snapshot of the promoted product, shown on the storefront card.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetails {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub original_price: Option<f64>,
    #[serde(default)]
    pub specs: Option<String>,
}

/// A promotional offer identified by a unique promo code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub category: String,
    pub promo_code: String,
    pub image: Option<String>,
    pub is_active: bool,
    pub redemption_steps: Vec<String>,
    pub product_details: ProductDetails,
    pub max_redemptions: Option<i32>,
    pub current_redemptions: i32,
    pub target_products: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Offer {
    /// Materialize validated fields into a fresh record with a zero counter.
    pub fn create(fields: OfferFields, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: fields.title,
            description: fields.description,
            discount: fields.discount,
            discount_type: fields.discount_type,
            discount_value: fields.discount_value,
            valid_from: fields.valid_from,
            valid_until: fields.valid_until,
            category: fields.category,
            promo_code: fields.promo_code.into_inner(),
            image: fields.image,
            is_active: fields.is_active,
            redemption_steps: fields.redemption_steps,
            product_details: fields.product_details,
            max_redemptions: fields.max_redemptions,
            current_redemptions: 0,
            target_products: fields.target_products,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the admin-editable fields. The redemption counter is never
    /// touched here; only the redemption path increments it.
    pub fn apply(&mut self, fields: OfferFields, now: DateTime<Utc>) {
        self.title = fields.title;
        self.description = fields.description;
        self.discount = fields.discount;
        self.discount_type = fields.discount_type;
        self.discount_value = fields.discount_value;
        self.valid_from = fields.valid_from;
        self.valid_until = fields.valid_until;
        self.category = fields.category;
        self.promo_code = fields.promo_code.into_inner();
        self.image = fields.image;
        self.is_active = fields.is_active;
        self.redemption_steps = fields.redemption_steps;
        self.product_details = fields.product_details;
        self.max_redemptions = fields.max_redemptions;
        self.target_products = fields.target_products;
        self.updated_at = now;
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// Inclusive on both ends.
    pub fn is_within_window(&self, now: DateTime<Utc>) -> bool {
        self.valid_from <= now && now <= self.valid_until
    }

    /// The one validity predicate used by redemption, listings and stats.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.is_within_window(now)
    }

    /// `None` means the offer is uncapped.
    pub fn remaining_redemptions(&self) -> Option<i32> {
        self.max_redemptions
            .map(|max| (max - self.current_redemptions).max(0))
    }

    pub fn has_capacity(&self) -> bool {
        match self.max_redemptions {
            Some(max) => self.current_redemptions < max,
            None => true,
        }
    }

    /// An empty target list applies to every product.
    pub fn applies_to(&self, product_id: Uuid) -> bool {
        self.target_products.is_empty() || self.target_products.contains(&product_id)
    }

    pub fn discount_terms(&self) -> DiscountTerms {
        DiscountTerms {
            promo_code: self.promo_code.clone(),
            title: self.title.clone(),
            discount: self.discount.clone(),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            product_details: self.product_details.clone(),
        }
    }

    pub fn public_view(&self) -> PublicOffer {
        PublicOffer {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            discount: self.discount.clone(),
            category: self.category.clone(),
            image: self.image.clone(),
            valid_until: self.valid_until,
            promo_code: self.promo_code.clone(),
            product_details: self.product_details.clone(),
        }
    }

    pub fn view_at(&self, now: DateTime<Utc>) -> OfferView {
        OfferView {
            is_expired: self.is_expired_at(now),
            is_valid_now: self.is_valid_at(now),
            remaining_redemptions: self.remaining_redemptions(),
            offer: self.clone(),
        }
    }
}

/// Offer resource as served to admins: the stored record plus the derived flags.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OfferView {
    #[serde(flatten)]
    pub offer: Offer,
    pub is_expired: bool,
    pub is_valid_now: bool,
    pub remaining_redemptions: Option<i32>,
}

/// What a shopper gets back after a successful redemption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiscountTerms {
    pub promo_code: String,
    pub title: String,
    pub discount: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub product_details: ProductDetails,
}

/// Customer-safe projection for the storefront; no counters, no targeting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicOffer {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub discount: String,
    pub category: String,
    pub image: Option<String>,
    pub valid_until: DateTime<Utc>,
    pub promo_code: String,
    pub product_details: ProductDetails,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::Duration;

    /// Active, in-window, uncapped, untargeted offer.
    pub fn offer(code: &str) -> Offer {
        let now = Utc::now();
        Offer {
            id: Uuid::new_v4(),
            title: "Screen repair deal".to_string(),
            description: "10% off any screen repair".to_string(),
            discount: "10% OFF".to_string(),
            discount_type: DiscountType::Percentage,
            discount_value: 10.0,
            valid_from: now - Duration::days(1),
            valid_until: now + Duration::days(1),
            category: "Repairs".to_string(),
            promo_code: code.to_string(),
            image: None,
            is_active: true,
            redemption_steps: vec!["Show code at the counter".to_string()],
            product_details: ProductDetails::default(),
            max_redemptions: None,
            current_redemptions: 0,
            target_products: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::offer;
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_window_is_inclusive() {
        let o = offer("EDGE");
        assert!(o.is_valid_at(o.valid_from));
        assert!(o.is_valid_at(o.valid_until));
        assert!(!o.is_valid_at(o.valid_until + Duration::milliseconds(1)));
        assert!(!o.is_valid_at(o.valid_from - Duration::milliseconds(1)));
    }

    #[test]
    fn test_inactive_offer_is_never_valid() {
        let mut o = offer("OFF");
        o.is_active = false;
        assert!(o.is_within_window(Utc::now()));
        assert!(!o.is_valid_at(Utc::now()));
    }

    #[test]
    fn test_expiry_only_after_valid_until() {
        let o = offer("EXP");
        assert!(!o.is_expired_at(o.valid_until));
        assert!(o.is_expired_at(o.valid_until + Duration::seconds(1)));
    }

    #[test]
    fn test_remaining_redemptions() {
        let mut o = offer("CAP");
        assert_eq!(o.remaining_redemptions(), None);
        assert!(o.has_capacity());

        o.max_redemptions = Some(3);
        o.current_redemptions = 2;
        assert_eq!(o.remaining_redemptions(), Some(1));
        assert!(o.has_capacity());

        o.current_redemptions = 3;
        assert_eq!(o.remaining_redemptions(), Some(0));
        assert!(!o.has_capacity());
    }

    #[test]
    fn test_view_serializes_camel_case_with_derived_flags() {
        let o = offer("SAVE10");
        let value = serde_json::to_value(o.view_at(Utc::now())).unwrap();

        assert_eq!(value["promoCode"], "SAVE10");
        assert_eq!(value["discountType"], "percentage");
        assert_eq!(value["isValidNow"], true);
        assert_eq!(value["isExpired"], false);
        assert!(value["remainingRedemptions"].is_null());
        assert_eq!(value["currentRedemptions"], 0);
    }

    #[test]
    fn test_public_view_hides_counters() {
        let mut o = offer("PUB");
        o.max_redemptions = Some(5);
        let value = serde_json::to_value(o.public_view()).unwrap();

        assert!(value.get("currentRedemptions").is_none());
        assert!(value.get("maxRedemptions").is_none());
        assert!(value.get("targetProducts").is_none());
        assert_eq!(value["promoCode"], "PUB");
    }

    #[test]
    fn test_discount_type_parse() {
        assert_eq!("Fixed".parse::<DiscountType>(), Ok(DiscountType::Fixed));
        assert_eq!(" percentage ".parse::<DiscountType>(), Ok(DiscountType::Percentage));
        assert!("bogo".parse::<DiscountType>().is_err());
    }
}
