//! Admin-side input validation.
//!
//! Form parsing happens at the HTTP boundary and produces an [`OfferInput`]
//! with typed but optional fields. This module turns it into a complete,
//! validated [`OfferFields`], either for a brand new offer (required fields
//! enforced) or merged on top of an existing one (partial update).

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::models::{DiscountType, Offer, ProductDetails};
use crate::promo_code::PromoCode;

pub const TITLE_MAX_LEN: usize = 100;
pub const DESCRIPTION_MAX_LEN: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every problem found in one request, reported together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn check(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<&str> = self.0.iter().map(|e| e.message.as_str()).collect();
        write!(f, "Validation error: {}", messages.join(", "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Typed admin input; `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OfferInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub discount: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub promo_code: Option<String>,
    pub is_active: Option<bool>,
    /// `Some(None)` removes the cap.
    pub max_redemptions: Option<Option<i32>>,
    pub redemption_steps: Option<Vec<String>>,
    pub product_details: Option<ProductDetails>,
    pub target_products: Option<Vec<Uuid>>,
}

/// The complete set of admin-editable fields, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferFields {
    pub title: String,
    pub description: String,
    pub discount: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub category: String,
    pub promo_code: PromoCode,
    pub is_active: bool,
    pub max_redemptions: Option<i32>,
    pub redemption_steps: Vec<String>,
    pub product_details: ProductDetails,
    pub target_products: Vec<Uuid>,
    pub image: Option<String>,
}

impl OfferInput {
    /// Validate a create request.
    pub fn into_new(self) -> Result<OfferFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = required_text(&mut errors, "title", self.title, Some(TITLE_MAX_LEN));
        let description = required_text(
            &mut errors,
            "description",
            self.description,
            Some(DESCRIPTION_MAX_LEN),
        );
        let discount = required_text(&mut errors, "discount", self.discount, None);
        let category = required_text(&mut errors, "category", self.category, None);
        let promo_code = match self.promo_code {
            Some(raw) => promo_code(&mut errors, &raw),
            None => {
                errors.add("promoCode", "promoCode is required");
                None
            }
        };
        let valid_from = required(&mut errors, "validFrom", self.valid_from);
        let valid_until = required(&mut errors, "validUntil", self.valid_until);

        let (
            Some(title),
            Some(description),
            Some(discount),
            Some(category),
            Some(promo_code),
            Some(valid_from),
            Some(valid_until),
        ) = (
            title,
            description,
            discount,
            category,
            promo_code,
            valid_from,
            valid_until,
        )
        else {
            return Err(errors);
        };

        let fields = OfferFields {
            title,
            description,
            discount,
            discount_type: self.discount_type.unwrap_or_default(),
            discount_value: self.discount_value.unwrap_or(0.0),
            valid_from,
            valid_until,
            category,
            promo_code,
            // Omitted flag means active, same as the column default.
            is_active: self.is_active.unwrap_or(true),
            max_redemptions: self.max_redemptions.flatten(),
            redemption_steps: clean_steps(self.redemption_steps.unwrap_or_default()),
            product_details: clean_details(self.product_details.unwrap_or_default()),
            target_products: dedup(self.target_products.unwrap_or_default()),
            image: None,
        };

        fields.validate(&mut errors);
        errors.check()?;
        Ok(fields)
    }

    /// Validate an update request against the offer it modifies. The merged
    /// result must satisfy every invariant a freshly created offer does.
    pub fn merge_onto(self, existing: &Offer) -> Result<OfferFields, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let title = optional_text(
            &mut errors,
            "title",
            self.title,
            &existing.title,
            Some(TITLE_MAX_LEN),
        );
        let description = optional_text(
            &mut errors,
            "description",
            self.description,
            &existing.description,
            Some(DESCRIPTION_MAX_LEN),
        );
        let discount = optional_text(
            &mut errors,
            "discount",
            self.discount,
            &existing.discount,
            None,
        );
        let category = optional_text(
            &mut errors,
            "category",
            self.category,
            &existing.category,
            None,
        );
        let code = match self.promo_code {
            Some(raw) => promo_code(&mut errors, &raw),
            None => promo_code(&mut errors, &existing.promo_code),
        };
        let Some(code) = code else {
            return Err(errors);
        };

        let fields = OfferFields {
            title,
            description,
            discount,
            discount_type: self.discount_type.unwrap_or(existing.discount_type),
            discount_value: self.discount_value.unwrap_or(existing.discount_value),
            valid_from: self.valid_from.unwrap_or(existing.valid_from),
            valid_until: self.valid_until.unwrap_or(existing.valid_until),
            category,
            promo_code: code,
            is_active: self.is_active.unwrap_or(existing.is_active),
            max_redemptions: self.max_redemptions.unwrap_or(existing.max_redemptions),
            redemption_steps: match self.redemption_steps {
                Some(steps) => clean_steps(steps),
                None => existing.redemption_steps.clone(),
            },
            product_details: match self.product_details {
                Some(details) => clean_details(details),
                None => existing.product_details.clone(),
            },
            target_products: match self.target_products {
                Some(targets) => dedup(targets),
                None => existing.target_products.clone(),
            },
            image: existing.image.clone(),
        };

        fields.validate(&mut errors);
        if let Some(max) = fields.max_redemptions {
            if max < existing.current_redemptions {
                errors.add(
                    "maxRedemptions",
                    format!(
                        "maxRedemptions cannot be lower than current redemptions ({})",
                        existing.current_redemptions
                    ),
                );
            }
        }
        errors.check()?;
        Ok(fields)
    }
}

impl OfferFields {
    /// Cross-field and range rules shared by create and update.
    fn validate(&self, errors: &mut ValidationErrors) {
        if self.valid_from >= self.valid_until {
            errors.add("validUntil", "Valid Until date must be after Valid From date");
        }

        if !self.discount_value.is_finite() || self.discount_value < 0.0 {
            errors.add("discountValue", "discountValue must be a non-negative number");
        } else if self.discount_type == DiscountType::Percentage && self.discount_value > 100.0 {
            errors.add("discountValue", "a percentage discount cannot exceed 100");
        }

        if let Some(max) = self.max_redemptions {
            if max < 1 {
                errors.add("maxRedemptions", "maxRedemptions must be at least 1");
            }
        }

        let prices = [
            ("productDetails.price", self.product_details.price),
            ("productDetails.discountedPrice", self.product_details.discounted_price),
            ("productDetails.originalPrice", self.product_details.original_price),
        ];
        for (field, price) in prices {
            if let Some(price) = price {
                if !price.is_finite() || price < 0.0 {
                    errors.add(field, format!("{} must be a non-negative number", field));
                }
            }
        }
    }
}

fn required<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, format!("{} is required", field));
    }
    value
}

fn required_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max_len: Option<usize>,
) -> Option<String> {
    match value {
        Some(raw) => checked_text(errors, field, &raw, max_len),
        None => {
            errors.add(field, format!("{} is required", field));
            None
        }
    }
}

fn optional_text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    current: &str,
    max_len: Option<usize>,
) -> String {
    match value {
        Some(raw) => {
            checked_text(errors, field, &raw, max_len).unwrap_or_else(|| current.to_string())
        }
        None => current.to_string(),
    }
}

fn checked_text(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
    max_len: Option<usize>,
) -> Option<String> {
    let text = raw.trim();
    if text.is_empty() {
        errors.add(field, format!("{} is required", field));
        return None;
    }
    if let Some(max) = max_len {
        if text.chars().count() > max {
            errors.add(field, format!("{} must be at most {} characters", field, max));
            return None;
        }
    }
    Some(text.to_string())
}

fn promo_code(errors: &mut ValidationErrors, raw: &str) -> Option<PromoCode> {
    match PromoCode::parse(raw) {
        Ok(code) => Some(code),
        Err(e) => {
            errors.add("promoCode", e.to_string());
            None
        }
    }
}

fn clean_steps(steps: Vec<String>) -> Vec<String> {
    steps
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn clean_details(details: ProductDetails) -> ProductDetails {
    let trimmed = |s: Option<String>| {
        s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };
    ProductDetails {
        name: trimmed(details.name),
        specs: trimmed(details.specs),
        ..details
    }
}

fn dedup(ids: Vec<Uuid>) -> Vec<Uuid> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(&id) {
            out.push(id);
        }
    }
    out
}
