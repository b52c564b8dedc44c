//! `multipart/form-data` decoding for the admin create/update endpoints.
//!
//! Every part arrives as text; typed fields are parsed here and parse
//! problems are collected into one [`ValidationErrors`]. Empty text parts
//! count as "not supplied".

use axum::extract::Multipart;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use promo_core::ImageUpload;
use promo_offer::{DiscountType, OfferInput, ProductDetails, ValidationErrors};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Default)]
pub struct OfferForm {
    pub input: OfferInput,
    pub image: Option<ImageUpload>,
    errors: ValidationErrors,
}

impl OfferForm {
    /// Reads every part. Unparseable values are recorded, not returned, so
    /// that [`OfferForm::for_create`] can report them alongside domain rules.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = OfferForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation("body", format!("Malformed multipart body: {}", e)))?
        {
            let name = field.name().unwrap_or_default().to_string();

            if name == "image" {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| {
                        AppError::validation("image", format!("Failed to read image: {}", e))
                    })?;
                // Browsers send an empty part when no file was picked.
                if !bytes.is_empty() {
                    form.image = Some(ImageUpload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                continue;
            }

            let text = field
                .text()
                .await
                .map_err(|e| AppError::validation(&name, format!("Failed to read field: {}", e)))?;
            form.set(&name, text.trim());
        }

        Ok(form)
    }

    /// Input for a new offer. When some parts failed to parse, the fields that
    /// did parse are still run through the create rules so the client gets
    /// every problem in one response.
    pub fn for_create(self) -> Result<(OfferInput, Option<ImageUpload>), AppError> {
        if self.errors.is_empty() {
            return Ok((self.input, self.image));
        }

        let mut errors = self.errors;
        if let Err(domain) = self.input.clone().into_new() {
            for e in domain.fields() {
                if !errors.has(&e.field) {
                    errors.add(&e.field, e.message.clone());
                }
            }
        }
        Err(AppError::Validation(errors))
    }

    pub fn for_update(self) -> Result<(OfferInput, Option<ImageUpload>), AppError> {
        self.errors.check().map_err(AppError::Validation)?;
        Ok((self.input, self.image))
    }

    fn set(&mut self, name: &str, value: &str) {
        let input = &mut self.input;
        let errors = &mut self.errors;

        // An explicit blank clears the cap; every other blank is "not supplied".
        if name == "maxRedemptions" {
            input.max_redemptions = match value {
                "" | "null" => Some(None),
                raw => parse_with(errors, name, raw, |v| v.parse::<i32>().ok()).map(Some),
            };
            return;
        }
        if value.is_empty() {
            return;
        }

        match name {
            "title" => input.title = Some(value.to_string()),
            "description" => input.description = Some(value.to_string()),
            "discount" => input.discount = Some(value.to_string()),
            "category" => input.category = Some(value.to_string()),
            "promoCode" => input.promo_code = Some(value.to_string()),
            "discountType" => {
                input.discount_type =
                    parse_with(errors, name, value, |v| v.parse::<DiscountType>().ok())
            }
            "discountValue" => {
                input.discount_value = parse_with(errors, name, value, |v| v.parse::<f64>().ok())
            }
            "validFrom" => input.valid_from = parse_with(errors, name, value, parse_timestamp),
            "validUntil" => input.valid_until = parse_with(errors, name, value, parse_timestamp),
            "isActive" => input.is_active = parse_with(errors, name, value, parse_flag),
            "redemptionSteps" => {
                input.redemption_steps = parse_json::<Vec<String>>(errors, name, value)
            }
            "productDetails" => {
                input.product_details = parse_json::<ProductDetails>(errors, name, value)
            }
            "targetProducts" => {
                input.target_products = parse_json::<Vec<Uuid>>(errors, name, value)
            }
            other => tracing::debug!(field = other, "ignoring unknown form field"),
        }
    }
}

fn parse_with<T>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let parsed = parse(raw);
    if parsed.is_none() {
        errors.add(field, format!("Invalid value for {}: {}", field, raw));
    }
    parsed
}

fn parse_json<T: DeserializeOwned>(
    errors: &mut ValidationErrors,
    field: &str,
    raw: &str,
) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(field, format!("Invalid JSON in {}: {}", field, e));
            None
        }
    }
}

/// RFC 3339, `datetime-local` style (`2025-01-31T10:00`, UTC assumed) or a
/// bare date (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Some(true),
        "false" | "0" | "off" | "no" => Some(false),
        _ => None,
    }
}
