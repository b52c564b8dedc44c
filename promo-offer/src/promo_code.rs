use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAX_PROMO_CODE_LEN: usize = 20;

/// A promo code in canonical form: trimmed and upper-cased.
///
/// Codes are matched case-insensitively, so every lookup and every stored code
/// goes through [`PromoCode::parse`] first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromoCode(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoCodeError {
    #[error("promo code is required")]
    Empty,

    #[error("promo code must be at most {MAX_PROMO_CODE_LEN} characters")]
    TooLong,
}

impl PromoCode {
    pub fn parse(raw: &str) -> Result<Self, PromoCodeError> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Err(PromoCodeError::Empty);
        }
        if code.chars().count() > MAX_PROMO_CODE_LEN {
            return Err(PromoCodeError::TooLong);
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl TryFrom<String> for PromoCode {
    type Error = PromoCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PromoCode> for String {
    fn from(code: PromoCode) -> Self {
        code.0
    }
}

impl AsRef<str> for PromoCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
