use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification relayed to admin dashboards whenever an offer changes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferEvent {
    #[serde(rename_all = "camelCase")]
    Created {
        offer_id: Uuid,
        promo_code: String,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Updated {
        offer_id: Uuid,
        promo_code: String,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        offer_id: Uuid,
        is_active: bool,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Deleted {
        offer_id: Uuid,
        promo_code: String,
        at: DateTime<Utc>,
    },
    #[serde(rename_all = "camelCase")]
    Redeemed {
        offer_id: Uuid,
        promo_code: String,
        product_id: Option<Uuid>,
        current_redemptions: i32,
        at: DateTime<Utc>,
    },
}

impl OfferEvent {
    pub fn offer_id(&self) -> Uuid {
        match self {
            OfferEvent::Created { offer_id, .. }
            | OfferEvent::Updated { offer_id, .. }
            | OfferEvent::StatusChanged { offer_id, .. }
            | OfferEvent::Deleted { offer_id, .. }
            | OfferEvent::Redeemed { offer_id, .. } => *offer_id,
        }
    }

    /// SSE event name
    pub fn kind(&self) -> &'static str {
        match self {
            OfferEvent::Created { .. } => "offer_created",
            OfferEvent::Updated { .. } => "offer_updated",
            OfferEvent::StatusChanged { .. } => "offer_status_changed",
            OfferEvent::Deleted { .. } => "offer_deleted",
            OfferEvent::Redeemed { .. } => "offer_redeemed",
        }
    }
}
