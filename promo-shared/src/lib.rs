pub mod models;
pub mod pii;

pub use models::events::OfferEvent;
pub use pii::Masked;
