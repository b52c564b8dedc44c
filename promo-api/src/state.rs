use promo_core::{
    ImageStore, OfferAdminService, OfferCatalog, OfferNotifier, OfferRepository, RedemptionService,
};
use promo_shared::Masked;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    /// HS256 signing key shared with the identity service.
    pub secret: Masked<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: OfferCatalog,
    pub admin: OfferAdminService,
    pub redemption: RedemptionService,
    pub notifier: OfferNotifier,
    pub auth: AuthConfig,
    /// Attach internal error detail to 500 responses (development only).
    pub expose_internal_errors: bool,
    /// Upper bound for multipart admin requests, image included.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        repo: Arc<dyn OfferRepository>,
        images: Arc<dyn ImageStore>,
        notifier: OfferNotifier,
        auth: AuthConfig,
        max_image_bytes: usize,
    ) -> Self {
        Self {
            catalog: OfferCatalog::new(repo.clone()),
            admin: OfferAdminService::new(repo.clone(), images, notifier.clone()),
            redemption: RedemptionService::new(repo, notifier.clone()),
            notifier,
            auth,
            expose_internal_errors: false,
            // Text fields and multipart framing on top of the image itself.
            max_upload_bytes: max_image_bytes.saturating_add(1024 * 1024),
        }
    }

    pub fn with_internal_errors_exposed(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }
}
