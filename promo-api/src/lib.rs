use axum::{
    extract::DefaultBodyLimit,
    http::{header, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod offers;
pub mod state;

pub use error::AppError;
pub use state::{AppState, AuthConfig};

use middleware::admin_auth_middleware;

pub fn app(state: AppState, uploads_root: impl AsRef<Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::USER_AGENT]);

    let public = Router::new()
        .route("/offers", get(offers::list_offers))
        .route("/offers/public/active", get(offers::public_active_offers))
        .route("/offers/{id}", get(offers::get_offer))
        .route("/offers/redeem/{promo_code}", post(offers::redeem_offer));

    let admin = Router::new()
        .route("/offers", post(admin::create_offer))
        .route("/offers/stats", get(admin::offer_stats))
        .route("/offers/events", get(admin::offer_events))
        .route("/offers/{id}", put(admin::update_offer).delete(admin::delete_offer))
        .route("/offers/{id}/toggle-status", patch(admin::toggle_offer_status))
        .route_layer(from_fn_with_state(state.clone(), admin_auth_middleware))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    Router::new()
        .merge(public)
        .merge(admin)
        .nest_service("/uploads", ServeDir::new(uploads_root.as_ref()))
        .layer(from_fn_with_state(state.clone(), error::internal_error_detail))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
