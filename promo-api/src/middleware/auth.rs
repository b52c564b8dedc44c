use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminClaims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: usize,
}

impl AdminClaims {
    pub fn is_admin(&self) -> bool {
        self.role.eq_ignore_ascii_case(ADMIN_ROLE)
    }
}

pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let token_data = decode::<AdminClaims>(
        token,
        &DecodingKey::from_secret(state.auth.secret.expose().as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("rejected admin token: {}", e);
        AppError::Unauthorized
    })?;

    if !token_data.claims.is_admin() {
        tracing::warn!(
            sub = %token_data.claims.sub,
            role = %token_data.claims.role,
            "non-admin on admin route"
        );
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(token_data.claims);
    Ok(next.run(req).await)
}
