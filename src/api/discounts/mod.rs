// ============================================================================
// DISCOUNT CODE API MODULE
// ============================================================================

pub mod generate;
pub mod validate;

use axum::{middleware::from_fn_with_state, routing::post, Router};
use shared::AppError;
use std::sync::Arc;
use tracing::error;

use crate::domains::discounts::{IssuanceError, StoreError};
use crate::middleware::extract_current_user;
use crate::state::AppState;

/// Discount code routes. Both require a bearer token.
pub fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/generate", post(generate::generate_discount_code))
        .route("/validate", post(validate::validate_discount_code))
        .layer(from_fn_with_state(state, extract_current_user))
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

// Store failures keep their detail in the log only; clients get the opaque
// internal error kind.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        error!("Discount code store failure: {}", err);
        AppError::internal(err.to_string())
    }
}

impl From<IssuanceError> for AppError {
    fn from(err: IssuanceError) -> Self {
        match err {
            IssuanceError::Unauthenticated => AppError::authentication("Unauthorized"),
            IssuanceError::MissingProductId => AppError::validation("Product ID is required"),
            IssuanceError::UserNotFound => AppError::not_found("User"),
            IssuanceError::ProductNotFound => AppError::not_found("Product"),
            IssuanceError::ExhaustedRetries { attempts } => AppError::exhausted_retries(attempts),
            IssuanceError::Store(e) => e.into(),
        }
    }
}
