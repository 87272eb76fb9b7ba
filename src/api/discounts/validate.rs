// ============================================================================
// VALIDATE ENDPOINT - Canjear códigos de descuento
// ============================================================================

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use serde::Deserialize;
use shared::AppError;
use std::sync::Arc;
use tracing::info;

use crate::{
    domains::discounts::ValidateCodeResponse,
    middleware::CurrentUser,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ValidateRequest {
    #[serde(default)]
    pub code: Option<String>,
}

/// Redeem a discount code
///
/// # Endpoint
/// POST /api/discount-code/validate
///
/// # Request Body
/// ```json
/// { "code": "K7Q2ZP9A" }
/// ```
///
/// # Returns
/// - 200 OK: `{ valid, message, discountCode? }`. Unknown, expired and
///   already used codes are `valid: false` here, not errors.
/// - 400 Bad Request: missing code or malformed body
/// - 401 Unauthorized: invalid token
/// - 500 Internal Server Error: store failure
pub async fn validate_discount_code(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    payload: Result<Json<ValidateRequest>, JsonRejection>,
) -> Result<Json<ValidateCodeResponse>, AppError> {
    let Json(payload) = payload?;

    let code = payload
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::validation("Code is required"))?;

    let outcome = state.redemption_service.redeem(&code).await?;

    info!(
        "Validation of code {} by user_id={}: {}",
        code,
        current_user.user_id,
        outcome.as_str()
    );

    Ok(Json(ValidateCodeResponse::from(outcome)))
}
