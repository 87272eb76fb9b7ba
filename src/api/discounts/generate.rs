// ============================================================================
// GENERATE ENDPOINT - Emitir códigos de descuento
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
    domains::discounts::{IssueRequest, IssuedCodeResponse},
    middleware::CurrentUser,
    state::AppState,
};

/// Request body for issuing a discount code
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub product_id: Option<String>,
}

/// Issue a single-use discount code for the caller and a product
///
/// # Endpoint
/// POST /api/discount-code/generate
///
/// # Authentication
/// Requires valid JWT token
///
/// # Request Body
/// ```json
/// { "productId": "prod_123" }
/// ```
///
/// # Returns
/// - 200 OK: `{ "code": "K7Q2ZP9A", "expiresAt": "..." }`
/// - 400 Bad Request: missing productId or malformed body
/// - 401 Unauthorized: invalid token
/// - 404 Not Found: user or product does not exist
/// - 503 Service Unavailable: no unique code within the attempt bound
/// - 500 Internal Server Error: store failure
pub async fn generate_discount_code(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<IssuedCodeResponse>, AppError> {
    let Json(payload) = payload?;

    info!(
        "Generating discount code for user_id={} product_id={:?}",
        current_user.user_id, payload.product_id
    );

    let record = state
        .issuance_service
        .issue(IssueRequest {
            user_id: Some(current_user.user_id),
            product_id: payload.product_id,
        })
        .await?;

    Ok(Json(IssuedCodeResponse::from(&record)))
}
