pub mod discounts; // Single-use discount codes

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn create_api_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new().nest("/api/discount-code", discounts::router(state))
}
