//! Modelos del sistema de códigos de descuento

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::store::StoreError;

/// Validity window of every issued code.
pub const CODE_VALIDITY_HOURS: i64 = 24;

pub fn code_validity() -> Duration {
    Duration::hours(CODE_VALIDITY_HOURS)
}

// ======================================================================
// DISCOUNT CODES
// ======================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DiscountCode {
    pub id: Uuid,
    pub code: String,
    pub user_id: String,
    pub product_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
}

impl DiscountCode {
    /// Fresh, unused record. `expires_at` is derived here and never touched again.
    pub fn new(
        code: String,
        user_id: String,
        product_id: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            user_id,
            product_id,
            created_at,
            expires_at: created_at + code_validity(),
            is_used: false,
            used_at: None,
        }
    }

    /// A code stays redeemable up to and including `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn can_be_redeemed_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueRequest {
    pub user_id: Option<String>,
    pub product_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedCodeResponse {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&DiscountCode> for IssuedCodeResponse {
    fn from(record: &DiscountCode) -> Self {
        Self {
            code: record.code.clone(),
            expires_at: record.expires_at,
        }
    }
}

// ======================================================================
// REDEMPTION
// ======================================================================

pub const MSG_NOT_FOUND: &str = "Not a valid code";
pub const MSG_EXPIRED: &str = "Code has expired";
pub const MSG_ALREADY_USED: &str = "Code has already been used";
pub const MSG_SUCCESS: &str = "Successful";

/// Details handed back to whoever redeemed the code.
/// Display names are best effort and may be missing from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedCode {
    pub code: String,
    pub product_id: String,
    pub product_name: Option<String>,
    pub user_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    Valid(RedeemedCode),
    Expired,
    AlreadyUsed,
    NotFound,
}

impl RedemptionOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Valid(_) => MSG_SUCCESS,
            Self::Expired => MSG_EXPIRED,
            Self::AlreadyUsed => MSG_ALREADY_USED,
            Self::NotFound => MSG_NOT_FOUND,
        }
    }

    /// Label used for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid(_) => "redeemed",
            Self::Expired => "expired",
            Self::AlreadyUsed => "already_used",
            Self::NotFound => "not_found",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeResponse {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_code: Option<RedeemedCode>,
}

impl From<RedemptionOutcome> for ValidateCodeResponse {
    fn from(outcome: RedemptionOutcome) -> Self {
        let valid = outcome.is_valid();
        let message = outcome.message().to_string();
        let discount_code = match outcome {
            RedemptionOutcome::Valid(details) => Some(details),
            _ => None,
        };

        Self {
            valid,
            message,
            discount_code,
        }
    }
}

// ======================================================================
// ERRORS
// ======================================================================

#[derive(Debug, thiserror::Error)]
pub enum IssuanceError {
    #[error("Unauthorized")]
    Unauthenticated,

    #[error("Product ID is required")]
    MissingProductId,

    #[error("User not found")]
    UserNotFound,

    #[error("Product not found")]
    ProductNotFound,

    #[error("No unique discount code after {attempts} attempts")]
    ExhaustedRetries { attempts: u32 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
