//! Persistence contract for issued discount codes.
//!
//! Every mutation goes through a conditional operation: `insert_if_absent`
//! is the final arbiter of code uniqueness and `try_mark_used` is the only
//! way a code flips to used. Implementations must run each of them as a
//! single atomic step on the backing store, never as read-then-write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::models::DiscountCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("unexpected store state: {0}")]
    Inconsistent(String),
}

/// Result of a conditional insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// Another record already owns this code.
    Conflict,
}

/// Result of a conditional `used` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkUsedOutcome {
    /// This call flipped the flag.
    Transitioned,
    /// The flag did not hold the expected value (someone else redeemed it).
    AlreadyUsed,
    /// The record was past `expires_at` at the instant of the attempt.
    Expired,
    NotFound,
}

#[async_trait]
pub trait CodeStore: Send + Sync {
    /// Latency shortcut only; a `false` here guarantees nothing about a later insert.
    async fn exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Inserts `record` unless some record already has the same `code`.
    async fn insert_if_absent(&self, record: &DiscountCode) -> Result<InsertOutcome, StoreError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError>;

    /// Sets `is_used = true` (and stamps `used_at = now`) only if the record
    /// currently has `is_used == expected_used` and `expires_at >= now`.
    async fn try_mark_used(
        &self,
        id: Uuid,
        expected_used: bool,
        now: DateTime<Utc>,
    ) -> Result<MarkUsedOutcome, StoreError>;
}
