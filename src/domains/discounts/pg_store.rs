use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::models::DiscountCode;
use super::store::{CodeStore, InsertOutcome, MarkUsedOutcome, StoreError};

/// PostgreSQL-backed code store.
///
/// Relies on the `discount_codes_code_key` unique index for uniqueness and on
/// row-level locking of a single conditional `UPDATE` for the used transition.
#[derive(Clone)]
pub struct PgCodeStore {
    db: PgPool,
}

impl PgCodeStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// `target` shares the statement snapshot with the UPDATE, so a row deleted
    /// while the UPDATE waited on its lock still shows up there. A fresh
    /// statement tells a concurrent delete apart from a concurrent redeem.
    async fn classify_lost_update(&self, id: Uuid) -> Result<MarkUsedOutcome, StoreError> {
        let current: Option<bool> =
            sqlx::query_scalar(r#"SELECT is_used FROM discount_codes WHERE id = $1"#)
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        Ok(match current {
            None => MarkUsedOutcome::NotFound,
            Some(_) => MarkUsedOutcome::AlreadyUsed,
        })
    }
}

// Struct auxiliar para el resultado del UPDATE condicional
#[derive(sqlx::FromRow)]
struct MarkUsedRow {
    transitioned: bool,
    expires_at: Option<DateTime<Utc>>,
}

#[async_trait]
impl CodeStore for PgCodeStore {
    async fn exists(&self, code: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            r#"SELECT EXISTS(SELECT 1 FROM discount_codes WHERE code = $1)"#,
        )
        .bind(code)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn insert_if_absent(&self, record: &DiscountCode) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO discount_codes (
                id, code, user_id, product_id, created_at, expires_at, is_used, used_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, NULL)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(record.id)
        .bind(&record.code)
        .bind(&record.user_id)
        .bind(&record.product_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            Ok(InsertOutcome::Conflict)
        } else {
            Ok(InsertOutcome::Inserted)
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        let record = sqlx::query_as::<_, DiscountCode>(
            r#"
            SELECT id, code, user_id, product_id, created_at, expires_at, is_used, used_at
            FROM discount_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.db)
        .await?;

        Ok(record)
    }

    async fn try_mark_used(
        &self,
        id: Uuid,
        expected_used: bool,
        now: DateTime<Utc>,
    ) -> Result<MarkUsedOutcome, StoreError> {
        // One statement: the UPDATE takes the row lock and re-checks its WHERE
        // clause against the latest committed version, so concurrent callers
        // see exactly one winner. The `target` CTE only reads the immutable
        // expires_at to classify a miss.
        let row = sqlx::query_as::<_, MarkUsedRow>(
            r#"
            WITH target AS (
                SELECT expires_at FROM discount_codes WHERE id = $1
            ),
            updated AS (
                UPDATE discount_codes
                SET is_used = TRUE,
                    used_at = $3
                WHERE id = $1
                  AND is_used = $2
                  AND expires_at >= $3
                RETURNING id
            )
            SELECT
                EXISTS(SELECT 1 FROM updated) AS transitioned,
                (SELECT expires_at FROM target) AS expires_at
            "#,
        )
        .bind(id)
        .bind(expected_used)
        .bind(now)
        .fetch_one(&self.db)
        .await?;

        let outcome = match (row.transitioned, row.expires_at) {
            (true, _) => MarkUsedOutcome::Transitioned,
            (false, None) => MarkUsedOutcome::NotFound,
            (false, Some(expires_at)) if now > expires_at => MarkUsedOutcome::Expired,
            (false, Some(_)) => self.classify_lost_update(id).await?,
        };

        Ok(outcome)
    }
}
