use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::catalog::Catalog;
use super::clock::Clock;
use super::models::{DiscountCode, RedeemedCode, RedemptionOutcome};
use super::store::{CodeStore, MarkUsedOutcome, StoreError};
use crate::observability::metrics::{record_redemption_outcome, DISCOUNT_OPERATION_DURATION};

/// Servicio para canjear códigos de descuento
///
/// Holds no locks of its own. The single-use guarantee comes entirely from
/// [`CodeStore::try_mark_used`]: of any number of concurrent calls for one
/// code, exactly one observes `Transitioned`.
pub struct RedemptionService {
    store: Arc<dyn CodeStore>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
}

impl RedemptionService {
    pub fn new(store: Arc<dyn CodeStore>, catalog: Arc<dyn Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            catalog,
            clock,
        }
    }

    /// Canjear un código
    ///
    /// Expected rejections (unknown, expired, already used) come back as
    /// `Ok` outcomes; only storage faults are errors. Expiry is checked
    /// before the used flag, so a code that is both reports `Expired`.
    pub async fn redeem(&self, code: &str) -> Result<RedemptionOutcome, StoreError> {
        let start_time = Instant::now();
        let result = self.redeem_inner(code).await;

        if let Ok(ref outcome) = result {
            record_redemption_outcome(outcome.as_str());
        }
        DISCOUNT_OPERATION_DURATION
            .with_label_values(&["redeem"])
            .observe(start_time.elapsed().as_secs_f64());

        result
    }

    async fn redeem_inner(&self, code: &str) -> Result<RedemptionOutcome, StoreError> {
        // 1. Buscar el código
        let Some(record) = self.store.find_by_code(code).await? else {
            info!("Redemption rejected: code {} not found", code);
            return Ok(RedemptionOutcome::NotFound);
        };

        // 2. Expiración primero
        let now = self.clock.now();
        if record.is_expired_at(now) {
            info!("Redemption rejected: code {} expired at {}", code, record.expires_at);
            return Ok(RedemptionOutcome::Expired);
        }

        // `is_used` never goes back to false, so a used read is final.
        if record.is_used {
            info!("Redemption rejected: code {} already used", code);
            return Ok(RedemptionOutcome::AlreadyUsed);
        }

        // 3. Transición atómica unused -> used
        let outcome = match self.store.try_mark_used(record.id, false, now).await? {
            MarkUsedOutcome::Transitioned => {
                info!(
                    "Redeemed discount code {} (user_id={} product_id={})",
                    record.code, record.user_id, record.product_id
                );
                RedemptionOutcome::Valid(self.describe(&record).await)
            }
            MarkUsedOutcome::AlreadyUsed => {
                info!("Redemption lost the race: code {} already used", code);
                RedemptionOutcome::AlreadyUsed
            }
            MarkUsedOutcome::Expired => {
                info!("Redemption rejected: code {} expired during attempt", code);
                RedemptionOutcome::Expired
            }
            MarkUsedOutcome::NotFound => {
                warn!("Discount code {} disappeared before it could be marked used", code);
                RedemptionOutcome::NotFound
            }
        };

        Ok(outcome)
    }

    /// Display names for a consumed code. The code is already spent at this
    /// point, so lookup failures degrade to `None` instead of failing the call.
    async fn describe(&self, record: &DiscountCode) -> RedeemedCode {
        let product_name = self
            .catalog
            .product_name(&record.product_id)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to resolve product name for {}: {}", record.product_id, e);
                None
            });
        let user_name = self
            .catalog
            .user_name(&record.user_id)
            .await
            .unwrap_or_else(|e| {
                warn!("Failed to resolve user name for {}: {}", record.user_id, e);
                None
            });

        RedeemedCode {
            code: record.code.clone(),
            product_id: record.product_id.clone(),
            product_name,
            user_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::discounts::catalog::InMemoryCatalog;
    use crate::domains::discounts::clock::ManualClock;
    use crate::domains::discounts::memory_store::InMemoryCodeStore;
    use crate::domains::discounts::store::InsertOutcome;
    use chrono::{Duration, Utc};

    struct Fixture {
        store: Arc<InMemoryCodeStore>,
        catalog: Arc<InMemoryCatalog>,
        clock: Arc<ManualClock>,
        service: RedemptionService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryCodeStore::new());
        let catalog = Arc::new(
            InMemoryCatalog::new()
                .with_user("u1", Some("Ada"))
                .with_product("p1", "Espresso Machine"),
        );
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let service = RedemptionService::new(store.clone(), catalog.clone(), clock.clone());
        Fixture {
            store,
            catalog,
            clock,
            service,
        }
    }

    async fn seed(f: &Fixture, code: &str) -> DiscountCode {
        let record = DiscountCode::new(code.into(), "u1".into(), "p1".into(), f.clock.now());
        assert_eq!(f.store.insert_if_absent(&record).await.unwrap(), InsertOutcome::Inserted);
        record
    }

    #[tokio::test]
    async fn first_redeem_wins_second_is_already_used() {
        let f = fixture();
        seed(&f, "WXYZ0001").await;

        let first = f.service.redeem("WXYZ0001").await.unwrap();
        assert_eq!(
            first,
            RedemptionOutcome::Valid(RedeemedCode {
                code: "WXYZ0001".into(),
                product_id: "p1".into(),
                product_name: Some("Espresso Machine".into()),
                user_name: Some("Ada".into()),
            })
        );

        let second = f.service.redeem("WXYZ0001").await.unwrap();
        assert_eq!(second, RedemptionOutcome::AlreadyUsed);
        assert_eq!(second.message(), "Code has already been used");
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let f = fixture();
        let outcome = f.service.redeem("NOPE0000").await.unwrap();
        assert_eq!(outcome, RedemptionOutcome::NotFound);
        assert_eq!(outcome.message(), "Not a valid code");
    }

    #[tokio::test]
    async fn expiry_takes_precedence_over_used() {
        let f = fixture();
        seed(&f, "WXYZ0002").await;
        assert!(f.service.redeem("WXYZ0002").await.unwrap().is_valid());

        f.clock.advance(Duration::hours(24) + Duration::seconds(1));
        assert_eq!(f.service.redeem("WXYZ0002").await.unwrap(), RedemptionOutcome::Expired);
    }

    #[tokio::test]
    async fn expired_unused_code_is_left_untouched() {
        let f = fixture();
        seed(&f, "WXYZ0003").await;

        f.clock.advance(Duration::hours(25));
        assert_eq!(f.service.redeem("WXYZ0003").await.unwrap(), RedemptionOutcome::Expired);

        let stored = f.store.find_by_code("WXYZ0003").await.unwrap().unwrap();
        assert!(!stored.is_used);
        assert!(stored.used_at.is_none());
    }

    #[tokio::test]
    async fn redeemable_exactly_at_expiry_instant() {
        let f = fixture();
        let record = seed(&f, "WXYZ0004").await;

        f.clock.set(record.expires_at);
        assert!(f.service.redeem("WXYZ0004").await.unwrap().is_valid());
    }

    #[tokio::test]
    async fn missing_catalog_entries_do_not_fail_redemption() {
        let f = fixture();
        seed(&f, "WXYZ0005").await;
        f.catalog.remove_product("p1");

        match f.service.redeem("WXYZ0005").await.unwrap() {
            RedemptionOutcome::Valid(details) => {
                assert_eq!(details.product_id, "p1");
                assert!(details.product_name.is_none());
                assert_eq!(details.user_name.as_deref(), Some("Ada"));
            }
            other => panic!("expected a valid redemption, got {:?}", other),
        }
    }
}
