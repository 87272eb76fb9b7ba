use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use super::catalog::Catalog;
use super::clock::Clock;
use super::code_generator::CodeGenerator;
use super::models::{DiscountCode, IssuanceError, IssueRequest};
use super::store::{CodeStore, InsertOutcome};
use crate::observability::metrics::{
    record_code_collision, record_code_issued, DISCOUNT_OPERATION_DURATION,
};

/// Attempts per issuance before giving up with `ExhaustedRetries`.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Servicio para emitir códigos de descuento
pub struct IssuanceService {
    store: Arc<dyn CodeStore>,
    catalog: Arc<dyn Catalog>,
    clock: Arc<dyn Clock>,
    generator: CodeGenerator,
    rng: Mutex<Box<dyn RngCore + Send>>,
    max_attempts: u32,
}

impl IssuanceService {
    pub fn new(store: Arc<dyn CodeStore>, catalog: Arc<dyn Catalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            catalog,
            clock,
            generator: CodeGenerator::new(),
            rng: Mutex::new(Box::new(StdRng::from_entropy())),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Replaces the random source, e.g. with a seeded RNG in tests.
    pub fn with_rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    fn next_candidate(&self) -> String {
        let mut rng = self.rng.lock();
        self.generator.generate(&mut *rng)
    }

    /// Emitir un nuevo código para (usuario, producto)
    pub async fn issue(&self, request: IssueRequest) -> Result<DiscountCode, IssuanceError> {
        let start_time = Instant::now();
        let result = self.issue_inner(request).await;

        record_code_issued(result.is_ok());
        DISCOUNT_OPERATION_DURATION
            .with_label_values(&["issue"])
            .observe(start_time.elapsed().as_secs_f64());

        result
    }

    async fn issue_inner(&self, request: IssueRequest) -> Result<DiscountCode, IssuanceError> {
        // 1. Validar entrada
        let user_id = request
            .user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(IssuanceError::Unauthenticated)?;
        let product_id = request
            .product_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(IssuanceError::MissingProductId)?;

        if !self.catalog.user_exists(&user_id).await? {
            return Err(IssuanceError::UserNotFound);
        }
        if !self.catalog.product_exists(&product_id).await? {
            return Err(IssuanceError::ProductNotFound);
        }

        // 2. Generar e insertar; el índice único decide en caso de carrera
        for attempt in 1..=self.max_attempts {
            let candidate = self.next_candidate();

            if self.store.exists(&candidate).await? {
                record_code_collision("precheck");
                warn!("Discount code candidate already taken (attempt {}), retrying", attempt);
                continue;
            }

            let record = DiscountCode::new(
                candidate,
                user_id.clone(),
                product_id.clone(),
                self.clock.now(),
            );

            match self.store.insert_if_absent(&record).await? {
                InsertOutcome::Inserted => {
                    info!(
                        "Issued discount code {} for user_id={} product_id={} expires_at={}",
                        record.code, record.user_id, record.product_id, record.expires_at
                    );
                    return Ok(record);
                }
                InsertOutcome::Conflict => {
                    record_code_collision("insert");
                    warn!(
                        "Unique violation inserting discount code (attempt {}). Retrying...",
                        attempt
                    );
                }
            }
        }

        warn!(
            "Gave up issuing a discount code for user_id={} after {} attempts",
            user_id, self.max_attempts
        );
        Err(IssuanceError::ExhaustedRetries {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::discounts::catalog::InMemoryCatalog;
    use crate::domains::discounts::clock::ManualClock;
    use crate::domains::discounts::memory_store::InMemoryCodeStore;
    use crate::domains::discounts::store::{MarkUsedOutcome, StoreError};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use uuid::Uuid;

    /// Store whose `exists` never sees anything, so every duplicate candidate
    /// is only caught by `insert_if_absent`.
    struct NoPrecheckStore(Arc<InMemoryCodeStore>);

    #[async_trait]
    impl CodeStore for NoPrecheckStore {
        async fn exists(&self, _code: &str) -> Result<bool, StoreError> {
            Ok(false)
        }

        async fn insert_if_absent(&self, record: &DiscountCode) -> Result<InsertOutcome, StoreError> {
            self.0.insert_if_absent(record).await
        }

        async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
            self.0.find_by_code(code).await
        }

        async fn try_mark_used(
            &self,
            id: Uuid,
            expected_used: bool,
            now: DateTime<Utc>,
        ) -> Result<MarkUsedOutcome, StoreError> {
            self.0.try_mark_used(id, expected_used, now).await
        }
    }

    fn service_without_precheck(inner: Arc<InMemoryCodeStore>, seed: u64) -> IssuanceService {
        IssuanceService::new(
            Arc::new(NoPrecheckStore(inner)),
            catalog(),
            Arc::new(ManualClock::default()),
        )
        .with_rng(StdRng::seed_from_u64(seed))
    }

    fn catalog() -> Arc<InMemoryCatalog> {
        Arc::new(
            InMemoryCatalog::new()
                .with_user("u1", Some("Ada"))
                .with_product("p1", "Espresso Machine"),
        )
    }

    fn service(store: Arc<InMemoryCodeStore>, seed: u64) -> IssuanceService {
        IssuanceService::new(store, catalog(), Arc::new(ManualClock::default()))
            .with_rng(StdRng::seed_from_u64(seed))
    }

    fn request(user: Option<&str>, product: Option<&str>) -> IssueRequest {
        IssueRequest {
            user_id: user.map(str::to_string),
            product_id: product.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn issues_unused_code_valid_for_24_hours() {
        let store = Arc::new(InMemoryCodeStore::new());
        let record = service(store.clone(), 1)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();

        assert_eq!(record.code.len(), 8);
        assert!(CodeGenerator::is_well_formed(&record.code));
        assert_eq!(record.expires_at - record.created_at, Duration::hours(24));
        assert!(!record.is_used);
        assert_eq!(record.user_id, "u1");
        assert_eq!(record.product_id, "p1");
        assert!(store.exists(&record.code).await.unwrap());
    }

    #[tokio::test]
    async fn rejects_missing_inputs_and_unknown_entities() {
        let store = Arc::new(InMemoryCodeStore::new());
        let svc = service(store.clone(), 2);

        assert!(matches!(
            svc.issue(request(None, Some("p1"))).await,
            Err(IssuanceError::Unauthenticated)
        ));
        assert!(matches!(
            svc.issue(request(Some(""), Some("p1"))).await,
            Err(IssuanceError::Unauthenticated)
        ));
        assert!(matches!(
            svc.issue(request(Some("u1"), None)).await,
            Err(IssuanceError::MissingProductId)
        ));
        assert!(matches!(
            svc.issue(request(Some("ghost"), Some("p1"))).await,
            Err(IssuanceError::UserNotFound)
        ));
        assert!(matches!(
            svc.issue(request(Some("u1"), Some("nope"))).await,
            Err(IssuanceError::ProductNotFound)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn retries_past_a_colliding_candidate() {
        let store = Arc::new(InMemoryCodeStore::new());

        // Same seed: the second service's first candidate equals the first code.
        let first = service(store.clone(), 99)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();
        let second = service(store.clone(), 99)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();

        assert_ne!(first.code, second.code);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let store = Arc::new(InMemoryCodeStore::new());
        service(store.clone(), 5)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();

        // One attempt with the same seed can only ever hit the taken code.
        let result = service(store.clone(), 5)
            .with_max_attempts(1)
            .issue(request(Some("u1"), Some("p1")))
            .await;

        assert!(matches!(result, Err(IssuanceError::ExhaustedRetries { attempts: 1 })));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn insert_conflict_triggers_retry() {
        let store = Arc::new(InMemoryCodeStore::new());

        let first = service_without_precheck(store.clone(), 99)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();
        // Same seed, blind pre-check: the first candidate loses at insert.
        let second = service_without_precheck(store.clone(), 99)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();

        assert_ne!(first.code, second.code);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn insert_conflicts_exhaust_attempts() {
        let store = Arc::new(InMemoryCodeStore::new());
        service_without_precheck(store.clone(), 5)
            .issue(request(Some("u1"), Some("p1")))
            .await
            .unwrap();

        let result = service_without_precheck(store.clone(), 5)
            .with_max_attempts(1)
            .issue(request(Some("u1"), Some("p1")))
            .await;

        assert!(matches!(result, Err(IssuanceError::ExhaustedRetries { attempts: 1 })));
        assert_eq!(store.len(), 1);
    }
}
