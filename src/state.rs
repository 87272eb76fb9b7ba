use crate::db::{create_db_pool, run_migrations, DatabaseConfig};
use crate::domains::discounts::{
    Catalog, Clock, CodeStore, InMemoryCatalog, InMemoryCodeStore, IssuanceService,
    PgCatalog, PgCodeStore, RedemptionService, SystemClock,
};
use shared::{Config, StoreBackend};
use sqlx::PgPool;
use std::sync::Arc;

/// Estado compartido de la aplicación.
#[derive(Clone)]
pub struct AppState {
    /// Present only with the PostgreSQL backend; used by health checks.
    pub db_pool: Option<PgPool>,
    pub jwt_secret: Arc<str>,
    pub issuance_service: Arc<IssuanceService>,
    pub redemption_service: Arc<RedemptionService>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let (store, catalog, db_pool): (Arc<dyn CodeStore>, Arc<dyn Catalog>, Option<PgPool>) =
            match config.discounts.store_backend {
                StoreBackend::Postgres => {
                    let db_config = DatabaseConfig::from_settings(&config.database);
                    let db_pool = create_db_pool(&config.database.url, db_config)
                        .await
                        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

                    if config.database.run_migrations {
                        run_migrations(&db_pool).await?;
                    }

                    (
                        Arc::new(PgCodeStore::new(db_pool.clone())),
                        Arc::new(PgCatalog::new(db_pool.clone())),
                        Some(db_pool),
                    )
                }
                StoreBackend::Memory => {
                    tracing::warn!("⚠️ Using in-memory discount code store; codes are lost on restart");

                    let catalog = match &config.discounts.catalog_fixture {
                        Some(path) => {
                            let raw = std::fs::read_to_string(path).map_err(|e| {
                                anyhow::anyhow!("Failed to read catalog fixture {}: {}", path, e)
                            })?;
                            InMemoryCatalog::from_fixture_json(&raw)?
                        }
                        None => InMemoryCatalog::new(),
                    };

                    (Arc::new(InMemoryCodeStore::new()), Arc::new(catalog), None)
                }
            };

        Ok(Self::from_parts(
            &config.auth.jwt_secret,
            store,
            catalog,
            Arc::new(SystemClock),
            config.discounts.max_issue_attempts,
            db_pool,
        ))
    }

    /// Wires both services over the same store, catalog and clock.
    pub fn from_parts(
        jwt_secret: &str,
        store: Arc<dyn CodeStore>,
        catalog: Arc<dyn Catalog>,
        clock: Arc<dyn Clock>,
        max_issue_attempts: u32,
        db_pool: Option<PgPool>,
    ) -> Self {
        let issuance_service = IssuanceService::new(store.clone(), catalog.clone(), clock.clone())
            .with_max_attempts(max_issue_attempts);
        let redemption_service = RedemptionService::new(store, catalog, clock);

        Self {
            db_pool,
            jwt_secret: Arc::from(jwt_secret),
            issuance_service: Arc::new(issuance_service),
            redemption_service: Arc::new(redemption_service),
        }
    }
}
