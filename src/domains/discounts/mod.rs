pub mod catalog;
pub mod clock;
pub mod code_generator;
pub mod issuance_service;
pub mod memory_store;
pub mod models;
pub mod pg_store;
pub mod redemption_service;
pub mod store;

// Re-exports para facilitar imports
pub use catalog::{Catalog, InMemoryCatalog, PgCatalog};
pub use clock::{Clock, ManualClock, SystemClock};
pub use code_generator::{CodeGenerator, CODE_ALPHABET, CODE_LENGTH};
pub use issuance_service::{IssuanceService, DEFAULT_MAX_ATTEMPTS};
pub use memory_store::InMemoryCodeStore;
pub use models::*;
pub use pg_store::PgCodeStore;
pub use redemption_service::RedemptionService;
pub use store::{CodeStore, InsertOutcome, MarkUsedOutcome, StoreError};
