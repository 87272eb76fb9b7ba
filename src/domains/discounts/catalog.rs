//! User and product lookups consumed by issuance and redemption.
//!
//! The catalog itself is owned elsewhere; this module only reads it.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use sqlx::PgPool;

use super::store::StoreError;

#[async_trait]
pub trait Catalog: Send + Sync {
    async fn user_exists(&self, user_id: &str) -> Result<bool, StoreError>;

    async fn product_exists(&self, product_id: &str) -> Result<bool, StoreError>;

    async fn user_name(&self, user_id: &str) -> Result<Option<String>, StoreError>;

    async fn product_name(&self, product_id: &str) -> Result<Option<String>, StoreError>;
}

// ======================================================================
// POSTGRES
// ======================================================================

#[derive(Clone)]
pub struct PgCatalog {
    db: PgPool,
}

impl PgCatalog {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn user_exists(&self, user_id: &str) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)"#)
            .bind(user_id)
            .fetch_one(&self.db)
            .await?;
        Ok(exists)
    }

    async fn product_exists(&self, product_id: &str) -> Result<bool, StoreError> {
        let exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)"#)
                .bind(product_id)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }

    async fn user_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let name: Option<Option<String>> =
            sqlx::query_scalar(r#"SELECT name FROM users WHERE id = $1"#)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        Ok(name.flatten())
    }

    async fn product_name(&self, product_id: &str) -> Result<Option<String>, StoreError> {
        let name: Option<String> = sqlx::query_scalar(r#"SELECT name FROM products WHERE id = $1"#)
            .bind(product_id)
            .fetch_optional(&self.db)
            .await?;
        Ok(name)
    }
}

// ======================================================================
// IN-MEMORY
// ======================================================================

/// Catalog held in memory, for tests and database-less runs.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    users: DashMap<String, Option<String>>,
    products: DashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFixture {
    #[serde(default)]
    users: Vec<FixtureUser>,
    #[serde(default)]
    products: Vec<FixtureProduct>,
}

#[derive(Debug, Deserialize)]
struct FixtureUser {
    id: String,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FixtureProduct {
    id: String,
    name: String,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `{ "users": [{ "id", "name" }], "products": [{ "id", "name" }] }`.
    pub fn from_fixture_json(raw: &str) -> Result<Self, serde_json::Error> {
        let fixture: CatalogFixture = serde_json::from_str(raw)?;
        let catalog = Self::new();
        for user in fixture.users {
            catalog.users.insert(user.id, user.name);
        }
        for product in fixture.products {
            catalog.products.insert(product.id, product.name);
        }
        Ok(catalog)
    }

    pub fn with_user(self, id: impl Into<String>, name: Option<&str>) -> Self {
        self.users.insert(id.into(), name.map(str::to_string));
        self
    }

    pub fn with_product(self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.products.insert(id.into(), name.into());
        self
    }

    pub fn remove_product(&self, id: &str) {
        self.products.remove(id);
    }
}

#[async_trait]
impl Catalog for InMemoryCatalog {
    async fn user_exists(&self, user_id: &str) -> Result<bool, StoreError> {
        Ok(self.users.contains_key(user_id))
    }

    async fn product_exists(&self, product_id: &str) -> Result<bool, StoreError> {
        Ok(self.products.contains_key(product_id))
    }

    async fn user_name(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.users.get(user_id).and_then(|entry| entry.value().clone()))
    }

    async fn product_name(&self, product_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.products.get(product_id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn loads_fixture_json() {
        let catalog = InMemoryCatalog::from_fixture_json(
            r#"{
                "users": [{ "id": "u1", "name": "Ada" }, { "id": "u2", "name": null }],
                "products": [{ "id": "p1", "name": "Espresso Machine" }]
            }"#,
        )
        .unwrap();

        assert!(catalog.user_exists("u1").await.unwrap());
        assert!(catalog.user_exists("u2").await.unwrap());
        assert_eq!(catalog.user_name("u2").await.unwrap(), None);
        assert_eq!(
            catalog.product_name("p1").await.unwrap().as_deref(),
            Some("Espresso Machine")
        );
        assert!(!catalog.product_exists("p2").await.unwrap());
    }

    #[test]
    fn rejects_malformed_fixture() {
        assert!(InMemoryCatalog::from_fixture_json(r#"{ "products": [{ "id": "p1" }] }"#).is_err());
    }
}
