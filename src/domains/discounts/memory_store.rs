use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::models::DiscountCode;
use super::store::{CodeStore, InsertOutcome, MarkUsedOutcome, StoreError};

/// In-process code store.
///
/// Records are keyed by code; each conditional operation runs while holding
/// the shard lock of that single entry, which gives the same one-winner
/// behaviour as a row-level conditional update.
#[derive(Debug, Default)]
pub struct InMemoryCodeStore {
    by_code: DashMap<String, DiscountCode>,
    code_by_id: DashMap<Uuid, String>,
}

impl InMemoryCodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    /// Removes a record, as an external retention job would.
    pub fn remove(&self, code: &str) -> Option<DiscountCode> {
        let (_, record) = self.by_code.remove(code)?;
        self.code_by_id.remove(&record.id);
        Some(record)
    }
}

#[async_trait]
impl CodeStore for InMemoryCodeStore {
    async fn exists(&self, code: &str) -> Result<bool, StoreError> {
        Ok(self.by_code.contains_key(code))
    }

    async fn insert_if_absent(&self, record: &DiscountCode) -> Result<InsertOutcome, StoreError> {
        match self.by_code.entry(record.code.clone()) {
            Entry::Occupied(_) => Ok(InsertOutcome::Conflict),
            Entry::Vacant(slot) => {
                self.code_by_id.insert(record.id, record.code.clone());
                slot.insert(record.clone());
                Ok(InsertOutcome::Inserted)
            }
        }
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, StoreError> {
        Ok(self.by_code.get(code).map(|entry| entry.value().clone()))
    }

    async fn try_mark_used(
        &self,
        id: Uuid,
        expected_used: bool,
        now: DateTime<Utc>,
    ) -> Result<MarkUsedOutcome, StoreError> {
        let code = match self.code_by_id.get(&id) {
            Some(entry) => entry.value().clone(),
            None => return Ok(MarkUsedOutcome::NotFound),
        };

        let Some(mut record) = self.by_code.get_mut(&code) else {
            return Ok(MarkUsedOutcome::NotFound);
        };

        if record.id != id {
            return Err(StoreError::Inconsistent(format!(
                "code {} indexed under id {} but stored with id {}",
                code, id, record.id
            )));
        }
        if record.is_expired_at(now) {
            return Ok(MarkUsedOutcome::Expired);
        }
        if record.is_used != expected_used {
            return Ok(MarkUsedOutcome::AlreadyUsed);
        }

        record.is_used = true;
        record.used_at = Some(now);
        Ok(MarkUsedOutcome::Transitioned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    fn record(code: &str, now: DateTime<Utc>) -> DiscountCode {
        DiscountCode::new(code.to_string(), "u1".into(), "p1".into(), now)
    }

    #[tokio::test]
    async fn insert_if_absent_rejects_duplicate_code() {
        let store = InMemoryCodeStore::new();
        let now = Utc::now();

        let first = record("AAAA1111", now);
        let second = record("AAAA1111", now);

        assert_eq!(store.insert_if_absent(&first).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(store.insert_if_absent(&second).await.unwrap(), InsertOutcome::Conflict);
        assert_eq!(store.len(), 1);

        let stored = store.find_by_code("AAAA1111").await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
        assert!(store.exists("AAAA1111").await.unwrap());
        assert!(!store.exists("BBBB2222").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_inserts_of_one_code_have_one_winner() {
        let store = Arc::new(InMemoryCodeStore::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                let rec = record("SAME0000", now);
                tokio::spawn(async move { store.insert_if_absent(&rec).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap() == InsertOutcome::Inserted {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn try_mark_used_transitions_once() {
        let store = InMemoryCodeStore::new();
        let now = Utc::now();
        let rec = record("CCCC3333", now);
        store.insert_if_absent(&rec).await.unwrap();

        assert_eq!(
            store.try_mark_used(rec.id, false, now).await.unwrap(),
            MarkUsedOutcome::Transitioned
        );
        assert_eq!(
            store.try_mark_used(rec.id, false, now).await.unwrap(),
            MarkUsedOutcome::AlreadyUsed
        );

        let stored = store.find_by_code("CCCC3333").await.unwrap().unwrap();
        assert!(stored.is_used);
        assert_eq!(stored.used_at, Some(now));
    }

    #[tokio::test]
    async fn try_mark_used_refuses_expired_record() {
        let store = InMemoryCodeStore::new();
        let now = Utc::now();
        let rec = record("DDDD4444", now);
        store.insert_if_absent(&rec).await.unwrap();

        let later = now + Duration::hours(24) + Duration::seconds(1);
        assert_eq!(
            store.try_mark_used(rec.id, false, later).await.unwrap(),
            MarkUsedOutcome::Expired
        );
        assert!(!store.find_by_code("DDDD4444").await.unwrap().unwrap().is_used);
    }

    #[tokio::test]
    async fn try_mark_used_unknown_or_removed_id() {
        let store = InMemoryCodeStore::new();
        let now = Utc::now();
        assert_eq!(
            store.try_mark_used(Uuid::new_v4(), false, now).await.unwrap(),
            MarkUsedOutcome::NotFound
        );

        let rec = record("EEEE5555", now);
        store.insert_if_absent(&rec).await.unwrap();
        store.remove("EEEE5555");
        assert_eq!(
            store.try_mark_used(rec.id, false, now).await.unwrap(),
            MarkUsedOutcome::NotFound
        );
    }
}
