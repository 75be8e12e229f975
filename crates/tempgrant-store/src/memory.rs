//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempgrant_core::{
    ExecutionLogEntry, GrantRequest, LogId, NewGrantRequest, NewLogEntry, RequestId, RequestStatus,
};

use crate::error::{Result, StoreError};
use crate::traits::{Store, UpdateResult};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Requests indexed by id.
    requests: BTreeMap<RequestId, GrantRequest>,

    /// Log entries in insertion order.
    log: Vec<ExecutionLogEntry>,

    next_request_id: i64,
    next_log_id: i64,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                next_request_id: 1,
                next_log_id: 1,
                ..Default::default()
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_request(&self, request: &NewGrantRequest) -> Result<RequestId> {
        let mut inner = self.write()?;

        let id = RequestId::new(inner.next_request_id);
        inner.next_request_id += 1;
        inner
            .requests
            .insert(id, request.clone().into_request(id));

        Ok(id)
    }

    async fn get_request(&self, id: RequestId) -> Result<Option<GrantRequest>> {
        let inner = self.read()?;
        Ok(inner.requests.get(&id).cloned())
    }

    async fn update_end_time(
        &self,
        id: RequestId,
        end_ts_utc: DateTime<Utc>,
    ) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        match inner.requests.get_mut(&id) {
            None => Ok(UpdateResult::NotFound),
            Some(request) if !request.is_pending() => Ok(UpdateResult::NotPending),
            Some(request) => {
                request.scheduled_end_ts_utc = end_ts_utc;
                Ok(UpdateResult::Updated)
            }
        }
    }

    async fn mark_revoked(&self, id: RequestId) -> Result<bool> {
        let mut inner = self.write()?;

        match inner.requests.get_mut(&id) {
            Some(request) if request.is_pending() => {
                request.status = RequestStatus::Revoked;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<GrantRequest>> {
        let inner = self.read()?;

        let mut requests: Vec<GrantRequest> = inner.requests.values().cloned().collect();
        requests.sort_by(|a, b| {
            b.scheduled_end_ts_utc
                .cmp(&a.scheduled_end_ts_utc)
                .then(b.request_id.cmp(&a.request_id))
        });
        requests.truncate(limit);

        Ok(requests)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<GrantRequest>> {
        let inner = self.read()?;
        Ok(inner
            .requests
            .values()
            .filter(|r| r.is_due(now))
            .cloned()
            .collect())
    }

    async fn count_requests(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.requests.len())
    }

    async fn append_log(&self, entry: &NewLogEntry) -> Result<LogId> {
        let mut inner = self.write()?;

        let id = LogId::new(inner.next_log_id);
        inner.next_log_id += 1;
        inner.log.push(entry.clone().into_entry(id));

        Ok(id)
    }

    async fn recent_log(&self, limit: usize) -> Result<Vec<ExecutionLogEntry>> {
        let inner = self.read()?;

        let mut entries = inner.log.clone();
        entries.sort_by(|a, b| {
            b.exe_ts_utc
                .cmp(&a.exe_ts_utc)
                .then(b.log_id.cmp(&a.log_id))
        });
        entries.truncate(limit);

        Ok(entries)
    }

    async fn count_log(&self) -> Result<usize> {
        let inner = self.read()?;
        Ok(inner.log.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempgrant_core::ExecutionStatus;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn new_request(user: &str, end: DateTime<Utc>) -> NewGrantRequest {
        NewGrantRequest {
            user_name: user.into(),
            grant_statement: format!("GRANT ROLE analyst TO USER {};", user),
            scheduled_end_ts_utc: end,
        }
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();

        let id = store
            .insert_request(&new_request("alice", base()))
            .await
            .unwrap();
        assert_eq!(id, RequestId::new(1));

        let retrieved = store.get_request(id).await.unwrap().unwrap();
        assert_eq!(retrieved.user_name, "alice");
        assert_eq!(retrieved.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn test_ids_are_monotonic() {
        let store = MemoryStore::new();
        let a = store.insert_request(&new_request("a", base())).await.unwrap();
        let b = store.insert_request(&new_request("b", base())).await.unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_revoked_rows_are_frozen() {
        let store = MemoryStore::new();
        let id = store.insert_request(&new_request("a", base())).await.unwrap();

        assert!(store.mark_revoked(id).await.unwrap());
        assert!(!store.mark_revoked(id).await.unwrap());

        let result = store
            .update_end_time(id, base() - Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::NotPending);

        let unchanged = store.get_request(id).await.unwrap().unwrap();
        assert_eq!(unchanged.scheduled_end_ts_utc, base());
        assert_eq!(unchanged.status, RequestStatus::Revoked);
    }

    #[tokio::test]
    async fn test_update_unknown_request() {
        let store = MemoryStore::new();
        let result = store
            .update_end_time(RequestId::new(99), base())
            .await
            .unwrap();
        assert_eq!(result, UpdateResult::NotFound);
    }

    #[tokio::test]
    async fn test_list_recent_orders_by_end_desc() {
        let store = MemoryStore::new();
        for hours in [3, 1, 2] {
            store
                .insert_request(&new_request("u", base() + Duration::hours(hours)))
                .await
                .unwrap();
        }

        let recent = store.list_recent(2).await.unwrap();
        let ends: Vec<_> = recent.iter().map(|r| r.scheduled_end_ts_utc).collect();
        assert_eq!(ends, vec![base() + Duration::hours(3), base() + Duration::hours(2)]);
    }

    #[tokio::test]
    async fn test_recent_log_newest_first() {
        let store = MemoryStore::new();
        store
            .append_log(&NewLogEntry::completed("a", "GRANT 1", base(), "q-1"))
            .await
            .unwrap();
        store
            .append_log(&NewLogEntry::failed("a", "GRANT 2", base() + Duration::minutes(5)))
            .await
            .unwrap();

        let log = store.recent_log(20).await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status, ExecutionStatus::Error);
        assert_eq!(log[1].external_reference.as_deref(), Some("q-1"));
    }
}
