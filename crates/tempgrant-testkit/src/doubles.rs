//! Wrappers that count calls, inject failures, and hold sweeps in flight.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tempgrant_core::{
    ExecutionLogEntry, GrantRequest, LogId, NewGrantRequest, NewLogEntry, RequestId,
};
use tempgrant_procs::{GrantReceipt, ProcedureError, Procedures, SweepSummary};
use tempgrant_store::{Store, StoreError, UpdateResult};
use tokio::sync::{Notify, Semaphore};

/// Procedures wrapper that counts calls and can fail or block sweeps.
pub struct InstrumentedProcedures<P> {
    inner: P,
    grant_calls: AtomicUsize,
    sweep_calls: AtomicUsize,
    sweep_failure: Mutex<Option<String>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
    sweep_started: Notify,
}

impl<P: Procedures> InstrumentedProcedures<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            grant_calls: AtomicUsize::new(0),
            sweep_calls: AtomicUsize::new(0),
            sweep_failure: Mutex::new(None),
            gate: Mutex::new(None),
            sweep_started: Notify::new(),
        }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn grant_calls(&self) -> usize {
        self.grant_calls.load(Ordering::SeqCst)
    }

    pub fn sweep_calls(&self) -> usize {
        self.sweep_calls.load(Ordering::SeqCst)
    }

    /// Fail every sweep with `reason` (`Some`) or stop failing (`None`).
    pub fn fail_sweeps(&self, reason: Option<String>) {
        *lock(&self.sweep_failure) = reason;
    }

    /// Make sweeps wait until [`SweepGate::release`] is called.
    pub fn hold_sweeps(&self) -> SweepGate {
        let semaphore = Arc::new(Semaphore::new(0));
        *lock(&self.gate) = Some(semaphore.clone());
        SweepGate { semaphore }
    }

    /// Wait until a sweep has been entered.
    pub async fn sweep_started(&self) {
        self.sweep_started.notified().await
    }
}

/// Releases sweeps held by [`InstrumentedProcedures::hold_sweeps`].
pub struct SweepGate {
    semaphore: Arc<Semaphore>,
}

impl SweepGate {
    /// Let `n` held sweeps proceed.
    pub fn release(&self, n: usize) {
        self.semaphore.add_permits(n);
    }
}

#[async_trait]
impl<P: Procedures> Procedures for InstrumentedProcedures<P> {
    async fn grant(
        &self,
        statement: &str,
        expiry_utc: DateTime<Utc>,
        acting_user: &str,
    ) -> tempgrant_procs::Result<GrantReceipt> {
        self.grant_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.grant(statement, expiry_utc, acting_user).await
    }

    async fn sweep_due_revocations(&self) -> tempgrant_procs::Result<SweepSummary> {
        self.sweep_calls.fetch_add(1, Ordering::SeqCst);
        self.sweep_started.notify_one();

        let gate = lock(&self.gate).clone();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let failure = lock(&self.sweep_failure).clone();
        if let Some(reason) = failure {
            return Err(ProcedureError::Rejected(reason));
        }
        self.inner.sweep_due_revocations().await
    }
}

/// Store wrapper that can fail end-time updates, request inserts, and
/// the dashboard listings.
pub struct FlakyStore<S> {
    inner: S,
    update_calls: AtomicUsize,
    update_failure: Mutex<Option<String>>,
    insert_failure: Mutex<Option<String>>,
    read_failure: Mutex<Option<String>>,
}

impl<S: Store> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            update_calls: AtomicUsize::new(0),
            update_failure: Mutex::new(None),
            insert_failure: Mutex::new(None),
            read_failure: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Fail every `update_end_time` with `reason` (`Some`) or stop (`None`).
    pub fn fail_updates(&self, reason: Option<String>) {
        *lock(&self.update_failure) = reason;
    }

    /// Fail every `insert_request`.
    pub fn fail_inserts(&self, reason: Option<String>) {
        *lock(&self.insert_failure) = reason;
    }

    /// Fail `list_recent` and `recent_log`.
    pub fn fail_reads(&self, reason: Option<String>) {
        *lock(&self.read_failure) = reason;
    }
}

fn injected(slot: &Mutex<Option<String>>) -> tempgrant_store::Result<()> {
    match lock(slot).clone() {
        Some(reason) => Err(StoreError::Unavailable(reason)),
        None => Ok(()),
    }
}

#[async_trait]
impl<S: Store> Store for FlakyStore<S> {
    async fn insert_request(&self, request: &NewGrantRequest) -> tempgrant_store::Result<RequestId> {
        injected(&self.insert_failure)?;
        self.inner.insert_request(request).await
    }

    async fn get_request(&self, id: RequestId) -> tempgrant_store::Result<Option<GrantRequest>> {
        self.inner.get_request(id).await
    }

    async fn update_end_time(
        &self,
        id: RequestId,
        end: DateTime<Utc>,
    ) -> tempgrant_store::Result<UpdateResult> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        injected(&self.update_failure)?;
        self.inner.update_end_time(id, end).await
    }

    async fn mark_revoked(&self, id: RequestId) -> tempgrant_store::Result<bool> {
        self.inner.mark_revoked(id).await
    }

    async fn list_recent(&self, limit: usize) -> tempgrant_store::Result<Vec<GrantRequest>> {
        injected(&self.read_failure)?;
        self.inner.list_recent(limit).await
    }

    async fn list_due(&self, now: DateTime<Utc>) -> tempgrant_store::Result<Vec<GrantRequest>> {
        self.inner.list_due(now).await
    }

    async fn count_requests(&self) -> tempgrant_store::Result<usize> {
        self.inner.count_requests().await
    }

    async fn append_log(&self, entry: &NewLogEntry) -> tempgrant_store::Result<LogId> {
        self.inner.append_log(entry).await
    }

    async fn recent_log(&self, limit: usize) -> tempgrant_store::Result<Vec<ExecutionLogEntry>> {
        injected(&self.read_failure)?;
        self.inner.recent_log(limit).await
    }

    async fn count_log(&self) -> tempgrant_store::Result<usize> {
        self.inner.count_log().await
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
