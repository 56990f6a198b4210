// src/store.rs
//! Idempotency store: at most one authoritative [`ForecastResult`] per (market, UTC day).
//!
//! Each key owns a `tokio::sync::OnceCell`. The map mutex only guards finding or
//! inserting that cell; the computation itself runs under the cell's own
//! single-initializer guarantee, so different keys never wait on each other and
//! concurrent callers of one key share a single computation.
//!
//! Entries are write-once and live for the life of the process. A failed or
//! cancelled computation leaves the cell empty; the last caller holding an empty
//! cell removes it from the map, so only committed results are retained.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tokio::sync::OnceCell;

use crate::error::ForecastError;
use crate::forecast::ForecastResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey {
    pub market_id: String,
    pub date: NaiveDate,
}

impl IdempotencyKey {
    /// The calendar date is taken in UTC, whatever offset `forecast_time` carries.
    pub fn new(market_id: impl Into<String>, forecast_time: &DateTime<FixedOffset>) -> Self {
        Self {
            market_id: market_id.into(),
            date: forecast_time.with_timezone(&Utc).date_naive(),
        }
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.market_id, self.date)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served a result stored by an earlier (or concurrent) caller.
    Hit,
    /// This call ran the computation and committed its result.
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

type Cell = Arc<OnceCell<ForecastResult>>;

#[derive(Debug, Default)]
pub struct IdempotencyStore {
    cells: Mutex<HashMap<IdempotencyKey, Cell>>,
    committed: AtomicUsize,
}

/// Holds one caller's handle on a key's cell. On drop (success, error or
/// cancellation) an empty cell that nobody else holds leaves the map.
struct CellLease<'a> {
    store: &'a IdempotencyStore,
    key: IdempotencyKey,
    cell: Cell,
}

impl Drop for CellLease<'_> {
    fn drop(&mut self) {
        if self.cell.initialized() {
            return;
        }
        let mut map = self.store.cells.lock().unwrap_or_else(PoisonError::into_inner);
        let mine = std::mem::take(&mut self.cell);
        // Clones are only taken or released under this lock: the map's plus ours means no waiters.
        let idle = map
            .get(&self.key)
            .is_some_and(|c| Arc::ptr_eq(c, &mine) && Arc::strong_count(&mine) == 2);
        if idle && !mine.initialized() {
            map.remove(&self.key);
        }
        drop(mine);
    }
}

impl IdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lease(&self, key: IdempotencyKey) -> CellLease<'_> {
        let cell = {
            let mut map = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.clone()).or_default().clone()
        };
        CellLease {
            store: self,
            key,
            cell,
        }
    }

    /// Return the stored result for `key`, or run `compute` and store what it returns.
    ///
    /// `compute` runs at most once per successful key. If the caller running it is
    /// dropped mid-flight, one of the waiting callers takes the computation over.
    pub async fn get_or_compute<F, Fut>(
        &self,
        key: IdempotencyKey,
        compute: F,
    ) -> Result<(ForecastResult, CacheStatus), ForecastError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ForecastResult, ForecastError>>,
    {
        let lease = self.lease(key);
        if let Some(hit) = lease.cell.get() {
            return Ok((hit.clone(), CacheStatus::Hit));
        }

        let mut ran = false;
        let value = lease
            .cell
            .get_or_try_init(|| {
                ran = true;
                compute()
            })
            .await?
            .clone();

        let status = if ran {
            self.committed.fetch_add(1, Ordering::Relaxed);
            CacheStatus::Miss
        } else {
            CacheStatus::Hit
        };
        Ok((value, status))
    }

    /// Peek without computing.
    pub fn get(&self, key: &IdempotencyKey) -> Option<ForecastResult> {
        let map = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(key).and_then(|c| c.get().cloned())
    }

    pub fn contains(&self, key: &IdempotencyKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of committed results (pending or failed keys are not counted).
    pub fn len(&self) -> usize {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
