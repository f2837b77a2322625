//! Daily call budget for a metered provider.
//!
//! The ledger keeps a single [`BudgetRecord`] per provider and re-reads it
//! from the [`KeyValueStore`] on every operation. The period rolls over
//! lazily: whenever the stored `period_key` is not today's date the record
//! is replaced with a fresh one before anything else is evaluated, so a
//! process that was asleep at midnight still starts the new day at zero.
//!
//! Storage failures never reach the caller. The first failed read or write
//! flips the ledger into in-memory mode for the rest of its life; a new
//! ledger in that mode starts from zero, which can only over-grant calls.
//!
//! The read-modify-write is not atomic across processes sharing one store.
//! Two processes can both see the last call as available and each spend it,
//! overshooting the limit by at most one call per process.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::clock::Clock;
use crate::storage::{KeyValueStore, StorageError};

/// Persisted budget state for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetRecord {
    pub period_key: String,
    pub calls_used: u32,
    pub limit: u32,
}

impl BudgetRecord {
    pub fn fresh(period_key: impl Into<String>, limit: u32) -> Self {
        Self {
            period_key: period_key.into(),
            calls_used: 0,
            limit,
        }
    }

    pub fn status(&self) -> BudgetStatus {
        BudgetStatus {
            used: self.calls_used,
            remaining: self.limit.saturating_sub(self.calls_used),
            limit: self.limit,
            period: self.period_key.clone(),
        }
    }
}

/// Read-only view of the budget handed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub used: u32,
    pub remaining: u32,
    pub limit: u32,
    pub period: String,
}

impl BudgetStatus {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

pub fn period_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

struct LedgerState {
    record: BudgetRecord,
    persistent: bool,
}

pub struct BudgetLedger {
    storage_key: String,
    limit: u32,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<LedgerState>,
}

impl BudgetLedger {
    pub fn new(
        storage_key: impl Into<String>,
        limit: u32,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let record = BudgetRecord::fresh(period_key(clock.today()), limit);
        Self {
            storage_key: storage_key.into(),
            limit,
            store,
            clock,
            state: Mutex::new(LedgerState {
                record,
                persistent: true,
            }),
        }
    }

    /// Load the persisted record. Called once at startup; every later
    /// operation re-reads the store anyway.
    pub async fn load(&self) -> BudgetStatus {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        tracing::info!(
            key = %self.storage_key,
            backend = self.store.backend_name(),
            persistent = state.persistent,
            "Budget ledger loaded: {}/{} calls used for {}",
            state.record.calls_used,
            state.record.limit,
            state.record.period_key,
        );
        state.record.status()
    }

    pub async fn has_budget(&self) -> bool {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        state.record.calls_used < state.record.limit
    }

    pub async fn remaining(&self) -> BudgetStatus {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        state.record.status()
    }

    /// Record one call against today's budget and persist it.
    pub async fn consume(&self) -> BudgetStatus {
        let mut state = self.state.lock().await;
        self.refresh(&mut state).await;
        state.record.calls_used = state.record.calls_used.saturating_add(1);
        self.persist(&mut state).await;
        state.record.status()
    }

    /// `false` once the ledger has fallen back to in-memory mode.
    pub async fn is_persistent(&self) -> bool {
        self.state.lock().await.persistent
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    async fn refresh(&self, state: &mut LedgerState) {
        let today = period_key(self.clock.today());
        let mut dirty = false;

        if state.persistent {
            match self.store.get_item(&self.storage_key).await {
                Ok(Some(raw)) => match serde_json::from_str::<BudgetRecord>(&raw) {
                    Ok(record) => state.record = record,
                    Err(err) => {
                        tracing::warn!(
                            key = %self.storage_key,
                            "Corrupt budget record, starting fresh: {}",
                            err
                        );
                        state.record = BudgetRecord::fresh(today.clone(), self.limit);
                        dirty = true;
                    }
                },
                Ok(None) => {
                    state.record = BudgetRecord::fresh(today.clone(), self.limit);
                    dirty = true;
                }
                Err(err) => self.degrade(state, err),
            }
        }

        // The configured ceiling wins over whatever an older run persisted.
        if state.record.limit != self.limit {
            state.record.limit = self.limit;
            dirty = true;
        }

        if state.record.period_key != today {
            tracing::debug!(
                key = %self.storage_key,
                "Budget period rolled over from {} to {}",
                state.record.period_key,
                today
            );
            state.record = BudgetRecord::fresh(today, self.limit);
            dirty = true;
        }

        if dirty {
            self.persist(state).await;
        }
    }

    async fn persist(&self, state: &mut LedgerState) {
        if !state.persistent {
            return;
        }

        let result = match serde_json::to_string(&state.record) {
            Ok(raw) => self.store.set_item(&self.storage_key, &raw).await,
            Err(err) => Err(StorageError::from(err)),
        };

        if let Err(err) = result {
            self.degrade(state, err);
        }
    }

    fn degrade(&self, state: &mut LedgerState, err: StorageError) {
        if state.persistent {
            tracing::warn!(
                key = %self.storage_key,
                backend = self.store.backend_name(),
                "Budget storage failed, continuing in memory only: {}",
                err
            );
        }
        state.persistent = false;
    }
}
