//! Lightweight global metrics for yamal.
//!
//! Потокобезопасные атомарные счётчики для подсистем:
//! - page manager (отображения страниц)
//! - reservation / commit
//! - list closing
//! - auxiliary (background) thread
//!
//! The background thread never reports its failures to foreground callers;
//! these counters (and the `warn!` log lines) are where they show up.

use std::sync::atomic::{AtomicU64, Ordering};

// ----- Pages -----
static PAGES_MAPPED: AtomicU64 = AtomicU64::new(0);

// ----- Reserve / commit -----
static RESERVATIONS: AtomicU64 = AtomicU64::new(0);
static RESERVED_BYTES: AtomicU64 = AtomicU64::new(0);
static RESERVE_PAGE_SKIPS: AtomicU64 = AtomicU64::new(0);
static COMMITS: AtomicU64 = AtomicU64::new(0);
static COMMIT_RETRIES: AtomicU64 = AtomicU64::new(0);

// ----- Close -----
static LISTS_CLOSED: AtomicU64 = AtomicU64::new(0);

// ----- Aux thread -----
static AUX_CYCLES: AtomicU64 = AtomicU64::new(0);
static AUX_PAGES_PREALLOCATED: AtomicU64 = AtomicU64::new(0);
static AUX_SYNC_CALLS: AtomicU64 = AtomicU64::new(0);
static AUX_ERRORS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub pages_mapped: u64,

    pub reservations: u64,
    pub reserved_bytes: u64,
    pub reserve_page_skips: u64,
    pub commits: u64,
    pub commit_retries: u64,

    pub lists_closed: u64,

    pub aux_cycles: u64,
    pub aux_pages_preallocated: u64,
    pub aux_sync_calls: u64,
    pub aux_errors: u64,
}

impl MetricsSnapshot {
    /// Average CAS retries per successful commit.
    pub fn avg_commit_retries(&self) -> f64 {
        if self.commits == 0 {
            0.0
        } else {
            self.commit_retries as f64 / self.commits as f64
        }
    }
}

// ----- Recorders (pages) -----
pub fn record_page_mapped() {
    PAGES_MAPPED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (reserve / commit) -----
pub fn record_reservation(node_size: u64, skips: u64) {
    RESERVATIONS.fetch_add(1, Ordering::Relaxed);
    RESERVED_BYTES.fetch_add(node_size, Ordering::Relaxed);
    if skips > 0 {
        RESERVE_PAGE_SKIPS.fetch_add(skips, Ordering::Relaxed);
    }
}

pub fn record_commit(retries: u64) {
    COMMITS.fetch_add(1, Ordering::Relaxed);
    if retries > 0 {
        COMMIT_RETRIES.fetch_add(retries, Ordering::Relaxed);
    }
}

// ----- Recorders (close) -----
pub fn record_list_closed() {
    LISTS_CLOSED.fetch_add(1, Ordering::Relaxed);
}

// ----- Recorders (aux) -----
pub fn record_aux_cycle(pages_preallocated: u64) {
    AUX_CYCLES.fetch_add(1, Ordering::Relaxed);
    AUX_PAGES_PREALLOCATED.fetch_add(pages_preallocated, Ordering::Relaxed);
}

pub fn record_aux_sync() {
    AUX_SYNC_CALLS.fetch_add(1, Ordering::Relaxed);
}

pub fn record_aux_error() {
    AUX_ERRORS.fetch_add(1, Ordering::Relaxed);
}

// ----- Snapshot / Reset -----
pub fn snapshot() -> MetricsSnapshot {
    MetricsSnapshot {
        pages_mapped: PAGES_MAPPED.load(Ordering::Relaxed),

        reservations: RESERVATIONS.load(Ordering::Relaxed),
        reserved_bytes: RESERVED_BYTES.load(Ordering::Relaxed),
        reserve_page_skips: RESERVE_PAGE_SKIPS.load(Ordering::Relaxed),
        commits: COMMITS.load(Ordering::Relaxed),
        commit_retries: COMMIT_RETRIES.load(Ordering::Relaxed),

        lists_closed: LISTS_CLOSED.load(Ordering::Relaxed),

        aux_cycles: AUX_CYCLES.load(Ordering::Relaxed),
        aux_pages_preallocated: AUX_PAGES_PREALLOCATED.load(Ordering::Relaxed),
        aux_sync_calls: AUX_SYNC_CALLS.load(Ordering::Relaxed),
        aux_errors: AUX_ERRORS.load(Ordering::Relaxed),
    }
}

pub fn reset() {
    PAGES_MAPPED.store(0, Ordering::Relaxed);

    RESERVATIONS.store(0, Ordering::Relaxed);
    RESERVED_BYTES.store(0, Ordering::Relaxed);
    RESERVE_PAGE_SKIPS.store(0, Ordering::Relaxed);
    COMMITS.store(0, Ordering::Relaxed);
    COMMIT_RETRIES.store(0, Ordering::Relaxed);

    LISTS_CLOSED.store(0, Ordering::Relaxed);

    AUX_CYCLES.store(0, Ordering::Relaxed);
    AUX_PAGES_PREALLOCATED.store(0, Ordering::Relaxed);
    AUX_SYNC_CALLS.store(0, Ordering::Relaxed);
    AUX_ERRORS.store(0, Ordering::Relaxed);
}
