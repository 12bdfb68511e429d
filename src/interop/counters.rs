//! Process-wide dispatch counters

use std::sync::atomic::{AtomicUsize, Ordering};

static CALLS_MADE: AtomicUsize = AtomicUsize::new(0);
static CALL_ERRORS: AtomicUsize = AtomicUsize::new(0);
static ENTRY_POINTS: AtomicUsize = AtomicUsize::new(0);

#[inline]
pub(crate) fn record_call() {
    CALLS_MADE.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_error() {
    CALL_ERRORS.fetch_add(1, Ordering::Relaxed);
}

#[inline]
pub(crate) fn record_entry_point() {
    ENTRY_POINTS.fetch_add(1, Ordering::Relaxed);
}

pub(crate) fn snapshot() -> (usize, usize, usize) {
    (
        CALLS_MADE.load(Ordering::Relaxed),
        CALL_ERRORS.load(Ordering::Relaxed),
        ENTRY_POINTS.load(Ordering::Relaxed),
    )
}
