//! Cache-path counters. Recording is a no-op until a recorder is installed.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "backoffice_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "backoffice_cache_misses_total";
    pub const CACHE_PLACEHOLDER_HITS_TOTAL: &str = "backoffice_cache_placeholder_hits_total";
    pub const CACHE_WRITE_FAILURES_TOTAL: &str = "backoffice_cache_write_failures_total";
    pub const SINGLEFLIGHT_SHARED_TOTAL: &str = "backoffice_singleflight_shared_total";
    pub const STORE_LOADS_TOTAL: &str = "backoffice_store_loads_total";
}

pub fn record_cache_hit(entity: &'static str) {
    counter!(names::CACHE_HITS_TOTAL, "entity" => entity).increment(1);
}

pub fn record_cache_miss(entity: &'static str) {
    counter!(names::CACHE_MISSES_TOTAL, "entity" => entity).increment(1);
}

pub fn record_placeholder_hit(entity: &'static str) {
    counter!(names::CACHE_PLACEHOLDER_HITS_TOTAL, "entity" => entity).increment(1);
}

/// A best-effort cache write (population, placeholder or invalidation) failed.
pub fn record_cache_write_failure(entity: &'static str) {
    counter!(names::CACHE_WRITE_FAILURES_TOTAL, "entity" => entity).increment(1);
}

pub fn record_singleflight_shared(flight: &'static str) {
    counter!(names::SINGLEFLIGHT_SHARED_TOTAL, "entity" => flight).increment(1);
}

pub fn record_store_load(entity: &'static str) {
    counter!(names::STORE_LOADS_TOTAL, "entity" => entity).increment(1);
}
