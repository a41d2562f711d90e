//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Executor (jobs, strategy attempts)
//! - Result cache (puts per tier, lookups, sweeps)
//!
//! Nothing is registered automatically; hosts add [`all_metrics`] to their
//! own registry.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Executor
// =============================================================================

/// Jobs by category and result.
pub static CONVERSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("archlight_conversions_total", "Total conversion jobs"),
        &["category", "result"], // "success", "failed", "unsupported"
    )
    .expect("valid metric definition")
});

/// Job duration in seconds, all attempts included.
pub static CONVERSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "archlight_conversion_duration_seconds",
            "Duration of conversion jobs",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 300.0]),
        &["category"],
    )
    .expect("valid metric definition")
});

/// Individual strategy attempts by category and result.
pub static STRATEGY_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "archlight_strategy_attempts_total",
            "Total strategy variant attempts",
        ),
        &["category", "result"], // "success", or a ConverterError kind
    )
    .expect("valid metric definition")
});

// =============================================================================
// Result cache
// =============================================================================

/// Cache writes by tier and result.
pub static CACHE_PUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("archlight_cache_puts_total", "Total result cache writes"),
        &["tier", "result"], // tier: "memory", "durable"; result: "stored", "skipped", "failed"
    )
    .expect("valid metric definition")
});

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("archlight_cache_lookups_total", "Total result cache lookups"),
        &["result"], // "memory", "durable", "expired", "foreign", "missing"
    )
    .expect("valid metric definition")
});

/// Durable entries removed by expiry sweeps.
pub static CACHE_PURGED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "archlight_cache_purged_total",
        "Total durable entries removed by expiry",
    )
    .expect("valid metric definition")
});

/// Get all metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Executor
        Box::new(CONVERSIONS_TOTAL.clone()),
        Box::new(CONVERSION_DURATION.clone()),
        Box::new(STRATEGY_ATTEMPTS.clone()),
        // Cache
        Box::new(CACHE_PUTS.clone()),
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(CACHE_PURGED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register_once() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CONVERSIONS_TOTAL.with_label_values(&["image", "success"]).inc();
        let names: Vec<_> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"archlight_conversions_total".to_string()));
    }
}
