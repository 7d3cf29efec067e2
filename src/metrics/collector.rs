//! Metrics collection using Prometheus
//!
//! Counters and gauges for the queue, ready-check, veto and match lifecycle,
//! exported through the health server's `/metrics` endpoint.

use anyhow::Result;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Main metrics collector for the scrim service
#[derive(Clone)]
pub struct MetricsCollector {
    registry: Arc<Registry>,

    /// Queue joins accepted
    pub queue_joins_total: IntCounter,
    /// Queue leaves accepted
    pub queue_leaves_total: IntCounter,
    /// Participants currently waiting
    pub queue_depth: IntGauge,

    /// Ready checks by outcome (started, completed, expired)
    pub ready_checks_total: IntCounterVec,
    /// Participants evicted from the queue on ready-check expiry
    pub ready_evictions_total: IntCounter,

    /// Map bans by kind (manual, auto)
    pub veto_bans_total: IntCounterVec,
    /// Wall-clock duration of completed vetoes
    pub veto_duration_seconds: Histogram,

    /// Matches by lifecycle event (started, finalized, reversed, cancelled)
    pub matches_total: IntCounterVec,

    /// Commands by result (ok, rejected, failed)
    pub commands_total: IntCounterVec,
}

impl MetricsCollector {
    /// Create a collector with a fresh registry
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let queue_joins_total = IntCounter::with_opts(Opts::new(
            "scrim_queue_joins_total",
            "Total accepted queue joins",
        ))?;
        let queue_leaves_total = IntCounter::with_opts(Opts::new(
            "scrim_queue_leaves_total",
            "Total accepted queue leaves",
        ))?;
        let queue_depth = IntGauge::with_opts(Opts::new(
            "scrim_queue_depth",
            "Participants currently waiting in the queue",
        ))?;
        let ready_checks_total = IntCounterVec::new(
            Opts::new("scrim_ready_checks_total", "Ready checks by outcome"),
            &["outcome"],
        )?;
        let ready_evictions_total = IntCounter::with_opts(Opts::new(
            "scrim_ready_evictions_total",
            "Participants evicted for missing a ready check",
        ))?;
        let veto_bans_total = IntCounterVec::new(
            Opts::new("scrim_veto_bans_total", "Map bans by kind"),
            &["kind"],
        )?;
        let veto_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "scrim_veto_duration_seconds",
                "Wall-clock duration of completed vetoes",
            )
            .buckets(vec![30.0, 60.0, 120.0, 300.0, 600.0, 900.0]),
        )?;
        let matches_total = IntCounterVec::new(
            Opts::new("scrim_matches_total", "Matches by lifecycle event"),
            &["event"],
        )?;
        let commands_total = IntCounterVec::new(
            Opts::new("scrim_commands_total", "Inbound commands by result"),
            &["result"],
        )?;

        registry.register(Box::new(queue_joins_total.clone()))?;
        registry.register(Box::new(queue_leaves_total.clone()))?;
        registry.register(Box::new(queue_depth.clone()))?;
        registry.register(Box::new(ready_checks_total.clone()))?;
        registry.register(Box::new(ready_evictions_total.clone()))?;
        registry.register(Box::new(veto_bans_total.clone()))?;
        registry.register(Box::new(veto_duration_seconds.clone()))?;
        registry.register(Box::new(matches_total.clone()))?;
        registry.register(Box::new(commands_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            queue_joins_total,
            queue_leaves_total,
            queue_depth,
            ready_checks_total,
            ready_evictions_total,
            veto_bans_total,
            veto_duration_seconds,
            matches_total,
            commands_total,
        })
    }

    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn record_ready_check(&self, outcome: &str) {
        self.ready_checks_total.with_label_values(&[outcome]).inc();
    }

    pub fn record_ban(&self, auto: bool) {
        let kind = if auto { "auto" } else { "manual" };
        self.veto_bans_total.with_label_values(&[kind]).inc();
    }

    pub fn record_match_event(&self, event: &str) {
        self.matches_total.with_label_values(&[event]).inc();
    }

    pub fn record_command(&self, result: &str) {
        self.commands_total.with_label_values(&[result]).inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        // Registration against a fresh registry only fails on duplicate
        // metric names, which cannot happen here
        Self::new().expect("metrics registration")
    }
}
