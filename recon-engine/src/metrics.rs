//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the engine.
//!
//! # Metrics
//!
//! - `recon_actions_dispatched_total` - Actions appended to the log
//! - `recon_actions_settled_total` - Actions applied to the ledger
//! - `recon_ranges_opened_total` - Settlement ranges frozen
//! - `recon_pending_actions` - Actions awaiting settlement in the open range
//! - `recon_current_turn` - Turn index within the open range
//! - `recon_registered_identities` - Leaf slots assigned so far

use prometheus::{IntCounter, IntGauge, Opts, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Actions appended to the log
    pub actions_dispatched: IntCounter,

    /// Actions applied to the ledger
    pub actions_settled: IntCounter,

    /// Settlement ranges frozen
    pub ranges_opened: IntCounter,

    /// Actions awaiting settlement in the open range
    pub pending_actions: IntGauge,

    /// Turn index within the open range
    pub current_turn: IntGauge,

    /// Leaf slots assigned so far
    pub registered_identities: IntGauge,

    registry: Arc<Registry>,
}

impl Metrics {
    /// Create a new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let actions_dispatched = IntCounter::with_opts(Opts::new(
            "recon_actions_dispatched_total",
            "Actions appended to the log",
        ))?;
        registry.register(Box::new(actions_dispatched.clone()))?;

        let actions_settled = IntCounter::with_opts(Opts::new(
            "recon_actions_settled_total",
            "Actions applied to the ledger",
        ))?;
        registry.register(Box::new(actions_settled.clone()))?;

        let ranges_opened = IntCounter::with_opts(Opts::new(
            "recon_ranges_opened_total",
            "Settlement ranges frozen",
        ))?;
        registry.register(Box::new(ranges_opened.clone()))?;

        let pending_actions = IntGauge::with_opts(Opts::new(
            "recon_pending_actions",
            "Actions awaiting settlement in the open range",
        ))?;
        registry.register(Box::new(pending_actions.clone()))?;

        let current_turn = IntGauge::with_opts(Opts::new(
            "recon_current_turn",
            "Turn index within the open range",
        ))?;
        registry.register(Box::new(current_turn.clone()))?;

        let registered_identities = IntGauge::with_opts(Opts::new(
            "recon_registered_identities",
            "Leaf slots assigned so far",
        ))?;
        registry.register(Box::new(registered_identities.clone()))?;

        Ok(Self {
            actions_dispatched,
            actions_settled,
            ranges_opened,
            pending_actions,
            current_turn,
            registered_identities,
            registry,
        })
    }

    /// Record an action dispatch
    pub fn record_dispatch(&self) {
        self.actions_dispatched.inc();
    }

    /// Record a settled action and the resulting range counters
    pub fn record_settlement(&self, turn: u64, pending: u64) {
        self.actions_settled.inc();
        self.current_turn.set(turn as i64);
        self.pending_actions.set(pending as i64);
    }

    /// Record a freshly opened range
    pub fn record_range_opened(&self, pending: u64) {
        self.ranges_opened.inc();
        self.pending_actions.set(pending as i64);
        self.current_turn.set(0);
    }

    /// Update the assigned-slot count
    pub fn set_registered(&self, count: u64) {
        self.registered_identities.set(count as i64);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}
