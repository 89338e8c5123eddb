//! Per-source counter aggregation and derived rates.
//!
//! Everything here is a pure function of the counters passed in. The metrics
//! poller hands over a fresh mapping on every poll and totals are recomputed
//! from scratch; nothing is cached between calls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Success rate at or above which a source is healthy (inclusive).
pub const HEALTHY_THRESHOLD_PCT: f64 = 80.0;

/// Success rate at or above which a source is degraded (inclusive).
pub const DEGRADED_THRESHOLD_PCT: f64 = 50.0;

/// Raw message counters for one source.
///
/// No relationship between the fields is assumed: the backend may count a
/// message in more than one bucket, so `rejected` can exceed `received`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounters {
    #[serde(default)]
    pub received: u64,
    #[serde(default)]
    pub deduped: u64,
    #[serde(default)]
    pub persisted: u64,
    #[serde(default)]
    pub rejected: u64,
}

impl SourceCounters {
    pub fn new(received: u64, deduped: u64, persisted: u64, rejected: u64) -> Self {
        Self {
            received,
            deduped,
            persisted,
            rejected,
        }
    }

    /// Persisted share of received messages, in percent.
    pub fn success_rate(&self) -> f64 {
        rate(self.persisted, self.received)
    }

    pub fn tier(&self) -> SuccessTier {
        SuccessTier::classify(self.success_rate())
    }
}

/// Field-wise totals across all sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AggregateTotals {
    pub received: u64,
    pub deduped: u64,
    pub persisted: u64,
    pub rejected: u64,
}

impl AggregateTotals {
    fn add(mut self, counters: &SourceCounters) -> Self {
        self.received = self.received.saturating_add(counters.received);
        self.deduped = self.deduped.saturating_add(counters.deduped);
        self.persisted = self.persisted.saturating_add(counters.persisted);
        self.rejected = self.rejected.saturating_add(counters.rejected);
        self
    }

    pub fn persisted_rate(&self) -> f64 {
        rate(self.persisted, self.received)
    }

    pub fn deduped_rate(&self) -> f64 {
        rate(self.deduped, self.received)
    }

    pub fn rejected_rate(&self) -> f64 {
        rate(self.rejected, self.received)
    }
}

/// Sum each counter across all sources. An empty mapping yields zeros.
pub fn aggregate(counters_by_source: &HashMap<String, SourceCounters>) -> AggregateTotals {
    counters_by_source
        .values()
        .fold(AggregateTotals::default(), AggregateTotals::add)
}

/// Percentage of `numerator` over `denominator`, rounded to one decimal.
///
/// Returns `0.0` when the denominator is zero so the display layer never sees
/// NaN or infinity.
pub fn rate(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    let pct = numerator as f64 / denominator as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Display tier for a per-source success rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessTier {
    Healthy,
    Degraded,
    Poor,
}

impl SuccessTier {
    pub fn classify(rate_pct: f64) -> Self {
        if rate_pct >= HEALTHY_THRESHOLD_PCT {
            Self::Healthy
        } else if rate_pct >= DEGRADED_THRESHOLD_PCT {
            Self::Degraded
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for SuccessTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// One row of the per-source metrics table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRow {
    pub source_id: String,
    #[serde(flatten)]
    pub counters: SourceCounters,
    pub success_rate: f64,
    pub tier: SuccessTier,
}

/// Everything the metrics view needs, derived from one counters mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsReport {
    pub totals: AggregateTotals,
    pub persisted_rate: f64,
    pub deduped_rate: f64,
    pub rejected_rate: f64,
    /// Rows sorted by source id.
    pub sources: Vec<SourceRow>,
}

impl MetricsReport {
    pub fn from_counters(counters_by_source: &HashMap<String, SourceCounters>) -> Self {
        let totals = aggregate(counters_by_source);

        let mut sources: Vec<SourceRow> = counters_by_source
            .iter()
            .map(|(source_id, counters)| SourceRow {
                source_id: source_id.clone(),
                counters: *counters,
                success_rate: counters.success_rate(),
                tier: counters.tier(),
            })
            .collect();
        sources.sort_by(|a, b| a.source_id.cmp(&b.source_id));

        Self {
            totals,
            persisted_rate: totals.persisted_rate(),
            deduped_rate: totals.deduped_rate(),
            rejected_rate: totals.rejected_rate(),
            sources,
        }
    }

    /// No sources reported yet (or the metrics endpoint is unavailable).
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl Default for MetricsReport {
    fn default() -> Self {
        Self::from_counters(&HashMap::new())
    }
}
