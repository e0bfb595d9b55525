//! Health aggregation across endpoints.

use crate::circuit_breaker::{BreakerStats, CircuitState};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Health of every endpoint tracked by a registry.
///
/// An endpoint is healthy while its breaker is closed; open and half-open
/// breakers both count as unhealthy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    /// Number of tracked endpoints.
    pub total: usize,
    /// Endpoints whose breaker is closed.
    pub healthy: usize,
    /// Endpoints whose breaker is open or half-open.
    pub unhealthy: usize,
    /// Endpoints whose breaker is closed. Always equal to `healthy`.
    pub closed: usize,
    /// Endpoints whose breaker is open.
    pub open: usize,
    /// Endpoints whose breaker is half-open.
    pub half_open: usize,
    /// Mean availability over all endpoints, 100 when none are tracked.
    pub overall_availability: f64,
    /// Ids of the unhealthy endpoints, sorted.
    pub unhealthy_endpoints: Vec<String>,
}

impl Default for HealthSummary {
    fn default() -> Self {
        Self {
            total: 0,
            healthy: 0,
            unhealthy: 0,
            closed: 0,
            open: 0,
            half_open: 0,
            overall_availability: 100.0,
            unhealthy_endpoints: Vec::new(),
        }
    }
}

impl HealthSummary {
    /// Builds a summary from per-endpoint snapshots.
    pub fn from_stats(stats: &BTreeMap<String, BreakerStats>) -> Self {
        if stats.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total: stats.len(),
            overall_availability: 0.0,
            ..Self::default()
        };

        for (endpoint, snapshot) in stats {
            match snapshot.state {
                CircuitState::Closed => summary.closed += 1,
                CircuitState::Open => summary.open += 1,
                CircuitState::HalfOpen => summary.half_open += 1,
            }
            if !snapshot.is_healthy() {
                summary.unhealthy_endpoints.push(endpoint.clone());
            }
            summary.overall_availability += snapshot.availability;
        }

        summary.healthy = summary.closed;
        summary.unhealthy = summary.open + summary.half_open;
        summary.overall_availability /= stats.len() as f64;
        summary
    }

    /// Returns `true` if every tracked endpoint is healthy.
    pub fn all_healthy(&self) -> bool {
        self.unhealthy == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::{Breaker, BreakerConfig};

    fn snapshot(endpoint: &str, state: CircuitState, availability: f64) -> BreakerStats {
        let mut stats = Breaker::new(endpoint, BreakerConfig::default()).stats();
        stats.state = state;
        stats.availability = availability;
        stats
    }

    #[test]
    fn test_empty_summary() {
        let summary = HealthSummary::from_stats(&BTreeMap::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.healthy, 0);
        assert_eq!(summary.unhealthy, 0);
        assert_eq!(summary.closed, 0);
        assert_eq!(summary.overall_availability, 100.0);
        assert!(summary.all_healthy());
    }

    #[test]
    fn test_summary_counts_states() {
        let stats: BTreeMap<_, _> = [
            ("a", CircuitState::Closed, 100.0),
            ("b", CircuitState::Open, 40.0),
            ("c", CircuitState::HalfOpen, 70.0),
            ("d", CircuitState::Closed, 90.0),
        ]
        .into_iter()
        .map(|(name, state, avail)| (name.to_string(), snapshot(name, state, avail)))
        .collect();

        let summary = HealthSummary::from_stats(&stats);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.healthy, 2);
        assert_eq!(summary.unhealthy, 2);
        assert_eq!(summary.closed, 2);
        assert_eq!(summary.open, 1);
        assert_eq!(summary.half_open, 1);
        assert_eq!(summary.unhealthy_endpoints, vec!["b", "c"]);
        assert!((summary.overall_availability - 75.0).abs() < f64::EPSILON);
        assert!(!summary.all_healthy());
    }
}
