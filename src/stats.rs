use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domains::DomainCategory;
use crate::transport::{QueryEvent, QueryOutcome};

/// Number of recent latencies kept for the percentile summary
pub const LATENCY_WINDOW: usize = 10_000;

/// Counters for one run, owned by the scheduler
#[derive(Debug, Clone, Default)]
pub struct RunStatistics {
	pub total: u64,
	pub success: u64,
	pub failed: u64,
	pub blocked: u64,
	pub dga: u64,
	pub categories: BTreeMap<DomainCategory, u64>,
	/// Latencies (ms) of calls that completed, newest last
	latencies_ms: VecDeque<f64>,
}

impl RunStatistics {
	pub fn new() -> Self {
		Self::default()
	}

	/// Fold one dispatched query into the counters.
	pub fn record(&mut self, event: &QueryEvent) {
		self.total += 1;
		match event.outcome {
			QueryOutcome::Success => self.success += 1,
			QueryOutcome::Blocked => self.blocked += 1,
			QueryOutcome::Failed => self.failed += 1,
		}
		if event.category == DomainCategory::Dga {
			self.dga += 1;
		}
		*self.categories.entry(event.category).or_default() += 1;

		// Failed calls report the timeout, not a resolver latency
		if event.outcome != QueryOutcome::Failed {
			if self.latencies_ms.len() == LATENCY_WINDOW {
				self.latencies_ms.pop_front();
			}
			self.latencies_ms.push_back(event.latency.as_secs_f64() * 1000.0);
		}
	}

	/// Deep copy of the current counters.
	pub fn snapshot(&self) -> RunStatistics {
		self.clone()
	}

	/// Percentile/mean summary over the latency window.
	pub fn latency_summary(&self) -> LatencySummary {
		let mut sorted: Vec<f64> = self.latencies_ms.iter().copied().collect();
		sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
		LatencySummary {
			samples: sorted.len(),
			p50_ms: percentile(&sorted, 50.0).unwrap_or(0.0),
			p95_ms: percentile(&sorted, 95.0).unwrap_or(0.0),
			mean_ms: mean(&sorted).unwrap_or(0.0),
		}
	}

	/// Per-category counts with their share of the total, in category order.
	pub fn category_shares(&self) -> Vec<CategoryShare> {
		self.categories.iter()
			.filter(|(_, &count)| count > 0)
			.map(|(&category, &count)| CategoryShare {
				category,
				count,
				percentage: if self.total > 0 {
					count as f64 / self.total as f64 * 100.0
				} else {
					0.0
				},
			})
			.collect()
	}
}

/// Latency figures for completed calls
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencySummary {
	pub samples: usize,
	pub p50_ms: f64,
	pub p95_ms: f64,
	pub mean_ms: f64,
}

/// One row of the category breakdown
#[derive(Debug, Clone, Serialize)]
pub struct CategoryShare {
	pub category: DomainCategory,
	pub count: u64,
	pub percentage: f64,
}

/// Serialized end-of-run report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
	pub timestamp: DateTime<Utc>,
	pub pattern: String,
	pub duration_seconds: f64,
	pub total: u64,
	pub success: u64,
	pub failed: u64,
	pub blocked: u64,
	pub dga: u64,
	pub dns_server: String,
	pub queries_per_second: f64,
	pub latency: LatencySummary,
	pub categories: Vec<CategoryShare>,
}

impl RunReport {
	pub fn from_stats(
		stats: &RunStatistics,
		pattern: &str,
		elapsed: Duration,
		dns_server: &str,
	) -> Self {
		let secs = elapsed.as_secs_f64();
		RunReport {
			timestamp: Utc::now(),
			pattern: pattern.to_string(),
			duration_seconds: (secs * 10.0).round() / 10.0,
			total: stats.total,
			success: stats.success,
			failed: stats.failed,
			blocked: stats.blocked,
			dga: stats.dga,
			dns_server: dns_server.to_string(),
			queries_per_second: if secs > 0.0 { stats.total as f64 / secs } else { 0.0 },
			latency: stats.latency_summary(),
			categories: stats.category_shares(),
		}
	}
}

/// Calculate the p-th percentile from a sorted slice using nearest-rank method.
///
/// Args:
///   sorted_values: Pre-sorted slice of f64 values.
///   p: Percentile between 0.0 and 100.0 (e.g. 50.0 for median).
///
/// Returns:
///   None if the slice is empty, otherwise the percentile value.
pub fn percentile(sorted_values: &[f64], p: f64) -> Option<f64> {
	if sorted_values.is_empty() {
		return None;
	}
	if sorted_values.len() == 1 {
		return Some(sorted_values[0]);
	}
	// Nearest-rank: rank = ceil(p/100 * N)
	let n = sorted_values.len();
	let rank = ((p / 100.0) * n as f64).ceil() as usize;
	// Clamp rank to valid index range [1, n]
	let rank = rank.clamp(1, n);
	Some(sorted_values[rank - 1])
}

/// Calculate the arithmetic mean of a slice of values.
pub fn mean(values: &[f64]) -> Option<f64> {
	if values.is_empty() {
		return None;
	}
	let sum: f64 = values.iter().sum();
	Some(sum / values.len() as f64)
}
