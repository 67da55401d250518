//! Run lifecycle: Idle → Running → Draining → Terminated.
//!
//! The scheduler owns the statistics, the random source and the lifecycle
//! marker for one run. Cancellation is observed at every iteration
//! boundary, at every pacing wait, and while a query is in flight.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::Instant;
use tracing::{debug, error, info};

use crate::config::RunConfig;
use crate::dispatcher::Dispatcher;
use crate::dns::Resolve;
use crate::error::ConfigError;
use crate::lifecycle::PidFile;
use crate::output;
use crate::patterns::{Catalog, Pacing, Pattern, PatternSpec};
use crate::shutdown::Shutdown;
use crate::stats::{RunReport, RunStatistics};

const PROGRESS_EVERY: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
	Idle,
	Running,
	Draining,
	Terminated,
}

/// How a generator loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
	Completed,
	Cancelled,
}

/// Remaining query count and deadline for a generator loop
#[derive(Debug, Clone, Copy)]
pub struct Budget {
	remaining: Option<u64>,
	deadline: Option<Instant>,
	used: u64,
}

impl Budget {
	pub fn new(count: Option<u64>, duration: Option<Duration>) -> Self {
		Budget {
			remaining: count,
			deadline: duration.map(|d| Instant::now() + d),
			used: 0,
		}
	}

	pub fn exhausted(&self) -> bool {
		self.remaining == Some(0)
			|| self.deadline.is_some_and(|d| Instant::now() >= d)
	}

	fn consume(&mut self) {
		self.used += 1;
		if let Some(r) = self.remaining.as_mut() {
			*r = r.saturating_sub(1);
		}
	}

	/// Budget for at most `count` queries, sharing this budget's deadline.
	fn sub_budget(&self, count: u64) -> Budget {
		Budget {
			remaining: Some(self.remaining.map_or(count, |r| r.min(count))),
			deadline: self.deadline,
			used: 0,
		}
	}

	/// Charge the queries spent by a sub-budget.
	fn absorb(&mut self, sub: &Budget) {
		self.used += sub.used;
		if let Some(r) = self.remaining.as_mut() {
			*r = r.saturating_sub(sub.used);
		}
	}

	/// Shorten a wait so it never runs past the deadline.
	fn clamp(&self, delay: Duration) -> Duration {
		match self.deadline {
			Some(d) => delay.min(d.saturating_duration_since(Instant::now())),
			None => delay,
		}
	}
}

/// Resolve at the deadline; never without one.
async fn deadline_reached(deadline: Option<Instant>) {
	match deadline {
		Some(d) => tokio::time::sleep_until(d).await,
		None => std::future::pending::<()>().await,
	}
}

pub struct Scheduler<R> {
	config: RunConfig,
	catalog: Arc<Catalog>,
	dispatcher: Dispatcher<R>,
	rng: StdRng,
	stats: RunStatistics,
	shutdown: Shutdown,
	state: SchedulerState,
	started: Instant,
}

impl<R: Resolve> Scheduler<R> {
	pub fn new(config: RunConfig, catalog: Catalog, resolver: R, shutdown: Shutdown) -> Self {
		let rng = match config.seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		let dispatcher = Dispatcher::new(resolver, config.server, config.timeout);
		Scheduler {
			config,
			catalog: Arc::new(catalog),
			dispatcher,
			rng,
			stats: RunStatistics::new(),
			shutdown,
			state: SchedulerState::Idle,
			started: Instant::now(),
		}
	}

	pub fn state(&self) -> SchedulerState {
		self.state
	}

	fn transition(&mut self, next: SchedulerState) {
		debug!(from = ?self.state, to = ?next, "scheduler transition");
		self.state = next;
	}

	/// Run to completion or cancellation, then drain.
	///
	/// Errors only for startup problems (marker file) or a report that
	/// could not be written; per-query failures end up in the statistics.
	pub async fn run(&mut self) -> Result<RunReport> {
		let marker = match &self.config.pid_file {
			Some(path) => {
				let marker = PidFile::create(path)?;
				debug!(path = %marker.path().display(), "pid file written");
				Some(marker)
			}
			None => None,
		};

		self.transition(SchedulerState::Running);
		self.started = Instant::now();
		info!(pattern = %self.config.pattern, server = %self.dispatcher.server(), "run started");

		let end = match self.run_pattern_loop().await {
			Ok(end) => end,
			Err(e) => {
				error!("run aborted: {:#}", e);
				RunEnd::Cancelled
			}
		};
		info!(?end, total = self.stats.total, "run finished");

		self.drain(marker)
	}

	async fn run_pattern_loop(&mut self) -> Result<RunEnd> {
		let pattern = self.config.pattern;
		match pattern {
			Pattern::Continuous => self.run_continuous().await,
			Pattern::Mixed => {
				let bound = self.config.bound();
				let mut budget = Budget::new(bound.count, bound.duration);
				self.run_mixed(&mut budget).await
			}
			leaf => {
				let bound = self.config.bound();
				let mut budget = Budget::new(bound.count, bound.duration);
				self.run_leaf(leaf, &mut budget).await
			}
		}
	}

	/// Flush statistics, release the marker, terminate.
	fn drain(&mut self, marker: Option<PidFile>) -> Result<RunReport> {
		self.transition(SchedulerState::Draining);

		let report = RunReport::from_stats(
			&self.stats.snapshot(),
			self.config.pattern.as_str(),
			self.started.elapsed(),
			&self.config.server.to_string(),
		);

		let written = self.write_report(&report);

		if let Some(marker) = marker {
			if let Err(e) = marker.release() {
				error!("{:#}", e);
			}
		}

		self.transition(SchedulerState::Terminated);
		written.map(|_| report)
	}

	fn write_report(&self, report: &RunReport) -> Result<()> {
		output::print_category_table(report);
		println!("{}", output::report_json(report)?);
		if let Some(path) = &self.config.report_path {
			output::write_report(path, report)?;
		}
		if let Some(path) = &self.config.csv_path {
			output::write_csv(path, report)?;
		}
		Ok(())
	}

	/// `mixed` in fixed-length cycles until cancelled.
	async fn run_continuous(&mut self) -> Result<RunEnd> {
		let mut cycle = 0u64;
		loop {
			if self.shutdown.is_triggered() {
				return Ok(RunEnd::Cancelled);
			}
			cycle += 1;
			debug!(cycle, "continuous cycle starting");

			let mut budget = Budget::new(None, Some(self.config.cycle));
			if self.run_mixed(&mut budget).await? == RunEnd::Cancelled {
				return Ok(RunEnd::Cancelled);
			}

			let snapshot = self.stats.snapshot();
			info!(
				cycle,
				total = snapshot.total,
				success = snapshot.success,
				blocked = snapshot.blocked,
				failed = snapshot.failed,
				dga = snapshot.dga,
				"cycle complete",
			);
		}
	}

	/// Weighted choice of sub-patterns, each for a short run, with pauses.
	async fn run_mixed(&mut self, budget: &mut Budget) -> Result<RunEnd> {
		let catalog = Arc::clone(&self.catalog);
		let mixed = &catalog.mixed;
		loop {
			if budget.exhausted() {
				return Ok(RunEnd::Completed);
			}
			if self.shutdown.is_triggered() {
				return Ok(RunEnd::Cancelled);
			}

			let pattern = mixed.sub_patterns.select(&mut self.rng);
			let count = self.rng.gen_range(mixed.sub_count.clone());
			debug!(%pattern, count, "mixed sub-run");

			let mut sub = budget.sub_budget(count);
			let end = self.run_leaf(pattern, &mut sub).await?;
			budget.absorb(&sub);
			if end == RunEnd::Cancelled {
				return Ok(RunEnd::Cancelled);
			}
			if budget.exhausted() {
				return Ok(RunEnd::Completed);
			}

			if self.pace(mixed.pause, budget).await == RunEnd::Cancelled {
				return Ok(RunEnd::Cancelled);
			}
		}
	}

	/// Query loop of one concrete pattern.
	async fn run_leaf(&mut self, pattern: Pattern, budget: &mut Budget) -> Result<RunEnd> {
		let catalog = Arc::clone(&self.catalog);
		let spec = catalog.spec(pattern)
			.ok_or_else(|| ConfigError::UnknownPattern(pattern.to_string()))?;

		loop {
			if budget.exhausted() {
				return Ok(RunEnd::Completed);
			}
			if self.shutdown.is_triggered() {
				return Ok(RunEnd::Cancelled);
			}

			let burst = spec.burst.as_ref()
				.filter(|b| self.rng.gen_bool(b.probability))
				.map(|b| (self.rng.gen_range(b.size.clone()), b.spacing));

			if let Some((size, spacing)) = burst {
				debug!(%pattern, size, "burst");
				for _ in 0..size {
					if budget.exhausted() {
						break;
					}
					if self.issue(&catalog, spec, budget).await? == RunEnd::Cancelled {
						return Ok(RunEnd::Cancelled);
					}
					if self.pace(spacing, budget).await == RunEnd::Cancelled {
						return Ok(RunEnd::Cancelled);
					}
				}
			} else if self.issue(&catalog, spec, budget).await? == RunEnd::Cancelled {
				return Ok(RunEnd::Cancelled);
			}

			if budget.exhausted() {
				return Ok(RunEnd::Completed);
			}
			if self.pace(spec.pacing, budget).await == RunEnd::Cancelled {
				return Ok(RunEnd::Cancelled);
			}
		}
	}

	/// Draw, dispatch and record one query.
	///
	/// A query aborted by cancellation or by the budget deadline is not
	/// recorded.
	async fn issue(
		&mut self,
		catalog: &Catalog,
		spec: &PatternSpec,
		budget: &mut Budget,
	) -> Result<RunEnd> {
		let query = catalog.draw(spec, &mut self.rng)?;

		let event = tokio::select! {
			biased;
			_ = self.shutdown.triggered() => return Ok(RunEnd::Cancelled),
			_ = deadline_reached(budget.deadline) => {
				debug!(domain = %query.domain, "query abandoned at deadline");
				return Ok(RunEnd::Completed);
			}
			event = self.dispatcher.dispatch(&query.domain, query.query_type, query.category) => event,
		};

		self.stats.record(&event);
		budget.consume();
		output::print_query_line(&event);

		if self.stats.total % PROGRESS_EVERY == 0 {
			let elapsed = self.started.elapsed().as_secs_f64();
			let qps = if elapsed > 0.0 { self.stats.total as f64 / elapsed } else { 0.0 };
			info!(total = self.stats.total, qps = %format!("{:.1}", qps), "progress");
		}
		Ok(RunEnd::Completed)
	}

	/// Sleep a random pacing delay unless cancelled first.
	async fn pace(&mut self, pacing: Pacing, budget: &Budget) -> RunEnd {
		if self.shutdown.is_triggered() {
			return RunEnd::Cancelled;
		}
		let delay = budget.clamp(pacing.sample(&mut self.rng));
		tokio::select! {
			_ = tokio::time::sleep(delay) => RunEnd::Completed,
			_ = self.shutdown.triggered() => RunEnd::Cancelled,
		}
	}

	#[cfg(test)]
	fn stats(&self) -> &RunStatistics {
		&self.stats
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dga;
	use crate::dispatcher::stub::{StubBehavior, StubResolver};
	use crate::domains::DomainCategory;
	use crate::shutdown;

	fn config(pattern: Pattern) -> RunConfig {
		let mut config = RunConfig::new(pattern, "127.0.0.1:53".parse().unwrap());
		config.seed = Some(1234);
		config
	}

	fn scheduler(
		config: RunConfig,
		behavior: StubBehavior,
	) -> (Scheduler<Arc<StubResolver>>, Arc<StubResolver>, shutdown::ShutdownTrigger) {
		let resolver = Arc::new(StubResolver::new(behavior));
		let (trigger, shutdown) = shutdown::channel();
		let scheduler = Scheduler::new(config, Catalog::build().unwrap(), Arc::clone(&resolver), shutdown);
		(scheduler, resolver, trigger)
	}

	#[test]
	fn test_budget_count() {
		let mut budget = Budget::new(Some(2), None);
		assert!(!budget.exhausted());
		budget.consume();
		budget.consume();
		assert!(budget.exhausted());
	}

	#[test]
	fn test_sub_budget_is_capped_by_parent() {
		let mut parent = Budget::new(Some(3), None);
		let mut sub = parent.sub_budget(10);
		assert_eq!(sub.remaining, Some(3));
		sub.consume();
		sub.consume();
		parent.absorb(&sub);
		assert_eq!(parent.remaining, Some(1));
		assert_eq!(parent.used, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn test_budget_deadline_and_clamp() {
		let budget = Budget::new(None, Some(Duration::from_secs(1)));
		assert!(budget.clamp(Duration::from_secs(5)) <= Duration::from_secs(1));
		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(budget.exhausted());
		assert_eq!(budget.clamp(Duration::from_secs(5)), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn test_blocked_scenario() {
		let mut config = config(Pattern::Blocked);
		config.count = Some(20);
		let (mut scheduler, resolver, _trigger) = scheduler(config, StubBehavior::Empty);

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.total, 20);
		assert_eq!(report.blocked, 20);
		assert_eq!(report.success, 0);
		assert_eq!(report.failed, 0);
		assert_eq!(resolver.domains().len(), 20);
		assert_eq!(scheduler.state(), SchedulerState::Terminated);
	}

	#[tokio::test(start_paused = true)]
	async fn test_dga_scenario() {
		let mut config = config(Pattern::Dga);
		config.count = Some(50);
		let (mut scheduler, resolver, _trigger) = scheduler(config, StubBehavior::Empty);

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.total, 50);
		assert_eq!(report.dga, 50);
		for domain in resolver.domains() {
			assert!(dga::is_dga_hostname(&domain), "not a DGA name: {}", domain);
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_timeouts_count_as_failed() {
		let mut config = config(Pattern::Cdn);
		config.count = Some(5);
		let (mut scheduler, _resolver, _trigger) = scheduler(config, StubBehavior::Timeout);

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.failed, 5);
		assert_eq!(report.total, report.success + report.failed + report.blocked);
	}

	#[tokio::test(start_paused = true)]
	async fn test_zero_count_runs_no_queries() {
		for _ in 0..2 {
			let mut config = config(Pattern::Normal);
			config.count = Some(0);
			let (mut scheduler, resolver, _trigger) = scheduler(config, StubBehavior::Valid);

			let report = scheduler.run().await.unwrap();
			assert_eq!(report.total, 0);
			assert_eq!(report.success, 0);
			assert_eq!(report.failed, 0);
			assert_eq!(report.blocked, 0);
			assert_eq!(report.dga, 0);
			assert!(resolver.domains().is_empty());
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_zero_count_with_duration_runs_until_deadline() {
		let mut config = config(Pattern::Burst);
		config.count = Some(0);
		config.duration = Some(Duration::from_secs(1));
		let (mut scheduler, _resolver, _trigger) = scheduler(config, StubBehavior::Valid);

		let report = scheduler.run().await.unwrap();
		assert!(report.total >= 15, "total {}", report.total);
		assert_eq!(report.total, report.success);
	}

	#[tokio::test(start_paused = true)]
	async fn test_deadline_abandons_in_flight_query() {
		let mut config = config(Pattern::Burst);
		config.duration = Some(Duration::from_secs(1));
		config.timeout = Duration::from_secs(5);
		let (mut scheduler, resolver, _trigger) =
			scheduler(config, StubBehavior::Slow(Duration::from_millis(400)));

		let started = Instant::now();
		let report = scheduler.run().await.unwrap();
		// Answers at 0.4 s and 0.85 s; the third query is cut off at 1 s
		assert_eq!(resolver.domains().len(), 3);
		assert_eq!(report.total, 2);
		assert!(started.elapsed() < Duration::from_millis(1100), "{:?}", started.elapsed());
	}

	#[tokio::test(start_paused = true)]
	async fn test_mixed_with_count_is_exact() {
		let mut config = config(Pattern::Mixed);
		config.count = Some(37);
		let (mut scheduler, _resolver, _trigger) = scheduler(config, StubBehavior::Valid);

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.total, 37);
		assert_eq!(report.success, 37);
	}

	#[tokio::test(start_paused = true)]
	async fn test_duration_bound_stops_run() {
		let mut config = config(Pattern::Burst);
		config.duration = Some(Duration::from_secs(1));
		let (mut scheduler, _resolver, _trigger) = scheduler(config, StubBehavior::Valid);

		let report = scheduler.run().await.unwrap();
		// Fixed 50 ms pacing over one second
		assert!(report.total >= 15 && report.total <= 21, "total {}", report.total);
		let categories: Vec<DomainCategory> = report.categories.iter().map(|c| c.category).collect();
		assert!(categories.iter().all(|c| matches!(c, DomainCategory::Popular | DomainCategory::Cdn)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_profile_bursts_respect_count() {
		let mut config = config(Pattern::Infected);
		config.count = Some(120);
		let (mut scheduler, _resolver, _trigger) = scheduler(config, StubBehavior::Valid);

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.total, 120);
	}

	#[tokio::test(start_paused = true)]
	async fn test_continuous_stops_on_signal() {
		let dir = tempfile::tempdir().unwrap();
		let pid_path = dir.path().join("sim.pid");
		let report_path = dir.path().join("report.json");

		let mut config = config(Pattern::Continuous);
		config.pid_file = Some(pid_path.clone());
		config.report_path = Some(report_path.clone());
		let (mut scheduler, _resolver, trigger) = scheduler(config, StubBehavior::Valid);

		let handle = tokio::spawn(async move {
			let report = scheduler.run().await;
			(report, scheduler.state())
		});

		// Let the first query and at least one pacing interval pass
		tokio::time::sleep(Duration::from_secs(4)).await;
		assert!(pid_path.exists());
		trigger.trigger();

		let (report, state) = tokio::time::timeout(Duration::from_secs(5), handle)
			.await
			.unwrap()
			.unwrap();
		let report = report.unwrap();
		assert!(report.total >= 1);
		assert_eq!(state, SchedulerState::Terminated);
		assert!(!pid_path.exists());

		let written: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
		assert_eq!(written["pattern"], "continuous");
		assert!(written["total"].as_u64().unwrap() >= 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_before_start_issues_nothing() {
		let mut config = config(Pattern::Normal);
		config.count = Some(10);
		let (mut scheduler, resolver, trigger) = scheduler(config, StubBehavior::Valid);
		trigger.trigger();

		let report = scheduler.run().await.unwrap();
		assert_eq!(report.total, 0);
		assert!(resolver.domains().is_empty());
		assert_eq!(scheduler.stats().total, 0);
	}

	#[tokio::test(start_paused = true)]
	async fn test_seeded_runs_repeat() {
		let mut domains = Vec::new();
		for _ in 0..2 {
			let mut config = config(Pattern::Normal);
			config.count = Some(15);
			let (mut scheduler, resolver, _trigger) = scheduler(config, StubBehavior::Valid);
			scheduler.run().await.unwrap();
			domains.push(resolver.domains());
		}
		assert_eq!(domains[0], domains[1]);
	}
}
