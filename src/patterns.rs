//! Named traffic patterns and the catalog that validates them.
//!
//! Every concrete pattern is data: a weight table over domain categories,
//! a pacing range and, for the workstation profiles, a burst policy. The
//! `mixed` pattern is a weight table over the concrete ones.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;

use crate::dga;
use crate::domains::{self, DomainCategory};
use crate::error::ConfigError;
use crate::selector::WeightTable;
use crate::transport::QueryType;

/// Traffic pattern accepted by `--pattern`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pattern {
	Normal,
	Suspicious,
	Dga,
	Blocked,
	Burst,
	Cdn,
	Mixed,
	Continuous,
	Enterprise,
	Infected,
	Developer,
}

impl Pattern {
	pub const ALL: [Pattern; 11] = [
		Pattern::Normal,
		Pattern::Suspicious,
		Pattern::Dga,
		Pattern::Blocked,
		Pattern::Burst,
		Pattern::Cdn,
		Pattern::Mixed,
		Pattern::Continuous,
		Pattern::Enterprise,
		Pattern::Infected,
		Pattern::Developer,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Pattern::Normal => "normal",
			Pattern::Suspicious => "suspicious",
			Pattern::Dga => "dga",
			Pattern::Blocked => "blocked",
			Pattern::Burst => "burst",
			Pattern::Cdn => "cdn",
			Pattern::Mixed => "mixed",
			Pattern::Continuous => "continuous",
			Pattern::Enterprise => "enterprise",
			Pattern::Infected => "infected",
			Pattern::Developer => "developer",
		}
	}

	/// Patterns that issue queries directly rather than composing others.
	pub fn is_leaf(&self) -> bool {
		!matches!(self, Pattern::Mixed | Pattern::Continuous)
	}
}

impl fmt::Display for Pattern {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Pattern {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let wanted = s.trim().to_ascii_lowercase();
		Pattern::ALL.iter()
			.find(|p| p.as_str() == wanted)
			.copied()
			.ok_or_else(|| ConfigError::UnknownPattern(s.to_string()))
	}
}

/// Inclusive bounds on a random delay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
	pub min: Duration,
	pub max: Duration,
}

impl Pacing {
	pub fn new(min_secs: f64, max_secs: f64) -> Result<Self, ConfigError> {
		let pacing = Pacing {
			min: Duration::from_secs_f64(min_secs),
			max: Duration::from_secs_f64(max_secs),
		};
		if pacing.min > pacing.max {
			return Err(ConfigError::InvalidPacing { min: pacing.min, max: pacing.max });
		}
		Ok(pacing)
	}

	pub fn fixed(secs: f64) -> Self {
		let d = Duration::from_secs_f64(secs);
		Pacing { min: d, max: d }
	}

	/// Draw a delay uniformly from [min, max].
	pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
		if self.min == self.max {
			return self.min;
		}
		let secs = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
		Duration::from_secs_f64(secs)
	}
}

/// Occasional back-to-back query bursts
#[derive(Debug, Clone)]
pub struct BurstPolicy {
	pub probability: f64,
	pub size: RangeInclusive<u32>,
	pub spacing: Pacing,
}

/// Weight table, pacing and optional burst policy of one concrete pattern
#[derive(Debug, Clone)]
pub struct PatternSpec {
	pub pattern: Pattern,
	pub categories: WeightTable<DomainCategory>,
	pub pacing: Pacing,
	pub burst: Option<BurstPolicy>,
}

/// Outer table of the `mixed` pattern
#[derive(Debug, Clone)]
pub struct MixedSpec {
	pub sub_patterns: WeightTable<Pattern>,
	pub sub_count: RangeInclusive<u64>,
	pub pause: Pacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DgaMode {
	RandomChars,
	Fragments,
}

/// One query ready for dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawnQuery {
	pub domain: String,
	pub query_type: QueryType,
	pub category: DomainCategory,
}

/// All pattern definitions, validated once at startup
#[derive(Debug)]
pub struct Catalog {
	specs: BTreeMap<Pattern, PatternSpec>,
	pub mixed: MixedSpec,
	query_types: WeightTable<QueryType>,
	dga_modes: WeightTable<DgaMode>,
}

fn spec(
	pattern: Pattern,
	weights: &[(DomainCategory, f64)],
	pacing: Pacing,
	burst: Option<BurstPolicy>,
) -> Result<PatternSpec, ConfigError> {
	Ok(PatternSpec {
		pattern,
		categories: WeightTable::new(pattern.as_str(), weights)?,
		pacing,
		burst,
	})
}

fn burst(probability: f64, size: RangeInclusive<u32>) -> Result<Option<BurstPolicy>, ConfigError> {
	Ok(Some(BurstPolicy {
		probability,
		size,
		spacing: Pacing::new(0.01, 0.05)?,
	}))
}

impl Catalog {
	/// Build every pattern table and check each drawn category has domains.
	pub fn build() -> Result<Self, ConfigError> {
		use DomainCategory::*;

		let pooled = [
			(Popular, domains::category_size(Popular) as f64),
			(Cdn, domains::category_size(Cdn) as f64),
		];

		let list = vec![
			spec(
				Pattern::Normal,
				&[(Popular, 50.0), (Business, 25.0), (Tech, 15.0), (Cdn, 10.0)],
				Pacing::new(0.5, 2.0)?,
				None,
			)?,
			spec(
				Pattern::Suspicious,
				&[(Suspicious, 60.0), (Dga, 40.0)],
				Pacing::new(0.3, 1.5)?,
				None,
			)?,
			spec(Pattern::Dga, &[(Dga, 100.0)], Pacing::new(0.1, 0.8)?, None)?,
			spec(Pattern::Blocked, &[(Blocked, 100.0)], Pacing::new(0.5, 1.5)?, None)?,
			spec(Pattern::Burst, &pooled, Pacing::fixed(0.05), None)?,
			spec(Pattern::Cdn, &[(Cdn, 100.0)], Pacing::new(0.1, 0.5)?, None)?,
			spec(
				Pattern::Enterprise,
				&[
					(Popular, 60.0), (Cdn, 25.0), (Business, 8.0), (Tech, 5.0),
					(Suspicious, 1.5), (Dga, 0.3), (Malware, 0.2),
				],
				Pacing::new(0.1, 0.5)?,
				burst(0.05, 5..=15)?,
			)?,
			spec(
				Pattern::Infected,
				&[
					(Popular, 20.0), (Cdn, 5.0), (Suspicious, 30.0), (Dga, 35.0),
					(Malware, 8.0), (Business, 1.0), (Tech, 1.0),
				],
				Pacing::new(0.05, 0.3)?,
				burst(0.2, 10..=50)?,
			)?,
			spec(
				Pattern::Developer,
				&[
					(Popular, 45.0), (Cdn, 30.0), (Business, 5.0), (Tech, 10.0),
					(Suspicious, 5.0), (Dga, 3.0), (Malware, 2.0),
				],
				Pacing::new(0.2, 1.0)?,
				burst(0.15, 3..=20)?,
			)?,
		];

		let mixed = MixedSpec {
			sub_patterns: WeightTable::new("mixed", &[
				(Pattern::Normal, 45.0),
				(Pattern::Cdn, 20.0),
				(Pattern::Burst, 15.0),
				(Pattern::Suspicious, 12.0),
				(Pattern::Dga, 5.0),
				(Pattern::Blocked, 3.0),
			])?,
			sub_count: 2..=10,
			pause: Pacing::new(1.0, 3.0)?,
		};

		// A / AAAA / other at 75 / 15 / 10, other split evenly
		let other_share = 10.0 / QueryType::OTHER.len() as f64;
		let mut type_weights = vec![(QueryType::A, 75.0), (QueryType::AAAA, 15.0)];
		type_weights.extend(QueryType::OTHER.iter().map(|&qt| (qt, other_share)));

		let catalog = Catalog {
			specs: list.into_iter().map(|s| (s.pattern, s)).collect(),
			mixed,
			query_types: WeightTable::new("query-types", &type_weights)?,
			dga_modes: WeightTable::new("dga-modes", &[
				(DgaMode::RandomChars, 70.0),
				(DgaMode::Fragments, 30.0),
			])?,
		};
		catalog.validate()?;
		Ok(catalog)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for spec in self.specs.values() {
			for category in spec.categories.active_labels() {
				if !category.is_synthesized() && domains::domains_in(category).is_empty() {
					return Err(ConfigError::EmptyCategory {
						pattern: spec.pattern.to_string(),
						category: category.to_string(),
					});
				}
			}
		}
		for sub in self.mixed.sub_patterns.active_labels() {
			if !sub.is_leaf() || !self.specs.contains_key(&sub) {
				return Err(ConfigError::UnknownPattern(format!(
					"{} (referenced by {})", sub, self.mixed.sub_patterns.name(),
				)));
			}
		}
		Ok(())
	}

	/// Definition of a concrete pattern; None for mixed and continuous.
	pub fn spec(&self, pattern: Pattern) -> Option<&PatternSpec> {
		self.specs.get(&pattern)
	}

	/// Synthesize one DGA hostname using the 70/30 mode split.
	pub fn synthesize<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
		let label = match self.dga_modes.select(rng) {
			DgaMode::RandomChars => dga::random_label(rng),
			DgaMode::Fragments => dga::pattern_label(rng),
		};
		let name = dga::with_tld(&label, rng);
		debug_assert!(dga::is_dga_hostname(&name), "{}", name);
		name
	}

	pub fn query_type<R: Rng + ?Sized>(&self, rng: &mut R) -> QueryType {
		self.query_types.select(rng)
	}

	/// Pick the category, domain and query type for the next query.
	pub fn draw<R: Rng + ?Sized>(
		&self,
		spec: &PatternSpec,
		rng: &mut R,
	) -> Result<DrawnQuery, ConfigError> {
		let category = spec.categories.select(rng);
		let domain = if category.is_synthesized() {
			self.synthesize(rng)
		} else {
			domains::random_domain(category, rng)
				.ok_or_else(|| ConfigError::EmptyCategory {
					pattern: spec.pattern.to_string(),
					category: category.to_string(),
				})?
				.name
				.to_string()
		};
		Ok(DrawnQuery {
			domain,
			query_type: self.query_type(rng),
			category,
		})
	}
}
