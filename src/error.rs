use std::time::Duration;

use thiserror::Error;

/// Fatal startup errors: the run never begins when one of these occurs
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("weight table '{0}' has no entries")]
	EmptyWeightTable(String),

	#[error("weight table '{table}' has invalid weight {weight} for '{label}'")]
	InvalidWeight {
		table: String,
		label: String,
		weight: f64,
	},

	#[error("weight table '{0}' has a zero total weight")]
	ZeroTotalWeight(String),

	#[error("pattern '{pattern}' draws from category '{category}' which has no domains")]
	EmptyCategory {
		pattern: String,
		category: String,
	},

	#[error("invalid pacing range {min:?}..{max:?}")]
	InvalidPacing {
		min: Duration,
		max: Duration,
	},

	#[error("unknown pattern '{0}'")]
	UnknownPattern(String),

	#[error("invalid argument: {0}")]
	InvalidArgument(String),
}

/// A resolution attempt that did not complete.
///
/// These never abort a run; the dispatcher folds them into the failed counter.
#[derive(Debug, Error)]
pub enum ResolveError {
	#[error("query timed out after {0:?}")]
	Timeout(Duration),

	#[error("transport error: {0}")]
	Transport(#[from] std::io::Error),

	#[error("could not build query: {0}")]
	Encode(String),
}

/// The host cannot send UDP DNS queries at all.
#[derive(Debug, Error)]
#[error("cannot send DNS queries to {server}: {source}")]
pub struct MissingCapability {
	pub server: String,
	#[source]
	pub source: ResolveError,
}
