use rand::Rng;

use crate::error::ConfigError;

/// Immutable weighted table over labels of type `L`.
///
/// The cumulative prefix sums are computed once at construction, so a
/// table can be shared by every draw of a run without further mutation.
#[derive(Debug, Clone)]
pub struct WeightTable<L> {
	name: String,
	labels: Vec<L>,
	weights: Vec<f64>,
	cumulative: Vec<f64>,
	total: f64,
}

impl<L: Copy + std::fmt::Debug> WeightTable<L> {
	/// Build a table from (label, weight) pairs.
	///
	/// Rejects empty tables, negative or non-finite weights, and tables
	/// whose weights sum to zero.
	pub fn new(name: &str, entries: &[(L, f64)]) -> Result<Self, ConfigError> {
		if entries.is_empty() {
			return Err(ConfigError::EmptyWeightTable(name.to_string()));
		}

		let mut labels = Vec::with_capacity(entries.len());
		let mut weights = Vec::with_capacity(entries.len());
		let mut cumulative = Vec::with_capacity(entries.len());
		let mut running = 0.0;
		for &(label, weight) in entries {
			if !weight.is_finite() || weight < 0.0 {
				return Err(ConfigError::InvalidWeight {
					table: name.to_string(),
					label: format!("{:?}", label),
					weight,
				});
			}
			running += weight;
			labels.push(label);
			weights.push(weight);
			cumulative.push(running);
		}

		if running <= 0.0 {
			return Err(ConfigError::ZeroTotalWeight(name.to_string()));
		}

		Ok(WeightTable {
			name: name.to_string(),
			labels,
			weights,
			cumulative,
			total: running,
		})
	}

	/// Draw one label with probability weight_i / total.
	pub fn select<R: Rng + ?Sized>(&self, rng: &mut R) -> L {
		let point = rng.gen_range(0.0..self.total);
		// First index whose cumulative weight exceeds the draw
		let idx = self.cumulative.partition_point(|&c| c <= point);
		// Float rounding can leave the draw at the very top of the range
		self.labels[idx.min(self.labels.len() - 1)]
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Labels with a strictly positive weight.
	pub fn active_labels(&self) -> impl Iterator<Item = L> + '_ {
		self.labels.iter()
			.zip(&self.weights)
			.filter(|(_, &w)| w > 0.0)
			.map(|(&l, _)| l)
	}

	/// Normalized share of a label, in [0, 1].
	#[cfg(test)]
	pub fn share(&self, index: usize) -> f64 {
		self.weights[index] / self.total
	}
}
