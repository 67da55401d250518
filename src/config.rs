use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::patterns::Pattern;
use crate::resolver::parse_server;

/// Queries sent by a finite pattern when neither --count nor --duration is given
pub const DEFAULT_COUNT: u64 = 50;
/// Length of a mixed run without bounds, and of each continuous cycle
pub const DEFAULT_CYCLE: Duration = Duration::from_secs(300);

/// Fail at startup when an output file's directory does not exist.
fn check_writable_dir(flag: &str, path: &Path) -> Result<(), ConfigError> {
	let dir = match path.parent() {
		Some(dir) if !dir.as_os_str().is_empty() => dir,
		_ => return Ok(()),
	};
	if dir.is_dir() {
		Ok(())
	} else {
		Err(ConfigError::InvalidArgument(format!(
			"{}: directory '{}' does not exist", flag, dir.display(),
		)))
	}
}

/// Validated settings for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
	pub pattern: Pattern,
	pub count: Option<u64>,
	pub duration: Option<Duration>,
	pub server: SocketAddr,
	pub timeout: Duration,
	pub verbose: bool,
	pub seed: Option<u64>,
	pub report_path: Option<PathBuf>,
	pub csv_path: Option<PathBuf>,
	pub pid_file: Option<PathBuf>,
	pub cycle: Duration,
}

/// Query-count and wall-clock limits applied to a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBound {
	pub count: Option<u64>,
	pub duration: Option<Duration>,
}

impl RunConfig {
	pub fn new(pattern: Pattern, server: SocketAddr) -> Self {
		RunConfig {
			pattern,
			count: None,
			duration: None,
			server,
			timeout: Duration::from_secs(2),
			verbose: false,
			seed: None,
			report_path: None,
			csv_path: None,
			pid_file: None,
			cycle: DEFAULT_CYCLE,
		}
	}

	pub fn from_cli(cli: &Cli) -> Result<Self> {
		let pattern: Pattern = cli.pattern.parse()?;
		let server = parse_server(&cli.server)
			.map_err(|e| ConfigError::InvalidArgument(format!("--server: {}", e)))?;
		for (flag, path) in [("--report", &cli.report), ("--output", &cli.output)] {
			if let Some(path) = path {
				check_writable_dir(flag, path)?;
			}
		}
		if cli.timeout == 0 {
			return Err(ConfigError::InvalidArgument("--timeout must be positive".to_string()).into());
		}

		Ok(RunConfig {
			pattern,
			count: cli.count,
			duration: cli.duration.filter(|&s| s > 0).map(Duration::from_secs),
			server,
			timeout: Duration::from_millis(cli.timeout),
			verbose: cli.verbose,
			seed: cli.seed,
			report_path: cli.report.clone(),
			csv_path: cli.output.clone(),
			pid_file: cli.pid_file.clone(),
			cycle: DEFAULT_CYCLE,
		})
	}

	/// Limits for a finite run, filling in the pattern default when the
	/// command line gave neither.
	pub fn bound(&self) -> RunBound {
		match (self.count, self.duration) {
			(None, None) if self.pattern == Pattern::Mixed => RunBound {
				count: None,
				duration: Some(self.cycle),
			},
			(None, None) => RunBound {
				count: Some(DEFAULT_COUNT),
				duration: None,
			},
			// A zero count leaves the duration as the only limit
			(Some(0), Some(duration)) => RunBound {
				count: None,
				duration: Some(duration),
			},
			(count, duration) => RunBound { count, duration },
		}
	}
}
