use std::path::PathBuf;

use clap::Parser;

/// DNS traffic pattern simulator
#[derive(Parser, Debug)]
#[command(name = "dns-traffic-sim")]
#[command(about = "Generate DNS query traffic matching named statistical patterns")]
pub struct Cli {
	/// Traffic pattern: normal, suspicious, dga, blocked, burst, cdn, mixed,
	/// continuous, enterprise, infected or developer
	#[arg(short = 'p', long = "pattern", default_value = "mixed")]
	pub pattern: String,

	/// Number of queries to send (0 sends none)
	#[arg(short = 'c', long = "count")]
	pub count: Option<u64>,

	/// Run for this many seconds (0 means no duration bound)
	#[arg(short = 'd', long = "duration")]
	pub duration: Option<u64>,

	/// DNS server to query (IP, IP:PORT, or "system" for /etc/resolv.conf)
	#[arg(short = 's', long = "server", env = "DNS_SIM_SERVER", default_value = "10.50.0.30")]
	pub server: String,

	/// Query timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "2000")]
	pub timeout: u64,

	/// Random seed for reproducible traffic
	#[arg(long = "seed")]
	pub seed: Option<u64>,

	/// Write the JSON run report to this file
	#[arg(long = "report")]
	pub report: Option<PathBuf>,

	/// Write the per-category breakdown as CSV to this file
	#[arg(short = 'o', long = "output")]
	pub output: Option<PathBuf>,

	/// Write the process id here at start and remove it on clean exit
	#[arg(long = "pid-file")]
	pub pid_file: Option<PathBuf>,

	/// Log every resolution error and scheduler transition
	#[arg(short = 'v', long = "verbose")]
	pub verbose: bool,
}
