mod cli;
mod config;
mod dga;
mod dispatcher;
mod dns;
mod domains;
mod error;
mod lifecycle;
mod logging;
mod output;
mod patterns;
mod resolver;
mod scheduler;
mod selector;
mod shutdown;
mod stats;
mod transport;

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing::{error, info};

use crate::cli::Cli;
use crate::config::RunConfig;
use crate::dns::UdpResolver;
use crate::error::{ConfigError, MissingCapability};
use crate::patterns::Catalog;
use crate::scheduler::Scheduler;

#[tokio::main]
async fn main() -> ExitCode {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			// Help and version land here too and are not failures
			let failed = e.use_stderr();
			let _ = e.print();
			return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
		}
	};

	match run(&cli).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			if e.is::<ConfigError>() || e.is::<MissingCapability>() {
				eprintln!("error: {:#}", e);
				eprintln!("{}", Cli::command().render_usage());
			} else {
				error!("{:#}", e);
			}
			ExitCode::FAILURE
		}
	}
}

async fn run(cli: &Cli) -> Result<()> {
	let config = RunConfig::from_cli(cli)?;
	logging::init_logging(config.verbose);
	let catalog = Catalog::build()?;

	let resolver = UdpResolver::new();
	resolver.probe(config.server).await.map_err(|source| MissingCapability {
		server: config.server.to_string(),
		source,
	})?;

	output::print_config_summary(&config);

	let (trigger, shutdown) = shutdown::channel();
	shutdown::listen_for_signals(trigger)?;

	let mut scheduler = Scheduler::new(config, catalog, resolver, shutdown);
	let report = scheduler.run().await?;
	info!(
		total = report.total,
		success = report.success,
		blocked = report.blocked,
		failed = report.failed,
		"done",
	);
	Ok(())
}
