use std::path::Path;

use anyhow::{anyhow, Result};
use chrono::Local;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::config::RunConfig;
use crate::stats::RunReport;
use crate::transport::QueryEvent;

/// Print a summary of the run configuration before starting.
pub fn print_config_summary(config: &RunConfig) {
	let bound = config.bound();
	println!("DNS Traffic Simulator");
	println!("=====================");
	println!("Pattern:        {}", config.pattern);
	println!("DNS server:     {}", config.server);
	println!("Timeout:        {} ms", config.timeout.as_millis());
	if let Some(count) = bound.count {
		println!("Count:          {}", count);
	}
	if let Some(duration) = bound.duration {
		println!("Duration:       {} s", duration.as_secs());
	}
	if let Some(seed) = config.seed {
		println!("Seed:           {}", seed);
	}
	if let Some(path) = &config.pid_file {
		println!("PID file:       {}", path.display());
	}
	println!();
}

/// One log line per query: timestamp, type, domain, classification, latency.
pub fn format_query_line(event: &QueryEvent) -> String {
	format!(
		"{} {} {} {} {:.1}ms",
		Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
		event.query_type,
		event.domain,
		event.outcome,
		event.latency.as_secs_f64() * 1000.0,
	)
}

pub fn print_query_line(event: &QueryEvent) {
	println!("{}", format_query_line(event));
}

/// Print the per-category breakdown as a formatted table.
pub fn print_category_table(report: &RunReport) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec!["Category", "Queries", "Share"]);

	for share in &report.categories {
		table.add_row(vec![
			share.category.to_string(),
			share.count.to_string(),
			format!("{:.1}%", share.percentage),
		]);
	}

	println!("\nRun Statistics ({})", report.pattern);
	println!("==============\n");
	println!("Duration:       {:.1} s", report.duration_seconds);
	println!("Total:          {}", report.total);
	println!("Success:        {}", report.success);
	println!("Blocked:        {}", report.blocked);
	println!("Failed:         {}", report.failed);
	println!("DGA:            {}", report.dga);
	println!("Queries/sec:    {:.2}", report.queries_per_second);
	if report.latency.samples > 0 {
		println!(
			"Latency:        p50 {:.1} ms, p95 {:.1} ms, mean {:.1} ms",
			report.latency.p50_ms, report.latency.p95_ms, report.latency.mean_ms,
		);
	}
	if !report.categories.is_empty() {
		println!("{table}");
	}
}

pub fn report_json(report: &RunReport) -> Result<String> {
	serde_json::to_string_pretty(report)
		.map_err(|e| anyhow!("failed to serialize report: {}", e))
}

/// Write the JSON report to a file.
pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
	let json = report_json(report)?;
	std::fs::write(path, json + "\n")
		.map_err(|e| anyhow!("failed to write report '{}': {}", path.display(), e))?;
	println!("\nReport written to: {}", path.display());
	Ok(())
}

/// Write the per-category breakdown to a CSV file.
pub fn write_csv(path: &Path, report: &RunReport) -> Result<()> {
	let mut writer = csv::Writer::from_path(path)?;

	writer.write_record(["pattern", "category", "count", "percentage"])?;
	for share in &report.categories {
		writer.write_record([
			report.pattern.clone(),
			share.category.to_string(),
			share.count.to_string(),
			format!("{:.2}", share.percentage),
		])?;
	}

	writer.flush()?;
	println!("\nBreakdown written to: {}", path.display());
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	use crate::domains::DomainCategory;
	use crate::stats::RunStatistics;
	use crate::transport::{QueryOutcome, QueryType};

	fn event() -> QueryEvent {
		QueryEvent {
			domain: "qwrtzp42.tk".to_string(),
			query_type: QueryType::AAAA,
			target_server: "127.0.0.1:53".parse().unwrap(),
			latency: Duration::from_micros(12_340),
			outcome: QueryOutcome::Blocked,
			category: DomainCategory::Dga,
		}
	}

	fn report() -> RunReport {
		let mut stats = RunStatistics::new();
		stats.record(&event());
		RunReport::from_stats(&stats, "dga", Duration::from_secs(1), "127.0.0.1:53")
	}

	#[test]
	fn test_query_line_fields() {
		let line = format_query_line(&event());
		let fields: Vec<&str> = line.split(' ').collect();
		assert_eq!(fields.len(), 5);
		assert_eq!(fields[1], "AAAA");
		assert_eq!(fields[2], "qwrtzp42.tk");
		assert_eq!(fields[3], "BLOCKED");
		assert_eq!(fields[4], "12.3ms");
	}

	#[test]
	fn test_write_report_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("report.json");
		write_report(&path, &report()).unwrap();
		let value: serde_json::Value =
			serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
		assert_eq!(value["total"], 1);
		assert_eq!(value["blocked"], 1);
		assert_eq!(value["dns_server"], "127.0.0.1:53");
	}

	#[test]
	fn test_write_csv_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("breakdown.csv");
		write_csv(&path, &report()).unwrap();
		let content = std::fs::read_to_string(&path).unwrap();
		let mut lines = content.lines();
		assert_eq!(lines.next(), Some("pattern,category,count,percentage"));
		assert_eq!(lines.next(), Some("dga,dga,1,100.00"));
	}
}
