use std::net::SocketAddr;

use anyhow::{anyhow, Result};

/// Parse a resolver address string into a socket address.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
///   "system"               -- first nameserver in /etc/resolv.conf
pub fn parse_server(input: &str) -> Result<SocketAddr> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty resolver address"));
	}

	if trimmed.eq_ignore_ascii_case("system") {
		return system_resolvers()
			.into_iter()
			.next()
			.ok_or_else(|| anyhow!("no nameserver found in /etc/resolv.conf"));
	}

	let addr: SocketAddr = if trimmed.starts_with('[') {
		// Bracketed IPv6 with port: [::1]:53
		trimmed.parse()
			.map_err(|e| anyhow!("invalid bracketed IPv6 address '{}': {}", trimmed, e))?
	} else if trimmed.contains("::") || trimmed.matches(':').count() > 1 {
		// Bare IPv6 address without port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IPv6 address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	} else if let Ok(addr) = trimmed.parse::<SocketAddr>() {
		// IPv4 with port (e.g. "8.8.8.8:5353")
		addr
	} else {
		// Plain IPv4 without port
		let ip = trimmed.parse()
			.map_err(|e| anyhow!("invalid IP address '{}': {}", trimmed, e))?;
		SocketAddr::new(ip, 53)
	};

	Ok(addr)
}

/// Parse nameserver lines out of resolv.conf content.
fn nameservers(content: &str) -> Vec<SocketAddr> {
	content.lines()
		.map(str::trim)
		.filter(|line| line.starts_with("nameserver"))
		.filter_map(|line| line.split_whitespace().nth(1))
		// Avoid recursing into the "system" keyword
		.filter(|addr| !addr.eq_ignore_ascii_case("system"))
		.filter_map(|addr| parse_server(addr).ok())
		.collect()
}

/// Read system resolvers from /etc/resolv.conf (Unix only).
///
/// Returns an empty vec on non-Unix platforms or if the file cannot be read.
pub fn system_resolvers() -> Vec<SocketAddr> {
	match std::fs::read_to_string("/etc/resolv.conf") {
		Ok(content) => nameservers(&content),
		Err(_) => Vec::new(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_ipv4_no_port() {
		let addr = parse_server("1.1.1.1").unwrap();
		assert_eq!(addr.port(), 53);
		assert_eq!(addr.ip().to_string(), "1.1.1.1");
	}

	#[test]
	fn test_ipv4_with_port() {
		let addr = parse_server("8.8.8.8:5353").unwrap();
		assert_eq!(addr.port(), 5353);
		assert_eq!(addr.ip().to_string(), "8.8.8.8");
	}

	#[test]
	fn test_ipv6_bare() {
		let addr = parse_server("2606:4700::1111").unwrap();
		assert_eq!(addr.port(), 53);
	}

	#[test]
	fn test_ipv6_bracketed() {
		let addr = parse_server("[2606:4700::1111]:53").unwrap();
		assert_eq!(addr.port(), 53);
	}

	#[test]
	fn test_invalid_input() {
		assert!(parse_server("not-an-ip").is_err());
		assert!(parse_server("   ").is_err());
	}

	#[test]
	fn test_nameservers_from_resolv_conf() {
		let content = "# generated\nsearch lan\nnameserver 10.50.0.30\nnameserver ::1\noptions ndots:1\n";
		let servers = nameservers(content);
		assert_eq!(servers.len(), 2);
		assert_eq!(servers[0].to_string(), "10.50.0.30:53");
		assert_eq!(servers[1].port(), 53);
	}
}
