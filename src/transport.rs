use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use crate::domains::DomainCategory;

/// DNS query type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryType {
	A,
	AAAA,
	MX,
	TXT,
	CNAME,
	NS,
}

impl QueryType {
	/// Types drawn for the "other" share of the query-type split
	pub const OTHER: [QueryType; 4] = [QueryType::MX, QueryType::TXT, QueryType::CNAME, QueryType::NS];
}

impl fmt::Display for QueryType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			QueryType::A => "A",
			QueryType::AAAA => "AAAA",
			QueryType::MX => "MX",
			QueryType::TXT => "TXT",
			QueryType::CNAME => "CNAME",
			QueryType::NS => "NS",
		};
		f.write_str(s)
	}
}

/// Classification of a single query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOutcome {
	Success,
	Blocked,
	Failed,
}

impl fmt::Display for QueryOutcome {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			QueryOutcome::Success => "SUCCESS",
			QueryOutcome::Blocked => "BLOCKED",
			QueryOutcome::Failed => "FAILED",
		};
		f.write_str(s)
	}
}

/// Result of a single dispatched query
#[derive(Debug, Clone)]
pub struct QueryEvent {
	pub domain: String,
	pub query_type: QueryType,
	pub target_server: SocketAddr,
	pub latency: Duration,
	pub outcome: QueryOutcome,
	pub category: DomainCategory,
}
