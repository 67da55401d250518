use std::net::SocketAddr;
use std::time::{Duration, Instant};

use hickory_proto::op::ResponseCode;
use tracing::debug;

use crate::dns::{Answer, Resolve};
use crate::domains::DomainCategory;
use crate::error::ResolveError;
use crate::transport::{QueryEvent, QueryOutcome, QueryType};

/// Map a resolver result onto the three-way outcome.
///
/// Empty answers, NXDOMAIN and SERVFAIL all count as blocked: the resolver
/// response alone cannot tell a policy block from a name that does not exist.
pub fn classify(result: &Result<Answer, ResolveError>) -> QueryOutcome {
	match result {
		Err(_) => QueryOutcome::Failed,
		Ok(answer) if answer.rcode == ResponseCode::NoError && answer.answer_count > 0 => {
			QueryOutcome::Success
		}
		Ok(_) => QueryOutcome::Blocked,
	}
}

/// Issues single queries against one target server.
pub struct Dispatcher<R> {
	resolver: R,
	server: SocketAddr,
	timeout: Duration,
}

impl<R: Resolve> Dispatcher<R> {
	pub fn new(resolver: R, server: SocketAddr, timeout: Duration) -> Self {
		Dispatcher { resolver, server, timeout }
	}

	pub fn server(&self) -> SocketAddr {
		self.server
	}

	/// Resolve one name and time it. Never fails: resolver errors become
	/// a failed outcome on the returned event.
	pub async fn dispatch(
		&self,
		domain: &str,
		query_type: QueryType,
		category: DomainCategory,
	) -> QueryEvent {
		let start = Instant::now();
		let result = self.resolver
			.resolve(domain, query_type, self.server, self.timeout)
			.await;
		let latency = start.elapsed();

		if let Err(e) = &result {
			debug!(%domain, %query_type, error = %e, "resolution did not complete");
		}

		QueryEvent {
			domain: domain.to_string(),
			query_type,
			target_server: self.server,
			latency,
			outcome: classify(&result),
			category,
		}
	}
}
