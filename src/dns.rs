use std::net::SocketAddr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RecordType};
use tokio::net::UdpSocket;

use crate::error::ResolveError;
use crate::transport::QueryType;

/// Shape of a completed resolver response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
	pub rcode: ResponseCode,
	pub answer_count: usize,
}

impl Answer {
	pub fn new(rcode: ResponseCode, answer_count: usize) -> Self {
		Answer { rcode, answer_count }
	}
}

#[cfg(test)]
impl Answer {
	/// NOERROR with no records in the answer section
	pub fn empty() -> Self {
		Answer { rcode: ResponseCode::NoError, answer_count: 0 }
	}

	/// NOERROR carrying `count` answer records
	pub fn records(count: usize) -> Self {
		Answer { rcode: ResponseCode::NoError, answer_count: count }
	}

	pub fn with_rcode(rcode: ResponseCode) -> Self {
		Answer { rcode, answer_count: 0 }
	}
}

/// Resolution capability used by the dispatcher.
///
/// One call is one attempt: implementations must not retry and must give
/// up after `timeout`.
#[async_trait]
pub trait Resolve: Send + Sync {
	async fn resolve(
		&self,
		domain: &str,
		query_type: QueryType,
		server: SocketAddr,
		timeout: Duration,
	) -> Result<Answer, ResolveError>;
}

#[async_trait]
impl<T: Resolve + ?Sized> Resolve for std::sync::Arc<T> {
	async fn resolve(
		&self,
		domain: &str,
		query_type: QueryType,
		server: SocketAddr,
		timeout: Duration,
	) -> Result<Answer, ResolveError> {
		(**self).resolve(domain, query_type, server, timeout).await
	}
}

fn record_type(query_type: QueryType) -> RecordType {
	match query_type {
		QueryType::A => RecordType::A,
		QueryType::AAAA => RecordType::AAAA,
		QueryType::MX => RecordType::MX,
		QueryType::TXT => RecordType::TXT,
		QueryType::CNAME => RecordType::CNAME,
		QueryType::NS => RecordType::NS,
	}
}

/// Build a recursive DNS query message for the given domain and query type.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_query(
	domain: &str,
	query_type: QueryType,
	txid: u16,
) -> Result<Vec<u8>, ResolveError> {
	let name = Name::from_ascii(domain)
		.map_err(|e| ResolveError::Encode(format!("invalid domain name '{}': {}", domain, e)))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, record_type(query_type)));

	message.to_vec()
		.map_err(|e| ResolveError::Encode(format!("failed to serialize DNS query: {}", e)))
}

/// Parse a DNS response, validating the transaction ID.
///
/// Returns None when the bytes are not a response to the query with
/// `expected_txid`; the caller keeps listening in that case.
pub fn parse_response(bytes: &[u8], expected_txid: u16) -> Option<Answer> {
	let message = Message::from_vec(bytes).ok()?;

	if message.id() != expected_txid || message.message_type() != MessageType::Response {
		return None;
	}

	Some(Answer::new(message.response_code(), message.answers().len()))
}

fn bind_addr(server: SocketAddr) -> &'static str {
	if server.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	}
}

/// Plain UDP resolver client.
///
/// Each query binds its own socket so a late answer to an earlier query can
/// never be mistaken for the current one.
#[derive(Debug, Default, Clone)]
pub struct UdpResolver;

impl UdpResolver {
	pub fn new() -> Self {
		UdpResolver
	}

	/// Check that a UDP socket can be opened for the server's address family.
	pub async fn probe(&self, server: SocketAddr) -> Result<(), ResolveError> {
		UdpSocket::bind(bind_addr(server)).await?;
		Ok(())
	}
}

#[async_trait]
impl Resolve for UdpResolver {
	async fn resolve(
		&self,
		domain: &str,
		query_type: QueryType,
		server: SocketAddr,
		timeout: Duration,
	) -> Result<Answer, ResolveError> {
		let txid: u16 = rand::random();
		let query_bytes = build_query(domain, query_type, txid)?;

		let socket = UdpSocket::bind(bind_addr(server)).await?;
		let start = Instant::now();
		socket.send_to(&query_bytes, server).await?;

		// 4096-byte buffer to handle EDNS-extended responses
		let mut buf = vec![0u8; 4096];
		loop {
			let elapsed = start.elapsed();
			if elapsed >= timeout {
				return Err(ResolveError::Timeout(timeout));
			}
			let remaining = timeout - elapsed;

			match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
				Ok(Ok((len, src))) => {
					if src != server {
						continue;
					}
					// Stray datagrams do not end the attempt
					if let Some(answer) = parse_response(&buf[..len], txid) {
						return Ok(answer);
					}
				}
				Ok(Err(e)) => return Err(ResolveError::Transport(e)),
				Err(_) => return Err(ResolveError::Timeout(timeout)),
			}
		}
	}
}
