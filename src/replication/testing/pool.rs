use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use blobsync_util::error::{Error, Result};

use crate::contracts::{Connection, ConnectionKind, ConnectionPool};
use crate::wire::{GetRequest, GetResponse, MetadataRequest, MetadataResponse};

/// A connection whose responses are scripted ahead of time by a test, one
/// queue of metadata responses and one of get responses, each consumed in
/// order.
#[derive(Default)]
pub struct ScriptedConnection {
	metadata_responses: VecDeque<MetadataResponse>,
	get_responses: VecDeque<GetResponse>,
}

impl ScriptedConnection {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_metadata_response(mut self, response: MetadataResponse) -> Self {
		self.metadata_responses.push_back(response);
		self
	}

	pub fn with_get_response(mut self, response: GetResponse) -> Self {
		self.get_responses.push_back(response);
		self
	}
}

#[async_trait]
impl Connection for ScriptedConnection {
	async fn send_metadata_request(&mut self, _request: MetadataRequest) -> Result<MetadataResponse> {
		self.metadata_responses
			.pop_front()
			.ok_or_else(|| Error::Message("scripted connection ran out of metadata responses".into()))
	}

	async fn send_get_request(&mut self, _request: GetRequest) -> Result<GetResponse> {
		self.get_responses
			.pop_front()
			.ok_or_else(|| Error::Message("scripted connection ran out of get responses".into()))
	}
}

/// Records whether a checked-out [`ScriptedConnection`] was returned to the
/// pool or thrown away, so a test can assert on `Worker`'s check-in/destroy
/// choice without a real connection manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolEvent {
	CheckedIn,
	Destroyed,
}

/// A connection pool backed by one pre-scripted connection per (host, port).
/// `check_out` is only satisfiable once per peer unless a test pushes a
/// fresh connection back in with [`ScriptedPool::set`].
#[derive(Default)]
pub struct ScriptedPool {
	connections: Mutex<HashMap<(String, u16), ScriptedConnection>>,
	events: std::sync::Mutex<Vec<PoolEvent>>,
}

impl ScriptedPool {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn set(&self, host: &str, port: u16, connection: ScriptedConnection) {
		self.connections.lock().await.insert((host.to_string(), port), connection);
	}

	/// Every `check_in`/`destroy` call observed so far, in order.
	pub fn events(&self) -> Vec<PoolEvent> {
		self.events.lock().unwrap().clone()
	}
}

#[async_trait]
impl ConnectionPool for ScriptedPool {
	type Connection = ScriptedConnection;

	async fn check_out(
		&self,
		host: &str,
		port: u16,
		_kind: ConnectionKind,
		_timeout: Duration,
	) -> Result<Self::Connection> {
		self.connections
			.lock()
			.await
			.remove(&(host.to_string(), port))
			.ok_or_else(|| Error::Message(format!("no scripted connection for {}:{}", host, port)))
	}

	fn check_in(&self, _connection: Self::Connection) {
		self.events.lock().unwrap().push(PoolEvent::CheckedIn);
	}

	fn destroy(&self, _connection: Self::Connection) {
		self.events.lock().unwrap().push(PoolEvent::Destroyed);
	}
}
