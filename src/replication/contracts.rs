//! Trait boundaries for collaborators this crate depends on but does not
//! implement: the local blob store, the connection pool to remote peers, and
//! the sink that gets told about blobs as they're replicated in or out. A
//! production deployment backs these with a real store, a real connection
//! manager and a real event bus; `testing` provides in-memory stand-ins.

use async_trait::async_trait;

use blobsync_util::error::Result;

use crate::value::{BlobKey, BlobWrite, StoreError};
use crate::wire::{GetRequest, GetResponse, MetadataRequest, MetadataResponse};

/// Whether a connection to a peer must be negotiated over TLS. Decided by
/// [`blobsync_util::config::Config::ssl_enabled_colos`] against the peer's
/// datacenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
	Plain,
	Ssl,
}

/// A checked-out connection to one remote peer. Exactly one request of each
/// kind is sent per worker iteration for that peer; the connection is
/// returned to the pool (`check_in`) on success or discarded (`destroy`) if
/// anything about the exchange looked wrong.
#[async_trait]
pub trait Connection: Send {
	async fn send_metadata_request(&mut self, request: MetadataRequest) -> Result<MetadataResponse>;
	async fn send_get_request(&mut self, request: GetRequest) -> Result<GetResponse>;
}

/// Checkout/check-in/destroy connection lifecycle to remote peers. Every
/// successful `check_out` must be followed by exactly one of `check_in` or
/// `destroy`.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
	type Connection: Connection;

	async fn check_out(
		&self,
		host: &str,
		port: u16,
		kind: ConnectionKind,
		timeout: std::time::Duration,
	) -> Result<Self::Connection>;

	fn check_in(&self, connection: Self::Connection);
	fn destroy(&self, connection: Self::Connection);
}

/// The local blob store this worker is replicating into. A production
/// implementation is content-addressed and durable; `put`/`delete` are
/// expected to be idempotent under re-delivery of the same key.
#[async_trait]
pub trait LocalStore: Send + Sync {
	/// Of the given keys, return those this store does not yet have.
	async fn find_missing_keys(&self, keys: &[BlobKey]) -> Result<std::collections::HashSet<BlobKey>>;

	/// Durably write the given blobs. Returns `StoreError::AlreadyExists` if
	/// the store already has every key in the batch, which the writer
	/// treats as a harmless race rather than a failure.
	async fn put(&self, blobs: Vec<BlobWrite>) -> std::result::Result<(), StoreError>;

	/// Mark the given keys as tombstoned. Idempotent.
	async fn delete(&self, keys: Vec<BlobKey>) -> std::result::Result<(), StoreError>;

	/// Whether this key is already tombstoned locally.
	async fn is_key_deleted(&self, key: &BlobKey) -> Result<bool>;
}

/// Told about blobs as they cross the wire, for whatever out-of-band
/// bookkeeping a deployment wants (cache invalidation, audit log, ...). Calls
/// are fire-and-forget: failures here never affect replication progress.
pub trait NotificationSink: Send + Sync {
	fn on_blob_replica_created(&self, host: &str, port: u16, key: &BlobKey);
	fn on_blob_replica_deleted(&self, host: &str, port: u16, key: &BlobKey);
}

/// A sink that does nothing, for deployments that don't need one.
pub struct NoopNotificationSink;

impl NotificationSink for NoopNotificationSink {
	fn on_blob_replica_created(&self, _host: &str, _port: u16, _key: &BlobKey) {}
	fn on_blob_replica_deleted(&self, _host: &str, _port: u16, _key: &BlobKey) {}
}
