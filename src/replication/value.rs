//! Core value types shared across the replication pipeline: blob identity,
//! partition/replica/node identity, the opaque progress token, and the
//! outcome of a single metadata-exchange slot.

use std::collections::HashSet;

use bytes::Bytes;

/// Identifies a shard of the key space. Opaque to everything except the
/// (out-of-scope) cluster map that assigned it.
pub type PartitionId = u64;

/// Identity of a remote node, as handed to us by whatever assembled this
/// worker's peer list. Two nodes in the same datacenter are "intra-colo"
/// peers; anything else is "cross-colo".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeId {
	pub host: String,
	pub port: u16,
	pub datacenter: String,
}

/// Identity of one remote replica of one partition, reachable at one node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReplicaId {
	pub partition: PartitionId,
	pub node: NodeId,
}

/// Identity of a blob, scoped to the partition it lives in. The byte payload
/// is opaque (typically a content hash); only equality and the partition it
/// belongs to matter to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobKey {
	partition: PartitionId,
	id: Bytes,
}

impl BlobKey {
	pub fn new(partition: PartitionId, id: impl Into<Bytes>) -> Self {
		BlobKey {
			partition,
			id: id.into(),
		}
	}

	pub fn partition(&self) -> PartitionId {
		self.partition
	}

	pub fn id(&self) -> &Bytes {
		&self.id
	}
}

/// Opaque progress marker for one (local replica, remote replica) pair. The
/// bytes are never inspected by this crate; they are round-tripped verbatim
/// between the remote peer's metadata responses and the next request sent to
/// that same peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindToken(Bytes);

impl FindToken {
	pub fn new(bytes: impl Into<Bytes>) -> Self {
		FindToken(bytes.into())
	}

	pub fn as_bytes(&self) -> &Bytes {
		&self.0
	}
}

/// One entry in a remote peer's metadata response: everything the reconciler
/// needs to know about a blob the peer holds, without fetching its bytes.
#[derive(Debug, Clone)]
pub struct MessageInfo {
	pub key: BlobKey,
	pub size: u64,
	pub is_deleted: bool,
	pub is_expired: bool,
}

/// Error codes a remote peer can report per-replica or per-request. Kept
/// deliberately small: this crate only branches on whether a response is
/// usable, not on the full taxonomy a production wire protocol would carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorCode {
	NoError,
	PartitionUnknown,
	ReplicaUnavailable,
	IoError,
	Unknown,
}

/// What the local store reported back from a write attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
	/// The blob (by key) is already present. Writes are idempotent by
	/// content address, so this is not treated as a failure by the writer.
	AlreadyExists,
	Other(String),
}

impl std::fmt::Display for StoreError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			StoreError::AlreadyExists => write!(f, "blob already exists"),
			StoreError::Other(msg) => write!(f, "{}", msg),
		}
	}
}

/// A blob ready to be durably written: its identity, its flags as reported
/// by the peer that sent it, and its payload.
#[derive(Debug, Clone)]
pub struct BlobWrite {
	pub key: BlobKey,
	pub size: u64,
	pub is_deleted: bool,
	pub is_expired: bool,
	pub data: Bytes,
}

/// The per-replica outcome of one metadata-exchange slot: either the set of
/// keys the local store is missing plus the token to advance to once they
/// are durably written, or an error code reported by the peer for that
/// replica.
#[derive(Debug, Clone)]
pub enum ExchangeMetadataResult {
	Ok {
		missing_keys: HashSet<BlobKey>,
		new_token: FindToken,
	},
	Err(ServerErrorCode),
}

impl ExchangeMetadataResult {
	pub fn is_ok(&self) -> bool {
		matches!(self, ExchangeMetadataResult::Ok { .. })
	}
}
