//! Request/response shapes exchanged with a remote peer. Encoding these to
//! and from bytes on an actual socket is the wire codec's job, which is out
//! of scope here (see [`crate::contracts::Connection`]); this module only
//! fixes the Rust-level shape both sides agree on.

use bytes::Bytes;

use crate::value::{BlobKey, FindToken, MessageInfo, PartitionId, ServerErrorCode};

/// One slot of a [`MetadataRequest`]: "tell me what you have for this
/// partition past this token". `requester_host`/`requester_replica_path`
/// identify the local replica making the request, so the remote side can log
/// or route against it; this crate never inspects them after sending.
#[derive(Debug, Clone)]
pub struct MetadataRequestInfo {
	pub partition: PartitionId,
	pub token: FindToken,
	pub requester_host: String,
	pub requester_replica_path: String,
}

#[derive(Debug, Clone)]
pub struct MetadataRequest {
	pub correlation_id: u64,
	pub client_id: String,
	pub max_total_size_in_bytes: u64,
	pub infos: Vec<MetadataRequestInfo>,
}

/// One slot of a [`MetadataResponse`], aligned positionally with the request
/// slot it answers.
#[derive(Debug, Clone)]
pub struct PerReplicaMetadataResponse {
	pub error: ServerErrorCode,
	pub messages: Vec<MessageInfo>,
	pub new_token: Option<FindToken>,
	pub remote_replica_lag_in_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct MetadataResponse {
	pub error: ServerErrorCode,
	pub replicas: Vec<PerReplicaMetadataResponse>,
}

#[derive(Debug, Clone)]
pub struct PartitionRequestInfo {
	pub partition: PartitionId,
	pub keys: Vec<BlobKey>,
}

/// Message-format flags for a [`GetRequest`] (spec §4.4: "full-message;
/// include deletes; include expired"). Replication always asks for the full
/// blob, including tombstoned and expired entries — whether to keep what
/// comes back is the local store's decision on write, not the requester's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GetFlags {
	pub full_message: bool,
	pub include_deletes: bool,
	pub include_expired: bool,
}

impl Default for GetFlags {
	fn default() -> Self {
		GetFlags {
			full_message: true,
			include_deletes: true,
			include_expired: true,
		}
	}
}

/// Request-level options, reserved for future per-request tuning. Spec §6
/// lists this slot as `options (None)`: replication never sets anything here
/// today, but the shape is part of the wire contract.
#[derive(Debug, Clone, Default)]
pub struct GetOptions;

#[derive(Debug, Clone)]
pub struct GetRequest {
	pub correlation_id: u64,
	pub client_id: String,
	pub flags: GetFlags,
	pub partitions: Vec<PartitionRequestInfo>,
	pub options: Option<GetOptions>,
}

/// One message as it comes off the wire inside a get-response stream. In a
/// real wire codec, `corrupt` would be the result of a checksum failure
/// during framing; here it is simply a flag a test harness can set to
/// exercise [`crate::writer`]'s stream-validation path.
#[derive(Debug, Clone)]
pub struct RawMessage {
	pub info: MessageInfo,
	pub data: Bytes,
	pub corrupt: bool,
}

#[derive(Debug, Clone, Default)]
pub struct BlobStream(pub Vec<RawMessage>);

#[derive(Debug, Clone)]
pub struct PartitionResponseInfo {
	pub partition: PartitionId,
	pub error: ServerErrorCode,
	pub stream: BlobStream,
}

#[derive(Debug, Clone)]
pub struct GetResponse {
	pub error: ServerErrorCode,
	/// Partitions that were requested and had something to send, in request
	/// order. A partition whose missing set turned out empty by the time the
	/// peer serviced the request is simply absent here.
	pub partitions: Vec<PartitionResponseInfo>,
}
