//! Per-peer replication state: the one mutable thing this crate carries
//! across iterations, namely each remote replica's progress token.

use std::sync::Arc;

use crate::contracts::LocalStore;
use crate::value::{FindToken, ReplicaId};

/// Everything the worker knows about one (local replica, remote replica)
/// pair. The token field is private: it only ever advances through
/// [`RemoteReplicaState::advance_token`], called exclusively by
/// [`crate::worker::Worker`] after a write (or an empty-missing-set
/// metadata exchange) has durably committed.
pub struct RemoteReplicaState {
	pub remote_replica_id: ReplicaId,
	pub local_replica_id: ReplicaId,
	/// Filesystem path (or other storage-local identifier) of the local
	/// replica, handed to the remote peer in every metadata request so it can
	/// be echoed back in logs/diagnostics on that side. Opaque to this crate;
	/// assigned by whatever assembled this worker's peer list.
	pub local_replica_path: String,
	pub local_store: Arc<dyn LocalStore>,
	token: FindToken,
}

impl RemoteReplicaState {
	pub fn new(
		local_replica_id: ReplicaId,
		remote_replica_id: ReplicaId,
		local_replica_path: impl Into<String>,
		local_store: Arc<dyn LocalStore>,
		initial_token: FindToken,
	) -> Self {
		RemoteReplicaState {
			remote_replica_id,
			local_replica_id,
			local_replica_path: local_replica_path.into(),
			local_store,
			token: initial_token,
		}
	}

	pub fn token(&self) -> &FindToken {
		&self.token
	}

	pub(crate) fn advance_token(&mut self, new_token: FindToken) {
		self.token = new_token;
	}
}

/// All the [`RemoteReplicaState`]s reachable at one remote node, processed
/// together under a single checked-out connection.
pub struct PeerBatch {
	pub peer: crate::value::NodeId,
	pub replicas: Vec<RemoteReplicaState>,
}
