//! Reconciles one peer's metadata against the local store: decides which
//! keys are actually missing (tombstones and expired blobs never need
//! fetching), and applies deletes the peer has already recorded.

use std::collections::HashSet;

use blobsync_util::error::{Error, Result};

use crate::contracts::NotificationSink;
use crate::metrics::ReplicationMetrics;
use crate::state::RemoteReplicaState;
use crate::value::{BlobKey, MessageInfo};

pub struct Reconciler;

impl Reconciler {
	pub async fn reconcile(
		state: &RemoteReplicaState,
		messages: &[MessageInfo],
		sink: &dyn NotificationSink,
		metrics: &ReplicationMetrics,
	) -> Result<HashSet<BlobKey>> {
		for message in messages {
			if message.key.partition() != state.local_replica_id.partition {
				return Err(Error::unexpected(format!(
					"message for partition {} in a response for partition {}",
					message.key.partition(),
					state.local_replica_id.partition
				)));
			}
		}

		let keys: Vec<BlobKey> = messages.iter().map(|m| m.key.clone()).collect();
		let mut missing = state.local_store.find_missing_keys(&keys).await?;

		for message in messages {
			if missing.contains(&message.key) {
				if message.is_deleted {
					// Never fetch a blob only to find out it's tombstoned.
					missing.remove(&message.key);
					Self::notify_delete(state, sink, &message.key);
				} else if message.is_expired {
					// Dropping an expired blob from the missing set is not
					// the same as deleting it: no tombstone is recorded, we
					// simply decline to replicate something whose lifetime
					// has already ended.
					missing.remove(&message.key);
				}
				continue;
			}

			if message.is_deleted {
				Self::apply_delete(state, sink, metrics, &message.key).await;
			}
		}

		Ok(missing)
	}

	async fn apply_delete(
		state: &RemoteReplicaState,
		sink: &dyn NotificationSink,
		metrics: &ReplicationMetrics,
		key: &BlobKey,
	) {
		match state.local_store.is_key_deleted(key).await {
			Ok(true) => {}
			Ok(false) => match state.local_store.delete(vec![key.clone()]).await {
				Ok(()) => {
					crate::metrics::count(&metrics.deletes_replicated, 1);
					Self::notify_delete(state, sink, key);
				}
				Err(e) => {
					warn!("local delete failed for key in partition {}: {}", state.local_replica_id.partition, e);
					crate::metrics::count(&metrics.store_delete_errors, 1);
				}
			},
			Err(e) => {
				warn!("is_key_deleted lookup failed: {}", e);
			}
		}
	}

	fn notify_delete(state: &RemoteReplicaState, sink: &dyn NotificationSink, key: &BlobKey) {
		sink.on_blob_replica_deleted(&state.remote_replica_id.node.host, state.remote_replica_id.node.port, key);
	}
}
