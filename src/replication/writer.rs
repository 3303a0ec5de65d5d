//! Phase 3 of a peer iteration: apply the fetched blobs to the local store
//! and advance progress tokens. A replica whose missing set was empty still
//! advances its token here, on the (by-construction) empty write; a replica
//! whose write genuinely failed does not.

use blobsync_util::error::{Error, Result};

use crate::contracts::NotificationSink;
use crate::metrics::ReplicationMetrics;
use crate::state::PeerBatch;
use crate::value::{BlobWrite, ExchangeMetadataResult, StoreError};
use crate::wire::{BlobStream, GetResponse};

pub struct Writer<'a> {
	pub validate_message_stream: bool,
	pub sink: &'a dyn NotificationSink,
	pub metrics: &'a ReplicationMetrics,
}

impl<'a> Writer<'a> {
	pub async fn write(&self, batch: &mut PeerBatch, results: &[ExchangeMetadataResult], response: Option<GetResponse>) -> Result<()> {
		let mut partitions = response.map(|r| r.partitions.into_iter()).unwrap_or_default();

		for (state, result) in batch.replicas.iter_mut().zip(results.iter()) {
			let (missing_keys, new_token) = match result {
				ExchangeMetadataResult::Ok { missing_keys, new_token } => (missing_keys, new_token),
				ExchangeMetadataResult::Err(_) => continue,
			};

			if missing_keys.is_empty() {
				state.advance_token(new_token.clone());
				continue;
			}

			let payload = match partitions.next() {
				Some(p) => p,
				None => {
					warn!(
						"no get-response payload for partition {} despite a non-empty missing set",
						state.local_replica_id.partition
					);
					continue;
				}
			};

			if payload.partition != state.local_replica_id.partition {
				return Err(Error::unexpected(format!(
					"get response partition {} out of order, expected {}",
					payload.partition, state.local_replica_id.partition
				)));
			}

			if payload.error != crate::value::ServerErrorCode::NoError {
				crate::metrics::count(&self.metrics.get_errors, 1);
				continue;
			}

			let writes = self.frames_to_write(payload.stream);

			if writes.is_empty() {
				// Either the peer genuinely had nothing left to send, or
				// (with validation on) every frame in the stream was
				// malformed. Either way there's nothing to commit, but the
				// peer did answer for this partition, so the pull still
				// made progress: advance the token.
				state.advance_token(new_token.clone());
				continue;
			}

			match state.local_store.put(writes.clone()).await {
				Ok(()) | Err(StoreError::AlreadyExists) => {
					crate::metrics::count(&self.metrics.blobs_fixed, writes.len() as u64);
					let total_bytes: u64 = writes.iter().map(|w| w.size).sum();
					crate::metrics::count(&self.metrics.bytes_fixed, total_bytes);
					for write in &writes {
						self.sink.on_blob_replica_created(
							&state.remote_replica_id.node.host,
							state.remote_replica_id.node.port,
							&write.key,
						);
					}
					state.advance_token(new_token.clone());
				}
				Err(StoreError::Other(e)) => {
					error!(
						"store write failed for partition {}: {}",
						state.local_replica_id.partition, e
					);
					crate::metrics::count(&self.metrics.store_put_errors, 1);
				}
			}
		}

		Ok(())
	}

	fn frames_to_write(&self, stream: BlobStream) -> Vec<BlobWrite> {
		if self.validate_message_stream {
			let mut invalid = 0u64;
			let writes = stream
				.0
				.into_iter()
				.filter_map(|frame| {
					if frame.corrupt {
						invalid += 1;
						None
					} else {
						Some(raw_to_write(frame))
					}
				})
				.collect();
			if invalid > 0 {
				crate::metrics::count(&self.metrics.invalid_messages, invalid);
			}
			writes
		} else {
			stream.0.into_iter().map(raw_to_write).collect()
		}
	}
}

fn raw_to_write(frame: crate::wire::RawMessage) -> BlobWrite {
	BlobWrite {
		key: frame.info.key,
		size: frame.info.size,
		is_deleted: frame.info.is_deleted,
		is_expired: frame.info.is_expired,
		data: frame.data,
	}
}
