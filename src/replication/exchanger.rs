//! Phase 1 of a peer iteration: ask the peer what it has for every replica
//! in this batch, reconcile each answer against the local store, and decide
//! what's still missing.

use blobsync_util::error::{Error, Result};
use blobsync_util::ids::CorrelationIdGenerator;

use crate::contracts::{Connection, NotificationSink};
use crate::metrics::ReplicationMetrics;
use crate::pacer::Pacer;
use crate::reconciler::Reconciler;
use crate::state::PeerBatch;
use crate::value::{ExchangeMetadataResult, ServerErrorCode};
use crate::wire::{MetadataRequest, MetadataRequestInfo};

pub struct MetadataExchanger<'a> {
	pub client_id: &'a str,
	/// This worker's own host, sent as `requester_host` on every slot so the
	/// remote peer can identify who's asking.
	pub local_host: &'a str,
	pub fetch_size_in_bytes: u64,
	pub max_lag_for_wait_in_bytes: u64,
	pub pacer_wait_time: std::time::Duration,
	pub sink: &'a dyn NotificationSink,
	pub metrics: &'a ReplicationMetrics,
}

impl<'a> MetadataExchanger<'a> {
	pub async fn exchange<C: Connection>(
		&self,
		connection: &mut C,
		batch: &mut PeerBatch,
		remote_colo: bool,
		correlation_ids: &CorrelationIdGenerator,
	) -> Result<Vec<ExchangeMetadataResult>> {
		let infos = batch
			.replicas
			.iter()
			.map(|r| MetadataRequestInfo {
				partition: r.local_replica_id.partition,
				token: r.token().clone(),
				requester_host: self.local_host.to_string(),
				requester_replica_path: r.local_replica_path.clone(),
			})
			.collect();

		let request = MetadataRequest {
			correlation_id: correlation_ids.next(),
			client_id: self.client_id.to_string(),
			max_total_size_in_bytes: self.fetch_size_in_bytes,
			infos,
		};

		let response = connection.send_metadata_request(request).await?;
		if response.error != ServerErrorCode::NoError {
			return Err(Error::unexpected(format!("metadata request failed: {:?}", response.error)));
		}
		if response.replicas.len() != batch.replicas.len() {
			return Err(Error::unexpected(format!(
				"metadata response has {} replicas, expected {}",
				response.replicas.len(),
				batch.replicas.len()
			)));
		}

		let mut pacer = Pacer::new(self.max_lag_for_wait_in_bytes, self.pacer_wait_time);
		let mut results = Vec::with_capacity(batch.replicas.len());

		for (state, slot) in batch.replicas.iter().zip(response.replicas.into_iter()) {
			if slot.error != ServerErrorCode::NoError {
				results.push(ExchangeMetadataResult::Err(slot.error));
				continue;
			}

			pacer.maybe_sleep(remote_colo, slot.remote_replica_lag_in_bytes).await;

			match Reconciler::reconcile(state, &slot.messages, self.sink, self.metrics).await {
				Ok(missing_keys) => {
					let new_token = slot.new_token.unwrap_or_else(|| state.token().clone());
					results.push(ExchangeMetadataResult::Ok { missing_keys, new_token });
				}
				Err(e) => {
					warn!(
						"reconciliation failed for partition {}: {}",
						state.local_replica_id.partition, e
					);
					results.push(ExchangeMetadataResult::Err(ServerErrorCode::Unknown));
				}
			}
		}

		Ok(results)
	}
}
