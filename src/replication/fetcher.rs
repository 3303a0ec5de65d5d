//! Phase 2 of a peer iteration: turn the exchanger's missing-key sets into a
//! single get request, and send it if there's anything to ask for.

use blobsync_util::error::{Error, Result};
use blobsync_util::ids::CorrelationIdGenerator;

use crate::contracts::Connection;
use crate::state::PeerBatch;
use crate::value::{ExchangeMetadataResult, ServerErrorCode};
use crate::wire::{GetFlags, GetRequest, GetResponse, PartitionRequestInfo};

pub struct Fetcher;

impl Fetcher {
	/// Builds the request for this iteration, or `None` if every replica's
	/// missing set turned out empty (or errored out).
	pub fn build_request(
		batch: &PeerBatch,
		results: &[ExchangeMetadataResult],
		client_id: &str,
		correlation_ids: &CorrelationIdGenerator,
	) -> Option<GetRequest> {
		let mut partitions = Vec::new();
		for (state, result) in batch.replicas.iter().zip(results.iter()) {
			if let ExchangeMetadataResult::Ok { missing_keys, .. } = result {
				if !missing_keys.is_empty() {
					partitions.push(PartitionRequestInfo {
						partition: state.local_replica_id.partition,
						keys: missing_keys.iter().cloned().collect(),
					});
				}
			}
		}

		if partitions.is_empty() {
			return None;
		}

		Some(GetRequest {
			correlation_id: correlation_ids.next(),
			client_id: client_id.to_string(),
			flags: GetFlags::default(),
			partitions,
			options: None,
		})
	}

	pub async fn fetch<C: Connection>(connection: &mut C, request: GetRequest) -> Result<GetResponse> {
		let response = connection.send_get_request(request).await?;
		if response.error != ServerErrorCode::NoError {
			return Err(Error::unexpected(format!("get request failed: {:?}", response.error)));
		}
		Ok(response)
	}
}
