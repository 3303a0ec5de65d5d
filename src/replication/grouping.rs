//! Groups the flat list of remote replicas a worker is responsible for into
//! per-peer batches, and hands out a freshly shuffled processing order each
//! pass — mirroring `garage_table::sync::SyncWorker::add_full_sync`'s
//! `partitions.shuffle(&mut thread_rng())`, which exists for the same
//! reason: don't let one unlucky ordering starve the same peer every time a
//! worker has to truncate its pass early.

use rand::seq::SliceRandom;
use rand::thread_rng;

use crate::state::{PeerBatch, RemoteReplicaState};
use crate::value::NodeId;

pub struct PeerGrouping {
	batches: Vec<PeerBatch>,
}

impl PeerGrouping {
	pub fn new(replicas: Vec<RemoteReplicaState>) -> Self {
		let mut batches: Vec<PeerBatch> = Vec::new();
		'replicas: for replica in replicas {
			let node = replica.remote_replica_id.node.clone();
			for batch in batches.iter_mut() {
				if batch.peer == node {
					batch.replicas.push(replica);
					continue 'replicas;
				}
			}
			batches.push(PeerBatch {
				peer: node,
				replicas: vec![replica],
			});
		}
		PeerGrouping { batches }
	}

	pub fn len(&self) -> usize {
		self.batches.len()
	}

	pub fn is_empty(&self) -> bool {
		self.batches.is_empty()
	}

	/// A freshly shuffled permutation of batch indices, to be processed in
	/// order this pass.
	pub fn shuffled_order(&self) -> Vec<usize> {
		let mut order: Vec<usize> = (0..self.batches.len()).collect();
		order.shuffle(&mut thread_rng());
		order
	}

	pub fn batch_mut(&mut self, index: usize) -> &mut PeerBatch {
		&mut self.batches[index]
	}

	#[cfg(test)]
	pub fn peers(&self) -> Vec<&NodeId> {
		self.batches.iter().map(|b| &b.peer).collect()
	}
}
