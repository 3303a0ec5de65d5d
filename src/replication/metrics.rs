//! Replication metrics, built the way `garage_block::block::metrics` and
//! `garage_table::metrics` build theirs: a struct of `opentelemetry`
//! instruments, all created off one named meter.

use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry::{global, KeyValue};

pub struct ReplicationMetrics {
	pub blobs_fixed: Counter<u64>,
	pub bytes_fixed: Counter<u64>,
	pub deletes_replicated: Counter<u64>,

	pub checkout_errors: Counter<u64>,
	/// Iterations aborted by phase, tagged with a `phase` attribute
	/// (`checkout` / `exchange` / `fetch` / `write`) so a dashboard can tell
	/// which stage of the pipeline is actually failing.
	pub iteration_errors: Counter<u64>,
	pub get_errors: Counter<u64>,
	pub store_put_errors: Counter<u64>,
	pub store_delete_errors: Counter<u64>,
	pub invalid_messages: Counter<u64>,

	pub checkout_duration: Histogram<f64>,
	pub exchange_duration: Histogram<f64>,
	pub fetch_duration: Histogram<f64>,
	pub write_duration: Histogram<f64>,
	pub intra_colo_iteration_duration: Histogram<f64>,
	pub inter_colo_iteration_duration: Histogram<f64>,
}

impl ReplicationMetrics {
	pub fn new() -> Self {
		let meter = global::meter("blobsync_replication");

		Self {
			blobs_fixed: meter
				.u64_counter("replication.blobs_fixed")
				.with_description("Number of blobs written to the local store to repair a replica gap")
				.init(),
			bytes_fixed: meter
				.u64_counter("replication.bytes_fixed")
				.with_description("Number of bytes written to the local store to repair a replica gap")
				.init(),
			deletes_replicated: meter
				.u64_counter("replication.deletes_replicated")
				.with_description("Number of tombstones applied locally in response to a peer's delete")
				.init(),
			checkout_errors: meter
				.u64_counter("replication.checkout_errors")
				.with_description("Number of connection checkout failures, per peer iteration")
				.init(),
			iteration_errors: meter
				.u64_counter("replication.iteration_errors")
				.with_description("Number of peer iterations aborted by a protocol or transport error")
				.init(),
			get_errors: meter
				.u64_counter("replication.get_errors")
				.with_description("Number of get-response partitions reported as failed by a peer")
				.init(),
			store_put_errors: meter
				.u64_counter("replication.store_put_errors")
				.with_description("Number of local store write failures")
				.init(),
			store_delete_errors: meter
				.u64_counter("replication.store_delete_errors")
				.with_description("Number of local store delete failures")
				.init(),
			invalid_messages: meter
				.u64_counter("replication.invalid_messages")
				.with_description("Number of malformed messages discarded by the stream sieve")
				.init(),
			checkout_duration: meter
				.f64_histogram("replication.checkout_duration")
				.with_description("Time spent checking out a connection to a peer, in seconds")
				.init(),
			exchange_duration: meter
				.f64_histogram("replication.exchange_duration")
				.with_description("Time spent in the metadata-exchange phase of a peer iteration, in seconds")
				.init(),
			fetch_duration: meter
				.f64_histogram("replication.fetch_duration")
				.with_description("Time spent fetching missing blobs from a peer, in seconds")
				.init(),
			write_duration: meter
				.f64_histogram("replication.write_duration")
				.with_description("Time spent writing fetched blobs to the local store, in seconds")
				.init(),
			intra_colo_iteration_duration: meter
				.f64_histogram("replication.intra_colo_iteration_duration")
				.with_description("Total time of one peer iteration against an intra-colo peer, in seconds")
				.init(),
			inter_colo_iteration_duration: meter
				.f64_histogram("replication.inter_colo_iteration_duration")
				.with_description("Total time of one peer iteration against a cross-colo peer, in seconds")
				.init(),
		}
	}

	pub(crate) fn record_iteration(&self, remote_colo: bool, elapsed: std::time::Duration) {
		let ctx = opentelemetry::Context::current();
		let histogram = if remote_colo {
			&self.inter_colo_iteration_duration
		} else {
			&self.intra_colo_iteration_duration
		};
		histogram.record(&ctx, elapsed.as_secs_f64(), &[]);
	}
}

impl Default for ReplicationMetrics {
	fn default() -> Self {
		Self::new()
	}
}

pub(crate) fn count(counter: &Counter<u64>, n: u64) {
	counter.add(&opentelemetry::Context::current(), n, &[] as &[KeyValue]);
}

/// Same as [`count`], but tagged with the pipeline phase the failure
/// occurred in (see `worker::Phase`), so `iteration_errors` can be broken
/// down by `checkout` / `exchange` / `fetch` / `write` on a dashboard.
pub(crate) fn count_phase(counter: &Counter<u64>, n: u64, phase: &'static str) {
	counter.add(&opentelemetry::Context::current(), n, &[KeyValue::new("phase", phase)]);
}
