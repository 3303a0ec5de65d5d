//! The long-running replication loop: shuffle the peer list, pull from each
//! peer in turn, repeat forever until asked to stop. One [`Worker`] owns
//! exactly the peers it was built with; peer (re)assignment across workers
//! is somebody else's job.

use std::sync::Arc;
use std::time::Instant;

use blobsync_util::background::{RunningFlag, ShutdownSignal, ShutdownTrigger};
use blobsync_util::config::Config;
use blobsync_util::ids::CorrelationIdGenerator;
use blobsync_util::metrics::RecordDuration;

use crate::contracts::{ConnectionKind, ConnectionPool, NotificationSink};
use crate::exchanger::MetadataExchanger;
use crate::fetcher::Fetcher;
use crate::grouping::PeerGrouping;
use crate::metrics::ReplicationMetrics;
use crate::state::RemoteReplicaState;
use crate::value::NodeId;
use crate::writer::Writer;

/// Which stage of a peer iteration an error was observed in (spec §4.1 point
/// 4: "record the phase in which the failure occurred"). Threaded through to
/// both the log line and the `iteration_errors` counter's `phase` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Checkout,
	Exchange,
	Fetch,
	Write,
}

impl Phase {
	fn as_str(self) -> &'static str {
		match self {
			Phase::Checkout => "checkout",
			Phase::Exchange => "exchange",
			Phase::Fetch => "fetch",
			Phase::Write => "write",
		}
	}
}

impl std::fmt::Display for Phase {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Drives pull-based anti-entropy against every peer this worker was handed,
/// one pass after another, until [`WorkerHandle::shutdown`] is called.
pub struct Worker<P: ConnectionPool> {
	local_node: NodeId,
	client_id: String,
	config: Arc<Config>,
	metrics: Arc<ReplicationMetrics>,
	pool: Arc<P>,
	sink: Arc<dyn NotificationSink>,
	correlation_ids: CorrelationIdGenerator,
	grouping: PeerGrouping,
	shutdown: ShutdownSignal,
	running: RunningFlag,
	done: Option<tokio::sync::oneshot::Sender<()>>,
}

/// The other half of a [`Worker`]: lets whoever spawned `run()` on a task
/// stop it and ask whether it's still going, without owning the worker
/// itself.
pub struct WorkerHandle {
	trigger: ShutdownTrigger,
	running: RunningFlag,
	done: tokio::sync::Mutex<Option<tokio::sync::oneshot::Receiver<()>>>,
}

impl WorkerHandle {
	pub fn is_running(&self) -> bool {
		self.running.get()
	}

	/// Requests a stop and waits for the current pass to reach its next
	/// iteration boundary and exit. Safe to call more than once.
	pub async fn shutdown(&self) {
		self.trigger.trigger();
		let mut done = self.done.lock().await;
		if let Some(rx) = done.take() {
			let _ = rx.await;
		}
	}
}

impl<P: ConnectionPool> Worker<P> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		local_node: NodeId,
		client_id: String,
		config: Arc<Config>,
		metrics: Arc<ReplicationMetrics>,
		pool: Arc<P>,
		sink: Arc<dyn NotificationSink>,
		replicas: Vec<RemoteReplicaState>,
	) -> (Self, WorkerHandle) {
		let (trigger, shutdown) = ShutdownTrigger::new();
		let running = RunningFlag::new();
		let (done_tx, done_rx) = tokio::sync::oneshot::channel();

		let worker = Worker {
			local_node,
			client_id,
			config,
			metrics,
			pool,
			sink,
			correlation_ids: CorrelationIdGenerator::new(),
			grouping: PeerGrouping::new(replicas),
			shutdown,
			running: running.clone(),
			done: Some(done_tx),
		};
		let handle = WorkerHandle {
			trigger,
			running,
			done: tokio::sync::Mutex::new(Some(done_rx)),
		};
		(worker, handle)
	}

	/// Runs passes until shutdown is signaled. Consumes `self`: this is
	/// meant to be handed to `tokio::spawn`, with [`WorkerHandle`] kept
	/// behind for control.
	pub async fn run(mut self) {
		self.running.set(true);

		while !self.shutdown.is_shutting_down() {
			if self.grouping.is_empty() {
				self.shutdown.wait().await;
				break;
			}

			let order = self.grouping.shuffled_order();
			for index in order {
				if self.shutdown.is_shutting_down() {
					break;
				}
				self.process_peer(index).await;
			}
		}

		self.running.set(false);
		if let Some(done) = self.done.take() {
			let _ = done.send(());
		}
	}

	async fn process_peer(&mut self, index: usize) {
		let peer = self.grouping.batch_mut(index).peer.clone();
		let remote_colo = peer.datacenter != self.local_node.datacenter;
		let kind = if self.config.ssl_enabled_colos.contains(&peer.datacenter) {
			ConnectionKind::Ssl
		} else {
			ConnectionKind::Plain
		};

		let checkout = self
			.pool
			.check_out(&peer.host, peer.port, kind, self.config.checkout_timeout())
			.bound_record_duration(&self.metrics.checkout_duration)
			.await;
		let mut connection = match checkout {
			Ok(c) => c,
			Err(e) => {
				warn!("checkout failed for {}:{}: {}", peer.host, peer.port, e);
				crate::metrics::count(&self.metrics.checkout_errors, 1);
				crate::metrics::count_phase(&self.metrics.iteration_errors, 1, Phase::Checkout.as_str());
				return;
			}
		};

		let iteration_start = Instant::now();
		let outcome = self.run_pipeline(index, &mut connection, remote_colo).await;
		self.metrics.record_iteration(remote_colo, iteration_start.elapsed());

		match outcome {
			Ok(()) => self.pool.check_in(connection),
			Err((phase, e)) => {
				warn!("replication iteration with {}:{} failed in {} phase: {}", peer.host, peer.port, phase, e);
				crate::metrics::count_phase(&self.metrics.iteration_errors, 1, phase.as_str());
				self.pool.destroy(connection);
			}
		}
	}

	async fn run_pipeline(
		&mut self,
		index: usize,
		connection: &mut P::Connection,
		remote_colo: bool,
	) -> Result<(), (Phase, blobsync_util::error::Error)> {
		let batch = self.grouping.batch_mut(index);

		let exchanger = MetadataExchanger {
			client_id: &self.client_id,
			local_host: &self.local_node.host,
			fetch_size_in_bytes: self.config.replication_fetch_size_in_bytes,
			max_lag_for_wait_in_bytes: self.config.replication_max_lag_for_wait_time_in_bytes,
			pacer_wait_time: self.config.pacer_wait_time(),
			sink: self.sink.as_ref(),
			metrics: self.metrics.as_ref(),
		};

		let mut results = exchanger
			.exchange(connection, batch, remote_colo, &self.correlation_ids)
			.bound_record_duration(&self.metrics.exchange_duration)
			.await
			.map_err(|e| (Phase::Exchange, e))?;

		let request = Fetcher::build_request(batch, &results, &self.client_id, &self.correlation_ids);
		let response = if let Some(req) = request {
			let response = Fetcher::fetch(connection, req)
				.bound_record_duration(&self.metrics.fetch_duration)
				.await
				.map_err(|e| (Phase::Fetch, e))?;
			Some(response)
		} else {
			None
		};

		let writer = Writer {
			validate_message_stream: self.config.validate_message_stream,
			sink: self.sink.as_ref(),
			metrics: self.metrics.as_ref(),
		};
		writer
			.write(batch, &mut results, response)
			.bound_record_duration(&self.metrics.write_duration)
			.await
			.map_err(|e| (Phase::Write, e))?;

		Ok(())
	}
}
