//! Entry point: parse CLI options, load configuration, build a worker and
//! run it until asked to stop.
//!
//! The cluster map, local store, connection pool and notification sink are
//! deployment-specific and out of scope for this crate (see
//! `blobsync_replication::contracts`); this binary wires the bundled
//! in-memory stand-ins so the process can be exercised end to end without a
//! real cluster attached. A production deployment swaps
//! `blobsync_replication::testing` for real implementations of the same
//! traits.

#[macro_use]
extern crate tracing;

use std::path::PathBuf;
use std::sync::Arc;

use structopt::StructOpt;

use blobsync_replication::contracts::NoopNotificationSink;
use blobsync_replication::metrics::ReplicationMetrics;
use blobsync_replication::testing::ScriptedPool;
use blobsync_replication::value::NodeId;
use blobsync_replication::worker::Worker;
use blobsync_util::config::read_config;
use blobsync_util::error::Error;

#[derive(StructOpt, Debug)]
#[structopt(name = "blobsync")]
struct Opt {
	/// Configuration file.
	#[structopt(short = "c", long = "config", default_value = "./blobsync.toml")]
	config_file: PathBuf,

	/// Hostname of this node, used to classify peers as intra- or
	/// cross-colo.
	#[structopt(long = "node-host", default_value = "localhost")]
	node_host: String,

	/// Datacenter (colo) this node belongs to.
	#[structopt(long = "datacenter", default_value = "default")]
	datacenter: String,
}

#[tokio::main]
async fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let opt = Opt::from_args();

	if let Err(e) = run(opt).await {
		error!("{}", e);
		std::process::exit(1);
	}
}

async fn run(opt: Opt) -> Result<(), Error> {
	info!("Loading configuration...");
	let config = Arc::new(read_config(opt.config_file)?);

	let local_node = NodeId {
		host: opt.node_host,
		port: 0,
		datacenter: opt.datacenter,
	};

	info!("Starting replication worker with no peers configured...");
	let (worker, handle) = Worker::new(
		local_node,
		"blobsync".to_string(),
		config,
		Arc::new(ReplicationMetrics::new()),
		Arc::new(ScriptedPool::new()),
		Arc::new(NoopNotificationSink),
		Vec::new(),
	);

	let run_handle = tokio::spawn(worker.run());

	wait_for_shutdown_signal().await;
	info!("Shutting down...");
	handle.shutdown().await;
	let _ = run_handle.await;

	Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
	use tokio::signal::unix::{signal, SignalKind};

	let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
	let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
	tokio::select! {
		_ = sigint.recv() => info!("Received SIGINT."),
		_ = sigterm.recv() => info!("Received SIGTERM."),
	}
}

#[cfg(windows)]
async fn wait_for_shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
	info!("Received Ctrl-C.");
}
