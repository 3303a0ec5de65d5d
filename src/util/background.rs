//! Cooperative shutdown primitives, built the way `garage`'s server binary
//! builds its own: a `watch::channel<bool>` carries the cancellation flag,
//! observed at loop and iteration boundaries (see `garage::server::wait_from`
//! and `garage_table::sync::TableSyncer`'s `must_exit: watch::Receiver<bool>`
//! plumbing) rather than forcing an abrupt task abort.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

/// Receiving half of a shutdown signal: cheap to clone, observed with
/// `is_shutting_down()` at loop boundaries or awaited with `wait()` when a
/// component has nothing else to do but wait for the end.
#[derive(Clone)]
pub struct ShutdownSignal(watch::Receiver<bool>);

impl ShutdownSignal {
	pub fn is_shutting_down(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves once shutdown has been triggered.
	pub async fn wait(&mut self) {
		while !*self.0.borrow() {
			if self.0.changed().await.is_err() {
				return;
			}
		}
	}
}

/// Sending half: held by whoever orchestrates the process (here, the
/// `Worker`'s own `shutdown()` method).
pub struct ShutdownTrigger(watch::Sender<bool>);

impl ShutdownTrigger {
	pub fn new() -> (ShutdownTrigger, ShutdownSignal) {
		let (send, recv) = watch::channel(false);
		(ShutdownTrigger(send), ShutdownSignal(recv))
	}

	pub fn trigger(&self) {
		// No receivers left just means the worker already exited.
		let _ = self.0.send(true);
	}
}

/// Cheap, `Arc`-shared "is the worker currently inside `run()`" flag, backing
/// `Worker::is_running()`.
#[derive(Clone, Default)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, running: bool) {
		self.0.store(running, Ordering::SeqCst);
	}

	pub fn get(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}
