//! Paces intra-colo peers that have caught up, so a worker doesn't hammer a
//! peer that's already near the head of its own log. Cross-colo peers are
//! never paced — the network hop between colos is already the bottleneck.
//!
//! A fresh [`Pacer`] is built for every metadata-exchange call, so at most
//! one slot in that call sleeps: the first intra-colo, under-threshold slot
//! it sees. Every later slot in the same call, however caught-up, passes
//! through free. This is deliberate: the point is to leave a gap before the
//! *next* peer, not to throttle every replica on the current one.

use std::time::Duration;

pub struct Pacer {
	wait_time: Duration,
	max_lag_for_wait: u64,
	need_to_wait: bool,
}

impl Pacer {
	pub fn new(max_lag_for_wait: u64, wait_time: Duration) -> Self {
		Pacer {
			wait_time,
			max_lag_for_wait,
			need_to_wait: true,
		}
	}

	pub async fn maybe_sleep(&mut self, remote_colo: bool, lag_in_bytes: u64) {
		if remote_colo || !self.need_to_wait {
			return;
		}
		if lag_in_bytes >= self.max_lag_for_wait {
			return;
		}
		tokio::time::sleep(self.wait_time).await;
		self.need_to_wait = false;
	}
}
