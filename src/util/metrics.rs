//! Small helper for timing a future into an `opentelemetry` histogram,
//! mirrored from `garage_util::metrics::RecordDuration` (used e.g. in
//! `garage_block::manager::BlockManager::write_block` as
//! `.bound_record_duration(&self.metrics.block_write_duration)`).

use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use opentelemetry::{metrics::Histogram, Context};

#[async_trait]
pub trait RecordDuration: Future + Sized {
	async fn bound_record_duration(self, histogram: &Histogram<f64>) -> Self::Output;
}

#[async_trait]
impl<T> RecordDuration for T
where
	T: Future + Send,
	T::Output: Send,
{
	async fn bound_record_duration(self, histogram: &Histogram<f64>) -> Self::Output {
		let start = Instant::now();
		let ret = self.await;
		histogram.record(&Context::current(), start.elapsed().as_secs_f64(), &[]);
		ret
	}
}
