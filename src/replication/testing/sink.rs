use std::sync::Mutex;

use crate::contracts::NotificationSink;
use crate::value::BlobKey;

/// Records every notification it receives, for assertions in tests.
#[derive(Default)]
pub struct CollectingSink {
	created: Mutex<Vec<BlobKey>>,
	deleted: Mutex<Vec<BlobKey>>,
}

impl CollectingSink {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn created(&self) -> Vec<BlobKey> {
		self.created.lock().unwrap().clone()
	}

	pub fn deleted(&self) -> Vec<BlobKey> {
		self.deleted.lock().unwrap().clone()
	}
}

impl NotificationSink for CollectingSink {
	fn on_blob_replica_created(&self, _host: &str, _port: u16, key: &BlobKey) {
		self.created.lock().unwrap().push(key.clone());
	}

	fn on_blob_replica_deleted(&self, _host: &str, _port: u16, key: &BlobKey) {
		self.deleted.lock().unwrap().push(key.clone());
	}
}
