use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use blobsync_util::error::Result;

use crate::contracts::LocalStore;
use crate::value::{BlobKey, BlobWrite, StoreError};

struct StoredBlob {
	data: Bytes,
	is_deleted: bool,
}

/// A content-addressed in-memory store. Writes are idempotent: re-putting a
/// key that's already present is a no-op, matching the real store's
/// behavior under retried delivery.
#[derive(Default)]
pub struct InMemoryStore {
	blobs: Mutex<HashMap<BlobKey, StoredBlob>>,
}

impl InMemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn contains(&self, key: &BlobKey) -> bool {
		self.blobs.lock().await.contains_key(key)
	}

	pub async fn data(&self, key: &BlobKey) -> Option<Bytes> {
		self.blobs.lock().await.get(key).map(|b| b.data.clone())
	}
}

#[async_trait]
impl LocalStore for InMemoryStore {
	async fn find_missing_keys(&self, keys: &[BlobKey]) -> Result<HashSet<BlobKey>> {
		let blobs = self.blobs.lock().await;
		Ok(keys.iter().filter(|k| !blobs.contains_key(k)).cloned().collect())
	}

	async fn put(&self, writes: Vec<BlobWrite>) -> std::result::Result<(), StoreError> {
		let mut blobs = self.blobs.lock().await;
		let already_has_all = writes.iter().all(|w| blobs.contains_key(&w.key));
		if already_has_all && !writes.is_empty() {
			return Err(StoreError::AlreadyExists);
		}
		for write in writes {
			blobs.entry(write.key).or_insert(StoredBlob {
				data: write.data,
				is_deleted: write.is_deleted,
			});
		}
		Ok(())
	}

	async fn delete(&self, keys: Vec<BlobKey>) -> std::result::Result<(), StoreError> {
		let mut blobs = self.blobs.lock().await;
		for key in keys {
			blobs
				.entry(key)
				.and_modify(|b| b.is_deleted = true)
				.or_insert(StoredBlob {
					data: Bytes::new(),
					is_deleted: true,
				});
		}
		Ok(())
	}

	async fn is_key_deleted(&self, key: &BlobKey) -> Result<bool> {
		Ok(self.blobs.lock().await.get(key).map(|b| b.is_deleted).unwrap_or(false))
	}
}
