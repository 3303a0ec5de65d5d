//! Pull-based anti-entropy replication between a local replica and a set of
//! remote peer replicas of the same sharded, immutable-blob store.
//!
//! The pipeline for a single peer, driven once per pass by [`worker::Worker`],
//! mirrors `garage_table::sync::TableSyncer::do_sync_with` in shape even
//! though the reconciliation rule itself (tombstone/expiry-aware, token-based
//! rather than Merkle-tree-based) is different: exchange metadata, reconcile
//! against the local store, fetch what's missing, write it down.

#[macro_use]
extern crate tracing;

pub mod contracts;
pub mod exchanger;
pub mod fetcher;
pub mod grouping;
pub mod metrics;
pub mod pacer;
pub mod reconciler;
pub mod state;
pub mod value;
pub mod wire;
pub mod worker;
pub mod writer;

pub mod testing;

pub use blobsync_util::error::{Error, Result};
