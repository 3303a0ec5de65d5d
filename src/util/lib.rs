//! Utility crate shared by the blobsync replication worker: error types,
//! configuration loading, the cooperative-shutdown background runner, and
//! metrics helpers. Mirrors the role `garage_util` plays for Garage.

#[macro_use]
extern crate tracing;

pub mod background;
pub mod config;
pub mod error;
pub mod ids;
pub mod metrics;
