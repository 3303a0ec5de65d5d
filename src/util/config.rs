//! Replication worker configuration, loaded the way
//! `garage_util::config::read_config` loads Garage's config: a flat TOML
//! file deserialized with `serde`, with `#[serde(default = ...)]` filling in
//! sane defaults for everything that isn't safety-critical to set explicitly.

use std::collections::HashSet;
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Error;

/// All configuration recognized by the replication worker (see spec §6).
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
	/// Byte budget offered to a peer in each metadata request.
	#[serde(default = "default_fetch_size_in_bytes")]
	pub replication_fetch_size_in_bytes: u64,

	/// How long to wait for a connection checkout before giving up on a peer
	/// for this iteration.
	#[serde(default = "default_checkout_timeout_ms")]
	pub replication_connection_pool_checkout_timeout_ms: u64,

	/// Pacer threshold: an intra-colo peer reporting less lag than this (in
	/// bytes) is considered "caught up enough" to warrant a small pacing
	/// delay before moving on.
	#[serde(default = "default_max_lag_for_wait_time_in_bytes")]
	pub replication_max_lag_for_wait_time_in_bytes: u64,

	/// Pacer delay, applied at most once per metadata exchange call.
	#[serde(default = "default_wait_time_between_replicas_ms")]
	pub replica_wait_time_between_replicas_ms: u64,

	/// Datacenters (colos) that require an SSL connection when replicating
	/// to a peer located there.
	#[serde(default)]
	pub ssl_enabled_colos: HashSet<String>,

	/// Whether the Writer should sieve the get-response stream for malformed
	/// messages before writing (see spec §4.5).
	#[serde(default)]
	pub validate_message_stream: bool,
}

impl Config {
	pub fn checkout_timeout(&self) -> Duration {
		Duration::from_millis(self.replication_connection_pool_checkout_timeout_ms)
	}

	pub fn pacer_wait_time(&self) -> Duration {
		Duration::from_millis(self.replica_wait_time_between_replicas_ms)
	}
}

fn default_fetch_size_in_bytes() -> u64 {
	4 * 1024 * 1024
}
fn default_checkout_timeout_ms() -> u64 {
	5_000
}
fn default_max_lag_for_wait_time_in_bytes() -> u64 {
	5 * 1024 * 1024
}
fn default_wait_time_between_replicas_ms() -> u64 {
	1_000
}

/// Read and parse the configuration file.
pub fn read_config(config_file: PathBuf) -> Result<Config, Error> {
	debug!("Reading replication config from {}", config_file.display());

	let mut file = std::fs::OpenOptions::new()
		.read(true)
		.open(config_file.as_path())?;

	let mut config = String::new();
	file.read_to_string(&mut config)?;

	Ok(toml::from_str(&config)?)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn defaults_are_filled_in() {
		let config: Config = toml::from_str("").unwrap();
		assert_eq!(config.replication_fetch_size_in_bytes, 4 * 1024 * 1024);
		assert!(!config.validate_message_stream);
		assert!(config.ssl_enabled_colos.is_empty());
	}

	#[test]
	fn ssl_colos_parse() {
		let config: Config = toml::from_str(
			r#"
            ssl_enabled_colos = ["dc1", "dc2"]
            validate_message_stream = true
            "#,
		)
		.unwrap();
		assert!(config.ssl_enabled_colos.contains("dc1"));
		assert!(config.validate_message_stream);
	}
}
