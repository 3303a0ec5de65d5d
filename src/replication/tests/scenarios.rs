//! End-to-end pipeline scenarios, pinning the documented behavior of a
//! single peer iteration: exchange metadata, fetch what's missing, write it
//! down, advance (or don't advance) tokens.

use std::sync::Arc;

use blobsync_replication::contracts::LocalStore;
use blobsync_replication::exchanger::MetadataExchanger;
use blobsync_replication::fetcher::Fetcher;
use blobsync_replication::metrics::ReplicationMetrics;
use blobsync_replication::state::{PeerBatch, RemoteReplicaState};
use blobsync_replication::testing::{CollectingSink, InMemoryStore, ScriptedConnection};
use blobsync_replication::value::{
	BlobKey, ExchangeMetadataResult, FindToken, MessageInfo, NodeId, PartitionId, ReplicaId, ServerErrorCode,
};
use blobsync_replication::wire::{
	BlobStream, GetResponse, MetadataResponse, PartitionResponseInfo, PerReplicaMetadataResponse, RawMessage,
};
use bytes::Bytes;

use blobsync_util::ids::CorrelationIdGenerator;

fn node(host: &str) -> NodeId {
	NodeId {
		host: host.to_string(),
		port: 7000,
		datacenter: "dc1".to_string(),
	}
}

fn replica(partition: PartitionId, store: Arc<InMemoryStore>, token: &'static [u8]) -> RemoteReplicaState {
	let local = ReplicaId { partition, node: node("self") };
	let remote = ReplicaId { partition, node: node("peer") };
	RemoteReplicaState::new(local, remote, "/data/replica", store, FindToken::new(token))
}

fn message(key: BlobKey, size: u64, deleted: bool, expired: bool) -> MessageInfo {
	MessageInfo { key, size, is_deleted: deleted, is_expired: expired }
}

async fn run_iteration(
	mut batch: PeerBatch,
	metadata_response: MetadataResponse,
	get_response: Option<GetResponse>,
	validate_message_stream: bool,
) -> (Vec<ExchangeMetadataResult>, PeerBatch, CollectingSink) {
	let sink = CollectingSink::new();
	let metrics = ReplicationMetrics::new();
	let correlation_ids = CorrelationIdGenerator::new();

	let exchanger = MetadataExchanger {
		client_id: "test-client",
		local_host: "self",
		fetch_size_in_bytes: 4 * 1024 * 1024,
		max_lag_for_wait_in_bytes: 1,
		pacer_wait_time: std::time::Duration::from_millis(0),
		sink: &sink,
		metrics: &metrics,
	};

	let mut connection = ScriptedConnection::new().with_metadata_response(metadata_response);
	if let Some(resp) = get_response.clone() {
		connection = connection.with_get_response(resp);
	}

	let results = exchanger
		.exchange(&mut connection, &mut batch, false, &correlation_ids)
		.await
		.expect("exchange should succeed");

	let request = Fetcher::build_request(&batch, &results, "test-client", &correlation_ids);
	let response = if request.is_some() {
		assert!(get_response.is_some(), "a get request was built but no response was scripted");
		Some(Fetcher::fetch(&mut connection, request.unwrap()).await.expect("fetch should succeed"))
	} else {
		None
	};

	let writer = blobsync_replication::writer::Writer {
		validate_message_stream,
		sink: &sink,
		metrics: &metrics,
	};
	writer.write(&mut batch, &results, response).await.expect("write should succeed");

	(results, batch, sink)
}

#[tokio::test]
async fn s1_simple_pull() {
	let store = Arc::new(InMemoryStore::new());
	let key = BlobKey::new(1, Bytes::from_static(b"k1"));
	let batch = PeerBatch { peer: node("peer"), replicas: vec![replica(1, store.clone(), b"t0")] };

	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![PerReplicaMetadataResponse {
			error: ServerErrorCode::NoError,
			messages: vec![message(key.clone(), 100, false, false)],
			new_token: Some(FindToken::new(&b"T1"[..])),
			remote_replica_lag_in_bytes: 0,
		}],
	};
	let get_response = GetResponse {
		error: ServerErrorCode::NoError,
		partitions: vec![PartitionResponseInfo {
			partition: 1,
			error: ServerErrorCode::NoError,
			stream: BlobStream(vec![RawMessage {
				info: message(key.clone(), 100, false, false),
				data: Bytes::from(vec![0u8; 100]),
				corrupt: false,
			}]),
		}],
	};

	let (_, batch, sink) = run_iteration(batch, metadata_response, Some(get_response), false).await;

	assert!(store.contains(&key).await);
	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"T1"[..]));
	assert_eq!(sink.created(), vec![key]);
}

#[tokio::test]
async fn s2_remote_deletion_of_locally_present_key() {
	let store = Arc::new(InMemoryStore::new());
	let key = BlobKey::new(2, Bytes::from_static(b"k2"));
	store
		.put(vec![blobsync_replication::value::BlobWrite {
			key: key.clone(),
			size: 1,
			is_deleted: false,
			is_expired: false,
			data: Bytes::from_static(b"x"),
		}])
		.await
		.unwrap();

	let batch = PeerBatch { peer: node("peer"), replicas: vec![replica(2, store.clone(), b"t0")] };
	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![PerReplicaMetadataResponse {
			error: ServerErrorCode::NoError,
			messages: vec![message(key.clone(), 1, true, false)],
			new_token: Some(FindToken::new(&b"T2"[..])),
			remote_replica_lag_in_bytes: 0,
		}],
	};

	let (_, batch, sink) = run_iteration(batch, metadata_response, None, false).await;

	assert!(store.is_key_deleted(&key).await.unwrap());
	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"T2"[..]));
	assert_eq!(sink.deleted(), vec![key]);
}

#[tokio::test]
async fn s3_missing_and_deleted() {
	let store = Arc::new(InMemoryStore::new());
	let key = BlobKey::new(3, Bytes::from_static(b"k3"));
	let batch = PeerBatch { peer: node("peer"), replicas: vec![replica(3, store.clone(), b"t0")] };

	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![PerReplicaMetadataResponse {
			error: ServerErrorCode::NoError,
			messages: vec![message(key.clone(), 1, true, false)],
			new_token: Some(FindToken::new(&b"T3"[..])),
			remote_replica_lag_in_bytes: 0,
		}],
	};

	let (_, batch, sink) = run_iteration(batch, metadata_response, None, false).await;

	assert!(!store.contains(&key).await);
	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"T3"[..]));
	assert_eq!(sink.deleted(), vec![key]);
}

#[tokio::test]
async fn s4_expired_remote() {
	let store = Arc::new(InMemoryStore::new());
	let key = BlobKey::new(4, Bytes::from_static(b"k4"));
	let batch = PeerBatch { peer: node("peer"), replicas: vec![replica(4, store.clone(), b"t0")] };

	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![PerReplicaMetadataResponse {
			error: ServerErrorCode::NoError,
			messages: vec![message(key.clone(), 1, false, true)],
			new_token: Some(FindToken::new(&b"T4"[..])),
			remote_replica_lag_in_bytes: 0,
		}],
	};

	let (_, batch, sink) = run_iteration(batch, metadata_response, None, false).await;

	assert!(!store.contains(&key).await);
	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"T4"[..]));
	assert!(sink.created().is_empty());
	assert!(sink.deleted().is_empty());
}

#[tokio::test]
async fn s5_per_slot_error_isolation() {
	let store1 = Arc::new(InMemoryStore::new());
	let store2 = Arc::new(InMemoryStore::new());
	let k5 = BlobKey::new(5, Bytes::from_static(b"k5"));

	let batch = PeerBatch {
		peer: node("peer"),
		replicas: vec![replica(5, store1.clone(), b"t0a"), replica(6, store2.clone(), b"t0b")],
	};

	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![
			PerReplicaMetadataResponse {
				error: ServerErrorCode::NoError,
				messages: vec![message(k5.clone(), 10, false, false)],
				new_token: Some(FindToken::new(&b"T5a"[..])),
				remote_replica_lag_in_bytes: 0,
			},
			PerReplicaMetadataResponse {
				error: ServerErrorCode::IoError,
				messages: vec![],
				new_token: None,
				remote_replica_lag_in_bytes: 0,
			},
		],
	};
	let get_response = GetResponse {
		error: ServerErrorCode::NoError,
		partitions: vec![PartitionResponseInfo {
			partition: 5,
			error: ServerErrorCode::NoError,
			stream: BlobStream(vec![RawMessage {
				info: message(k5.clone(), 10, false, false),
				data: Bytes::from(vec![0u8; 10]),
				corrupt: false,
			}]),
		}],
	};

	let sink = CollectingSink::new();
	let metrics = ReplicationMetrics::new();
	let correlation_ids = CorrelationIdGenerator::new();
	let exchanger = MetadataExchanger {
		client_id: "test-client",
		local_host: "self",
		fetch_size_in_bytes: 4 * 1024 * 1024,
		max_lag_for_wait_in_bytes: 1,
		pacer_wait_time: std::time::Duration::from_millis(0),
		sink: &sink,
		metrics: &metrics,
	};
	let mut connection = ScriptedConnection::new()
		.with_metadata_response(metadata_response)
		.with_get_response(get_response);

	let mut batch = batch;
	let results = exchanger
		.exchange(&mut connection, &mut batch, false, &correlation_ids)
		.await
		.expect("exchange should succeed even with one errored slot");

	assert!(results[0].is_ok());
	assert!(!results[1].is_ok());

	let request = Fetcher::build_request(&batch, &results, "test-client", &correlation_ids).unwrap();
	let response = Fetcher::fetch(&mut connection, request).await.unwrap();

	let writer = blobsync_replication::writer::Writer { validate_message_stream: false, sink: &sink, metrics: &metrics };
	writer.write(&mut batch, &results, Some(response)).await.unwrap();

	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"T5a"[..]));
	assert_eq!(batch.replicas[1].token(), &FindToken::new(&b"t0b"[..]));
}

#[tokio::test]
async fn s6_get_error_on_one_partition() {
	let store_p = Arc::new(InMemoryStore::new());
	let store_q = Arc::new(InMemoryStore::new());
	let k6 = BlobKey::new(10, Bytes::from_static(b"k6"));
	let k7 = BlobKey::new(11, Bytes::from_static(b"k7"));

	let mut batch = PeerBatch {
		peer: node("peer"),
		replicas: vec![replica(10, store_p.clone(), b"pold"), replica(11, store_q.clone(), b"qold")],
	};

	let metadata_response = MetadataResponse {
		error: ServerErrorCode::NoError,
		replicas: vec![
			PerReplicaMetadataResponse {
				error: ServerErrorCode::NoError,
				messages: vec![message(k6.clone(), 8, false, false)],
				new_token: Some(FindToken::new(&b"pnew"[..])),
				remote_replica_lag_in_bytes: 0,
			},
			PerReplicaMetadataResponse {
				error: ServerErrorCode::NoError,
				messages: vec![message(k7.clone(), 8, false, false)],
				new_token: Some(FindToken::new(&b"qnew"[..])),
				remote_replica_lag_in_bytes: 0,
			},
		],
	};
	let get_response = GetResponse {
		error: ServerErrorCode::NoError,
		partitions: vec![
			PartitionResponseInfo {
				partition: 10,
				error: ServerErrorCode::NoError,
				stream: BlobStream(vec![RawMessage {
					info: message(k6.clone(), 8, false, false),
					data: Bytes::from(vec![0u8; 8]),
					corrupt: false,
				}]),
			},
			PartitionResponseInfo { partition: 11, error: ServerErrorCode::IoError, stream: BlobStream::default() },
		],
	};

	let sink = CollectingSink::new();
	let metrics = ReplicationMetrics::new();
	let correlation_ids = CorrelationIdGenerator::new();
	let exchanger = MetadataExchanger {
		client_id: "test-client",
		local_host: "self",
		fetch_size_in_bytes: 4 * 1024 * 1024,
		max_lag_for_wait_in_bytes: 1,
		pacer_wait_time: std::time::Duration::from_millis(0),
		sink: &sink,
		metrics: &metrics,
	};
	let mut connection = ScriptedConnection::new()
		.with_metadata_response(metadata_response)
		.with_get_response(get_response);

	let results = exchanger.exchange(&mut connection, &mut batch, false, &correlation_ids).await.unwrap();
	let request = Fetcher::build_request(&batch, &results, "test-client", &correlation_ids).unwrap();
	let response = Fetcher::fetch(&mut connection, request).await.unwrap();

	let writer = blobsync_replication::writer::Writer { validate_message_stream: false, sink: &sink, metrics: &metrics };
	writer.write(&mut batch, &results, Some(response)).await.unwrap();

	assert!(store_p.contains(&k6).await);
	assert_eq!(batch.replicas[0].token(), &FindToken::new(&b"pnew"[..]));
	// Q's get failed: no write, token stays put so the next pass retries it.
	assert!(!store_q.contains(&k7).await);
	assert_eq!(batch.replicas[1].token(), &FindToken::new(&b"qold"[..]));
}
