//! Integration tests for replicated WebDAV storage
//!
//! Runs the real HTTP client and adapter against in-process servers that
//! behave like WebDAV stores: writes into missing collections are refused,
//! `MKCOL` on an existing collection answers 405, and missing files are 404.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use dav_replica::prelude::*;
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const ORIGINAL_PATH: &str = "/files/original/image.png";
const THUMB_PATH: &str = "/files/thumb/image.png";

#[derive(Default)]
struct DavState {
    files: HashMap<String, Vec<u8>>,
    collections: HashSet<String>,
    reject_puts: bool,
    requests: Vec<(String, String)>,
}

type SharedState = Arc<Mutex<DavState>>;

/// Collection that must exist before `path` can be created
fn parent_of(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, _)) if !parent.is_empty() => format!("{parent}/"),
        _ => "/".to_string(),
    }
}

async fn handle(
    State(state): State<SharedState>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    let mut dav = state.lock().unwrap();
    dav.requests.push((method.to_string(), path.clone()));

    let parent = parent_of(&path);
    let parent_exists = parent == "/" || dav.collections.contains(&parent);

    match method.as_str() {
        "MKCOL" => {
            if dav.collections.contains(&path) {
                StatusCode::METHOD_NOT_ALLOWED.into_response()
            } else if !parent_exists {
                StatusCode::CONFLICT.into_response()
            } else {
                dav.collections.insert(path);
                StatusCode::CREATED.into_response()
            }
        }
        "PUT" => {
            if dav.reject_puts {
                StatusCode::FORBIDDEN.into_response()
            } else if !parent_exists {
                StatusCode::CONFLICT.into_response()
            } else if dav.files.insert(path, body.to_vec()).is_some() {
                StatusCode::NO_CONTENT.into_response()
            } else {
                StatusCode::CREATED.into_response()
            }
        }
        "GET" => match dav.files.get(&path) {
            Some(data) => (StatusCode::OK, data.clone()).into_response(),
            None => StatusCode::NOT_FOUND.into_response(),
        },
        "HEAD" => {
            if dav.files.contains_key(&path) {
                StatusCode::OK.into_response()
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }
        "DELETE" => {
            if dav.files.remove(&path).is_some() {
                StatusCode::NO_CONTENT.into_response()
            } else {
                StatusCode::NOT_FOUND.into_response()
            }
        }
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

/// Starts a WebDAV-like server on a random local port
async fn spawn_server() -> (String, SharedState) {
    let state = SharedState::default();
    let app = Router::new().fallback(handle).with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), state)
}

fn client_for(url: &str) -> HttpDavClient {
    HttpDavClient::new(&ServerDescriptor::new(url), &StorageConfig::default()).unwrap()
}

fn image_host() -> StaticHost {
    StaticHost::new()
        .with_filename("image.png")
        .with_path("original", ORIGINAL_PATH)
        .with_path("thumb", THUMB_PATH)
}

fn adapter(config: &StorageConfig, host: StaticHost) -> ReplicatedStorage {
    let pool = Arc::new(ServerPool::from_config(config).unwrap());
    ReplicatedStorage::from_config(config, pool, Arc::new(host))
}

#[tokio::test]
async fn test_put_creates_missing_collections() {
    let (url, state) = spawn_server().await;
    let client = client_for(&url);

    client
        .put(ORIGINAL_PATH, Bytes::from_static(b"original"))
        .await
        .unwrap();
    client
        .put(THUMB_PATH, Bytes::from_static(b"thumb"))
        .await
        .unwrap();

    let dav = state.lock().unwrap();
    assert!(dav.collections.contains("/files/"));
    assert!(dav.collections.contains("/files/original/"));
    assert!(dav.collections.contains("/files/thumb/"));
    assert_eq!(dav.files.get(ORIGINAL_PATH).unwrap(), b"original");
    assert_eq!(dav.files.get(THUMB_PATH).unwrap(), b"thumb");

    // Collections are created outermost first, then the file is written
    let first_write: Vec<&str> = dav
        .requests
        .iter()
        .take(3)
        .map(|(method, path)| {
            assert!(method == "MKCOL" || method == "PUT");
            path.as_str()
        })
        .collect();
    assert_eq!(first_write, vec!["/files/", "/files/original/", ORIGINAL_PATH]);
}

#[tokio::test]
async fn test_client_read_side() {
    let (url, _state) = spawn_server().await;
    let client = client_for(&url);

    assert!(!client.exists(ORIGINAL_PATH).await.unwrap());
    assert!(matches!(
        client.get(ORIGINAL_PATH).await,
        Err(StorageError::NotFound(_))
    ));
    // Deleting a missing file is not an error
    client.delete(ORIGINAL_PATH).await.unwrap();

    client
        .put(ORIGINAL_PATH, Bytes::from_static(b"data"))
        .await
        .unwrap();
    assert!(client.exists(ORIGINAL_PATH).await.unwrap());
    assert_eq!(&client.get(ORIGINAL_PATH).await.unwrap()[..], b"data");

    client.delete(ORIGINAL_PATH).await.unwrap();
    assert!(!client.exists(ORIGINAL_PATH).await.unwrap());
}

#[tokio::test]
async fn test_rejected_put_reports_status() {
    let (url, state) = spawn_server().await;
    state.lock().unwrap().reject_puts = true;
    let client = client_for(&url);

    let result = client.put(ORIGINAL_PATH, Bytes::from_static(b"data")).await;
    assert!(matches!(
        result,
        Err(StorageError::RemoteRejected { status: 403, .. })
    ));
}

#[tokio::test]
async fn test_full_attachment_lifecycle_on_two_servers() {
    let (url_a, state_a) = spawn_server().await;
    let (url_b, state_b) = spawn_server().await;
    let config = StorageConfig::with_servers([url_a.clone(), url_b]);

    let flushes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&flushes);
    let host = image_host().on_flush_writes(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut storage = adapter(&config, host);

    storage.queue_write("original", Cursor::new(b"original bytes".to_vec()));
    storage.queue_write("thumb", Cursor::new(b"thumb bytes".to_vec()));
    storage.flush_writes().await.unwrap();

    assert!(storage.queued_for_write().is_empty());
    assert_eq!(flushes.load(Ordering::SeqCst), 1);
    for state in [&state_a, &state_b] {
        let dav = state.lock().unwrap();
        assert_eq!(dav.files.get(ORIGINAL_PATH).unwrap(), b"original bytes");
        assert_eq!(dav.files.get(THUMB_PATH).unwrap(), b"thumb bytes");
    }

    assert!(storage.exists_default().await.unwrap());
    assert!(storage.exists(&Style::new("thumb")).await.unwrap());
    assert_eq!(
        storage.public_url(&Style::new("thumb")).unwrap(),
        format!("{url_a}{THUMB_PATH}")
    );

    let temp = TempDir::new().unwrap();
    let destination = temp.path().join("copies").join("thumb.png");
    storage
        .copy_to_local_file(&Style::new("thumb"), &destination)
        .await
        .unwrap();
    assert_eq!(std::fs::read(&destination).unwrap(), b"thumb bytes");

    // The thumbnail is already gone from the second server
    state_b.lock().unwrap().files.remove(THUMB_PATH);
    storage.queue_delete_all([ORIGINAL_PATH, THUMB_PATH]);
    storage.flush_deletes().await.unwrap();

    assert!(storage.queued_for_delete().is_empty());
    assert!(state_a.lock().unwrap().files.is_empty());
    assert!(state_b.lock().unwrap().files.is_empty());
    assert!(!storage.exists_default().await.unwrap());
}

#[tokio::test]
async fn test_secondary_rejection_is_partial_replication() {
    let (url_a, state_a) = spawn_server().await;
    let (url_b, state_b) = spawn_server().await;
    state_b.lock().unwrap().reject_puts = true;
    let config = StorageConfig::with_servers([url_a.clone(), url_b.clone()]);

    let flushes = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&flushes);
    let host = image_host().on_flush_writes(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let mut storage = adapter(&config, host);
    storage.queue_write("original", Cursor::new(b"original bytes".to_vec()));

    let err = storage.flush_writes().await.unwrap_err();
    match err {
        StorageError::PartialReplication {
            operation,
            failed_server,
            replicated_to,
            ..
        } => {
            assert_eq!(operation, ReplicationOp::Write);
            assert_eq!(failed_server, url_b);
            assert_eq!(replicated_to, vec![url_a]);
        }
        other => panic!("expected partial replication, got {other:?}"),
    }

    assert_eq!(flushes.load(Ordering::SeqCst), 0);
    assert_eq!(storage.queued_for_write().len(), 1);
    assert!(state_a.lock().unwrap().files.contains_key(ORIGINAL_PATH));
    assert!(!state_b.lock().unwrap().files.contains_key(ORIGINAL_PATH));

    // Once the server accepts writes again a retry drains the queue
    state_b.lock().unwrap().reject_puts = false;
    storage.flush_writes().await.unwrap();
    assert!(storage.queued_for_write().is_empty());
    assert_eq!(flushes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reads_never_fall_back_to_secondary() {
    let (url_a, _state_a) = spawn_server().await;
    let (url_b, state_b) = spawn_server().await;
    state_b
        .lock()
        .unwrap()
        .files
        .insert(ORIGINAL_PATH.to_string(), b"only on b".to_vec());
    let config = StorageConfig::with_servers([url_a, url_b]);
    let storage = adapter(&config, image_host());

    assert!(!storage.exists_default().await.unwrap());

    let temp = TempDir::new().unwrap();
    let result = storage
        .copy_to_local_file(&Style::original(), temp.path().join("image.png"))
        .await;
    assert!(matches!(result, Err(StorageError::NotFound(_))));
    assert!(state_b.lock().unwrap().requests.is_empty());
}

#[tokio::test]
async fn test_public_url_override_needs_no_server() {
    let servers = ["http://webdav1.example.com", "http://webdav2.example.com"];
    let config =
        StorageConfig::with_servers(servers).with_public_url("http://public.example.com");
    let storage = adapter(&config, image_host());

    assert_eq!(
        storage.public_url_default().unwrap(),
        "http://public.example.com/files/original/image.png"
    );

    let plain = adapter(&StorageConfig::with_servers(servers), image_host());
    assert_eq!(
        plain.public_url(&Style::new("thumb")).unwrap(),
        "http://webdav1.example.com/files/thumb/image.png"
    );
}

#[tokio::test]
async fn test_unmapped_style_never_overwrites_original() {
    let (url, state) = spawn_server().await;
    let config = StorageConfig::with_servers([url]);
    let host = StaticHost::new()
        .with_filename("image.png")
        .with_path("original", ORIGINAL_PATH);
    let mut storage = adapter(&config, host);

    storage.queue_write("original", Cursor::new(b"original bytes".to_vec()));
    storage.flush_writes().await.unwrap();

    storage.queue_write("medium", Cursor::new(b"medium bytes".to_vec()));
    let err = storage.flush_writes().await.unwrap_err();
    assert!(matches!(err, StorageError::UnmappedStyle(_)));
    assert!(matches!(
        storage.public_url(&Style::new("medium")),
        Err(StorageError::UnmappedStyle(_))
    ));

    let dav = state.lock().unwrap();
    assert_eq!(dav.files.len(), 1);
    assert_eq!(dav.files.get(ORIGINAL_PATH).unwrap(), b"original bytes");
}
