// tests/acquire.rs

//! Download, verification and extraction through an in-memory transport.

mod common;

use buckaroo::acquire::{archive_path, Acquirer};
use buckaroo::events::{self, EventSink};
use buckaroo::hash::hash_bytes;
use buckaroo::model::{RemoteArchive, RemoteFile};
use buckaroo::retry::RetryPolicy;
use buckaroo::{Error, Event};
use common::{zip_bytes, MemoryTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const FILE_URL: &str = "https://example.com/BUCK";
const ARCHIVE_URL: &str = "https://example.com/lib.zip";

fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1), Duration::from_secs(5))
}

fn acquirer(transport: &Arc<MemoryTransport>, events: EventSink) -> Acquirer {
    Acquirer::new(transport.clone(), events).with_policy(fast_policy())
}

#[tokio::test]
async fn test_second_acquire_skips_transfer() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("BUCK");
    let transport = Arc::new(MemoryTransport::new().with_body(FILE_URL, b"cxx_library()".to_vec()));
    let (sink, mut stream) = events::channel();
    let acquirer = acquirer(&transport, sink);

    let first = acquirer.acquire_file(FILE_URL, None, &target).await.unwrap();
    assert_eq!(first, hash_bytes(b"cxx_library()"));

    let second = acquirer.acquire_file(FILE_URL, Some(&first), &target).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(transport.transfers(FILE_URL), 1);

    let emitted = stream.drain();
    assert!(emitted.iter().any(|e| matches!(e, Event::DownloadSkipped { .. })));
    assert!(emitted.iter().any(|e| matches!(e, Event::HashVerified { .. })));
}

#[tokio::test]
async fn test_hash_mismatch_keeps_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("BUCK");
    let transport = Arc::new(MemoryTransport::new().with_body(FILE_URL, b"tampered".to_vec()));
    let acquirer = acquirer(&transport, EventSink::silent());

    let remote = RemoteFile::new(FILE_URL, hash_bytes(b"expected"));
    let result = acquirer.download_remote_file(&remote, &target).await;

    match result {
        Err(Error::HashMismatch {
            path,
            expected,
            actual,
        }) => {
            assert_eq!(path, target);
            assert_eq!(expected, hash_bytes(b"expected"));
            assert_eq!(actual, hash_bytes(b"tampered"));
        }
        other => panic!("expected a hash mismatch, got {other:?}"),
    }
    assert_eq!(std::fs::read(&target).unwrap(), b"tampered");

    // Still there on the next run, so the mismatch repeats without a transfer
    assert!(acquirer.download_remote_file(&remote, &target).await.is_err());
    assert_eq!(transport.transfers(FILE_URL), 1);
}

#[tokio::test]
async fn test_forced_download_replaces_mismatched_file() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("BUCK");
    std::fs::write(&target, b"tampered").unwrap();
    let transport = Arc::new(MemoryTransport::new().with_body(FILE_URL, b"expected".to_vec()));
    let remote = RemoteFile::new(FILE_URL, hash_bytes(b"expected"));

    // Without forcing, the stale file is what gets verified
    let result = acquirer(&transport, EventSink::silent())
        .download_remote_file(&remote, &target)
        .await;
    assert!(matches!(result, Err(Error::HashMismatch { .. })));
    assert_eq!(transport.transfers(FILE_URL), 0);

    let (sink, mut stream) = events::channel();
    acquirer(&transport, sink)
        .with_force(true)
        .download_remote_file(&remote, &target)
        .await
        .unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), b"expected");
    assert_eq!(transport.transfers(FILE_URL), 1);
    let emitted = stream.drain();
    assert!(matches!(emitted.first(), Some(Event::DeleteFile { path }) if *path == target));
    assert!(!emitted.iter().any(|e| matches!(e, Event::DownloadSkipped { .. })));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("BUCK");
    let transport = Arc::new(
        MemoryTransport::new()
            .with_body(FILE_URL, b"ok".to_vec())
            .with_transient_failures(2),
    );
    let (sink, mut stream) = events::channel();

    acquirer(&transport, sink)
        .acquire_file(FILE_URL, None, &target)
        .await
        .unwrap();

    assert_eq!(transport.transfers(FILE_URL), 3);
    let retries = stream
        .drain()
        .into_iter()
        .filter(|e| matches!(e, Event::Retrying { .. }))
        .count();
    assert_eq!(retries, 2);
}

#[tokio::test]
async fn test_missing_url_is_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("BUCK");
    let transport = Arc::new(MemoryTransport::new());

    let result = acquirer(&transport, EventSink::silent())
        .acquire_file(FILE_URL, None, &target)
        .await;

    assert!(matches!(result, Err(Error::NotFoundError(_))));
    assert_eq!(transport.transfers(FILE_URL), 1);
    assert!(!target.exists());
    assert!(!dir.path().join("BUCK.part").exists());
}

#[tokio::test]
async fn test_archive_is_extracted_at_sub_path() {
    let dir = tempfile::tempdir().unwrap();
    let body = zip_bytes(&[
        ("lib-1234/BUCK", "cxx_library(name = 'lib')"),
        ("lib-1234/include/lib.h", "#pragma once"),
        ("README.md", "top level"),
    ]);
    let sha256 = hash_bytes(&body);
    let transport = Arc::new(MemoryTransport::new().with_body(ARCHIVE_URL, body));
    let target = dir.path().join("buckaroo").join("acme.lib");

    let remote = RemoteArchive::new(
        RemoteFile::new(ARCHIVE_URL, sha256),
        Some("lib-1234".to_string()),
    );
    acquirer(&transport, EventSink::silent())
        .download_remote_archive(&remote, &target)
        .await
        .unwrap();

    assert!(target.join("BUCK").exists());
    assert_eq!(
        std::fs::read_to_string(target.join("include/lib.h")).unwrap(),
        "#pragma once"
    );
    assert!(!target.join("README.md").exists());
    assert!(archive_path(&target).unwrap().exists());
}

#[tokio::test]
async fn test_cancelled_acquire_transfers_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Arc::new(MemoryTransport::new().with_body(FILE_URL, b"x".to_vec()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = acquirer(&transport, EventSink::silent())
        .with_cancellation(cancel)
        .acquire_file(FILE_URL, None, &dir.path().join("BUCK"))
        .await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(transport.total_transfers(), 0);
}
