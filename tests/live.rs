// ABOUTME: Live-server integration tests for the full session lifecycle.
// ABOUTME: Ignored by default; set REMORA_TEST_HOST/USER/KEY and run with --ignored.

use remora::ssh::{Error, HostKeyPolicy, Session, SessionConfig};

fn live_config() -> SessionConfig {
    let host = std::env::var("REMORA_TEST_HOST").expect("set REMORA_TEST_HOST");
    let user = std::env::var("REMORA_TEST_USER").expect("set REMORA_TEST_USER");
    let key = std::env::var("REMORA_TEST_KEY").expect("set REMORA_TEST_KEY");
    let port = std::env::var("REMORA_TEST_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(22);

    SessionConfig::new(host, user, key, HostKeyPolicy::AcceptAny).port(port)
}

/// Test: Successful connect produces a five-entry, all-OK transcript ending
/// with command channel establishment.
#[tokio::test]
#[ignore = "requires a live SSH server (set REMORA_TEST_HOST/USER/KEY)"]
async fn connect_transcript_has_five_ok_entries() {
    let (transcript, result) = Session::connect(live_config()).await;
    let session = result.expect("connection should succeed");

    assert_eq!(transcript.len(), 5);
    assert!(transcript.iter().all(|e| e.succeeded()));
    let last = transcript.entries().last().expect("five entries");
    assert!(last.message.contains("command channel"));

    session
        .disconnect()
        .await
        .expect("disconnect should succeed");
}

/// Test: `echo hello` returns exactly "hello\n" with exit code 0.
#[tokio::test]
#[ignore = "requires a live SSH server (set REMORA_TEST_HOST/USER/KEY)"]
async fn echo_hello_round_trip() {
    let (_, result) = Session::connect(live_config()).await;
    let session = result.expect("connection should succeed");

    let output = session
        .exec("echo hello")
        .await
        .expect("command should succeed");

    assert!(output.success(), "exit code should be 0");
    assert_eq!(output.stdout, "hello\n");

    session
        .disconnect()
        .await
        .expect("disconnect should succeed");
}

/// Test: A downloaded file is byte-for-byte identical to the remote source,
/// and disconnect afterwards succeeds on the healthy connection.
#[tokio::test]
#[ignore = "requires a live SSH server (set REMORA_TEST_HOST/USER/KEY)"]
async fn download_matches_remote_bytes() {
    let (_, result) = Session::connect(live_config()).await;
    let session = result.expect("connection should succeed");

    let seed = session
        .exec("mkdir -p /tmp/remora-live && printf 'alpha\\nbeta\\n' > /tmp/remora-live/sample.txt")
        .await
        .expect("seeding the remote file should succeed");
    assert!(seed.success());

    let local_dir = tempfile::tempdir().expect("tempdir");
    let bytes = session
        .download("/tmp/remora-live", local_dir.path(), "sample.txt")
        .await
        .expect("download should succeed");

    assert_eq!(bytes, 11);
    let local = std::fs::read(local_dir.path().join("sample.txt")).expect("read back");
    assert_eq!(local, b"alpha\nbeta\n");

    session
        .disconnect()
        .await
        .expect("disconnect should succeed");
}

/// Test: Downloading a missing remote file fails with RemoteOpen and leaves
/// no local file behind.
#[tokio::test]
#[ignore = "requires a live SSH server (set REMORA_TEST_HOST/USER/KEY)"]
async fn missing_remote_file_leaves_no_local_file() {
    let (_, result) = Session::connect(live_config()).await;
    let session = result.expect("connection should succeed");

    let local_dir = tempfile::tempdir().expect("tempdir");
    let err = session
        .download("/tmp/remora-live", local_dir.path(), "no-such-file.txt")
        .await
        .expect_err("download should fail");

    assert!(
        matches!(err, Error::RemoteOpen { .. }),
        "expected RemoteOpen error, got: {:?}",
        err
    );
    assert!(
        !local_dir.path().join("no-such-file.txt").exists(),
        "no local file should be created for a missing remote file"
    );

    session
        .disconnect()
        .await
        .expect("disconnect should succeed");
}
