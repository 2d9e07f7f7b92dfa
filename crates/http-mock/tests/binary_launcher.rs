//! Lifecycle tests that run the `http-mock` binary as a child process.

use http_mock::{
    Error, HttpMock, Launcher, LifecycleState, Server, ServerConfig, ServerRegistry,
};
use serial_test::serial;
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn binary() -> Launcher {
    Launcher::Binary {
        path: PathBuf::from(env!("CARGO_BIN_EXE_http-mock")),
    }
}

fn free_port() -> u16 {
    port_check::free_local_port().expect("No free port available")
}

#[tokio::test]
#[serial]
async fn test_child_process_serves_expectations_and_log() {
    let config = ServerConfig::new("127.0.0.1", free_port()).with_launcher(binary());
    let mut http_mock = HttpMock::start(config).await.unwrap();
    http_mock
        .mock()
        .when()
        .method_is("PUT")
        .path_is("/items/1")
        .then()
        .status_code(204)
        .end();
    http_mock.set_up().await.unwrap();

    let client = http_mock.client().unwrap().clone();
    let resp = client.put("/items/1").body("{}").send().await.unwrap();
    assert_eq!(resp.status(), 204);

    let recorded = http_mock.requests().unwrap().latest().await.unwrap();
    assert_eq!(recorded.method, "PUT");
    assert_eq!(recorded.body_text(), "{}");

    http_mock.stop();
    assert_eq!(http_mock.server().state(), LifecycleState::Stopped);
    assert!(client.get("/items/1").send().await.is_err());
}

#[tokio::test]
#[serial]
async fn test_stop_is_idempotent_and_deregisters() {
    let port = free_port();
    let server = Server::new(ServerConfig::new("127.0.0.1", port).with_launcher(binary())).unwrap();
    server.start().await.unwrap();
    assert!(ServerRegistry::global().contains(server.id()));

    server.stop();
    server.stop();
    assert!(!ServerRegistry::global().contains(server.id()));
    assert!(wait_for_port_release(port));
}

#[tokio::test]
#[serial]
async fn test_registry_cleanup_kills_child_processes() {
    let server =
        Server::new(ServerConfig::new("127.0.0.1", free_port()).with_launcher(binary())).unwrap();
    server.start().await.unwrap();
    let base_url = server.base_url().unwrap();

    ServerRegistry::global().cleanup();
    ServerRegistry::global().cleanup();

    assert_eq!(server.state(), LifecycleState::Stopped);
    let probe = reqwest::Client::new()
        .get(format!("{base_url}/_health"))
        .timeout(Duration::from_millis(500))
        .send()
        .await;
    assert!(probe.is_err());
}

#[tokio::test]
#[serial]
async fn test_taken_port_fails_start_and_leaves_owner_alone() {
    let port = free_port();
    let mut owner = HttpMock::start(ServerConfig::new("127.0.0.1", port).with_launcher(binary()))
        .await
        .unwrap();
    owner
        .mock()
        .when()
        .path_is("/owner")
        .then()
        .body("first")
        .end();
    owner.set_up().await.unwrap();

    let intruder =
        Server::new(ServerConfig::new("127.0.0.1", port).with_launcher(binary())).unwrap();
    let err = intruder.start().await.unwrap_err();

    assert!(matches!(err, Error::Lifecycle(_)), "{err}");
    assert_eq!(intruder.state(), LifecycleState::Stopped);
    assert!(!ServerRegistry::global().contains(intruder.id()));

    let client = owner.client().unwrap().clone();
    let resp = client.get("/owner").send().await.unwrap();
    assert_eq!(resp.text().await.unwrap(), "first");
    owner.stop();
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_exited_child_fails_start_with_its_status() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "exit 3");
    let config = ServerConfig::new("127.0.0.1", free_port())
        .with_launcher(Launcher::Binary { path: script })
        .with_startup_timeout(Duration::from_secs(5));
    let server = Server::new(config).unwrap();

    let started = Instant::now();
    let err = server.start().await.unwrap_err();

    match &err {
        Error::Exited { status, .. } => assert_eq!(status.code(), Some(3)),
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("exit status: 3"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(server.state(), LifecycleState::Stopped);
    assert!(!ServerRegistry::global().contains(server.id()));
}

#[cfg(unix)]
#[tokio::test]
#[serial]
async fn test_silent_child_times_out_and_is_killed() {
    let dir = tempfile::tempdir().unwrap();
    let script = write_script(&dir, "exec sleep 30");
    let config = ServerConfig::new("127.0.0.1", free_port())
        .with_launcher(Launcher::Binary { path: script })
        .with_startup_timeout(Duration::from_millis(500));
    let server = Server::new(config).unwrap();

    let started = Instant::now();
    let err = server.start().await.unwrap_err();

    assert!(matches!(err, Error::Connectivity { .. }), "{err}");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(server.state(), LifecycleState::Stopped);
    assert!(!ServerRegistry::global().contains(server.id()));
}

const EXIT_CLEANUP_PORT: &str = "HTTP_MOCK_EXIT_CLEANUP_PORT";

/// Re-runs itself in a fresh process that starts a server and exits without
/// stopping it; the exit hook has to take the child down.
#[tokio::test]
#[serial]
async fn test_servers_are_stopped_when_the_owning_process_exits() {
    if let Ok(port) = std::env::var(EXIT_CLEANUP_PORT) {
        let port: u16 = port.parse().unwrap();
        let server =
            Server::new(ServerConfig::new("127.0.0.1", port).with_launcher(binary())).unwrap();
        server.start().await.unwrap();
        assert!(ServerRegistry::global().contains(server.id()));
        return;
    }

    let port = free_port();
    let status = std::process::Command::new(std::env::current_exe().unwrap())
        .args([
            "test_servers_are_stopped_when_the_owning_process_exits",
            "--exact",
            "--test-threads=1",
        ])
        .env(EXIT_CLEANUP_PORT, port.to_string())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .unwrap();

    assert!(status.success(), "{status}");
    assert!(wait_for_port_release(port));
    let after_exit = reqwest::Client::new()
        .get(format!("http://127.0.0.1:{port}/_health"))
        .timeout(Duration::from_millis(500))
        .send()
        .await;
    assert!(after_exit.is_err());
}

#[cfg(unix)]
fn write_script(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.path().join("fake-http-mock");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn wait_for_port_release(port: u16) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if port_check::is_local_port_free(port) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}
