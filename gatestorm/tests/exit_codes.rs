use std::io::Write as _;
use std::process::Output;

use gatestorm_testserver::TestServer;
use tokio::process::Command;

const NO_WAIT: &str = "wait: { min: 0ms, max: 0ms }";

async fn gatestorm(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gatestorm"))
        .args(args)
        .env_remove("GATESTORM_HOST")
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap_or_else(|e| panic!("failed to spawn gatestorm: {e}"))
}

fn write_config(yaml: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".yaml")
        .tempfile()
        .unwrap_or_else(|e| panic!("create temp config: {e}"));
    file.write_all(yaml.as_bytes())
        .unwrap_or_else(|e| panic!("write temp config: {e}"));
    file
}

async fn start_server() -> TestServer {
    TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"))
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[tokio::test]
async fn unknown_flag_is_invalid_input() {
    let out = gatestorm(&["run", "--bogus"]).await;
    assert_eq!(out.status.code(), Some(30), "{}", stderr(&out));
}

#[tokio::test]
async fn zero_users_is_invalid_input() {
    let out = gatestorm(&[
        "run",
        "--host",
        "http://127.0.0.1:9",
        "--no-discovery",
        "--users",
        "0",
    ])
    .await;
    assert_eq!(out.status.code(), Some(30), "{}", stderr(&out));
}

#[tokio::test]
async fn malformed_config_is_invalid_input() {
    let cfg = write_config("archetypes:\n  ddos: { users: 3 }\n");
    let path = cfg.path().to_string_lossy().into_owned();

    let out = gatestorm(&["run", "--no-discovery", "--config", &path]).await;
    assert_eq!(out.status.code(), Some(30), "{}", stderr(&out));
    assert!(stderr(&out).contains("failed to load config"), "{}", stderr(&out));
}

#[tokio::test]
async fn list_prints_every_archetype() {
    let out = gatestorm(&["list"]).await;
    assert_eq!(out.status.code(), Some(0));

    let text = stdout(&out);
    for name in [
        "ApiGatewayUser",
        "JwtSecurityTester",
        "JwtBlacklistTester",
        "SessionSecurityTester",
        "BruteForceProtectionTester",
    ] {
        assert!(text.contains(name), "{text}");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn passing_probes_exit_zero() {
    let server = start_server().await;
    let cfg = write_config(&format!("archetypes:\n  jwtSecurity: {{ {NO_WAIT} }}\n"));
    let path = cfg.path().to_string_lossy().into_owned();

    let out = gatestorm(&[
        "run",
        "--host",
        server.base_url(),
        "--config",
        &path,
        "--archetype",
        "jwt-security",
        "--iterations",
        "20",
        "--seed",
        "3",
        "--no-discovery",
    ])
    .await;

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("scenario: JwtSecurityTester"), "{text}");
    assert!(text.contains("checks: passed"), "{text}");

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_checks_exit_ten() {
    let server = start_server().await;
    // Login fails, so the blacklist probe cannot reach the protected route.
    let cfg = write_config(&format!(
        "identities:\n  fixed: {{ identifier: user1@example.com, password: wrong }}\narchetypes:\n  jwtBlacklist: {{ {NO_WAIT} }}\n"
    ));
    let path = cfg.path().to_string_lossy().into_owned();

    let out = gatestorm(&[
        "run",
        "--host",
        server.base_url(),
        "--config",
        &path,
        "--archetype",
        "jwt-blacklist",
        "--iterations",
        "2",
        "--no-discovery",
        "--output",
        "json",
    ])
    .await;

    assert_eq!(out.status.code(), Some(10), "{}", stderr(&out));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout)
        .unwrap_or_else(|e| panic!("stdout is not json: {e}: {}", stdout(&out)));
    assert_eq!(v["kind"], "summary");
    assert_eq!(v["totals"]["checks_failed_total"], 2);
    assert_eq!(v["scenarios"][0]["scenario"], "JwtBlacklistTester");
    assert_eq!(
        v["scenarios"][0]["checks"][0]["name"],
        "access_before_logout"
    );

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn host_can_come_from_the_environment() {
    let server = start_server().await;
    let cfg = write_config(&format!("archetypes:\n  sessionSecurity: {{ {NO_WAIT} }}\n"));
    let path = cfg.path().to_string_lossy().into_owned();

    let out = Command::new(env!("CARGO_BIN_EXE_gatestorm"))
        .args([
            "run",
            "--config",
            &path,
            "--archetype",
            "session-security",
            "--iterations",
            "3",
        ])
        .env("GATESTORM_HOST", server.base_url())
        .env_remove("RUST_LOG")
        .output()
        .await
        .unwrap_or_else(|e| panic!("failed to spawn gatestorm: {e}"));

    assert_eq!(out.status.code(), Some(0), "{}", stderr(&out));
    assert!(server.stats().logins_ok() > 0);

    server.shutdown().await;
}
