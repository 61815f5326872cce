use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use gatestorm_core::{
    BoxFuture, Call, Credential, HttpClient, RunConfig, RunContext, ScenarioOptions, Session,
    Signal, Task, TaskError, TaskResult, TaskSet, VirtualUser, WaitTime, run_scenarios,
    scenario_for,
};
use gatestorm_testserver::TestServer;

struct Prober {
    logins: Arc<AtomicU64>,
}

impl Prober {
    fn me<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let res = session.get("/auth/me").await?;
            session.check("me_ok", res.status == 200, || "expected 200 from /auth/me");
            Ok(())
        })
    }

    fn bad_token<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            let res = session
                .send(Call::get("/auth/me").bearer("invalid_token_format").manual())
                .await?;
            session.check("bad_token_rejected", res.status == 401, || {
                format!("expected 401, got {}", res.status)
            });
            Ok(())
        })
    }

    fn nothing<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async move {
            session.skip("nothing to do");
            Ok(())
        })
    }

    fn broken<'a>(&'a mut self, _session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async { Err(TaskError::Other("boom".to_string())) })
    }
}

impl VirtualUser for Prober {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([
            Task::new("me", 3, Self::me),
            Task::new("bad_token", 3, Self::bad_token),
            Task::new("nothing", 1, Self::nothing),
            Task::new("broken", 1, Self::broken),
        ])
    }

    fn on_start<'a>(&'a mut self, session: &'a mut Session) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let body = serde_json::json!({
                "identifier": "user1@example.com",
                "password": "password123",
            });
            let Ok(res) = session.post_json("/auth/login", &body).await else {
                return;
            };
            let value: serde_json::Value = res.json().unwrap_or_default();
            if let Some(token) = value["data"]["access_token"].as_str() {
                session.set_credential(Credential::bearer(token));
                self.logins.fetch_add(1, Ordering::Relaxed);
            }
        })
    }
}

fn context(server: &TestServer) -> Arc<RunContext> {
    Arc::new(
        RunContext::new(server.base_url(), server.prefix(), HttpClient::default())
            .with_seed(Some(7)),
    )
}

#[tokio::test]
async fn iterations_budget_is_shared_by_vus() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));
    let logins = Arc::new(AtomicU64::new(0));

    let cfg = RunConfig {
        vus: Some(3),
        iterations: Some(40),
        duration: None,
    };
    let factory_logins = logins.clone();
    let scenario = scenario_for(
        ScenarioOptions::new("Prober", WaitTime::ZERO),
        &cfg,
        move |_| Prober {
            logins: factory_logins.clone(),
        },
    )
    .unwrap_or_else(|e| panic!("scenario: {e}"));

    let summary = run_scenarios(vec![scenario], context(&server))
        .await
        .unwrap_or_else(|e| panic!("run: {e}"));

    assert_eq!(logins.load(Ordering::Relaxed), 3);

    let s = summary
        .scenario("Prober")
        .unwrap_or_else(|| panic!("missing scenario summary"));
    assert_eq!(s.vus_max, 3);

    let task_runs: u64 = s.tasks.iter().map(|t| t.total()).sum();
    assert_eq!(task_runs, 40);
    assert_eq!(s.task("nothing").map_or(0, |t| t.skipped), s.task("nothing").map_or(0, |t| t.total()));
    assert_eq!(s.task("broken").map_or(0, |t| t.error), s.task("broken").map_or(0, |t| t.total()));

    // 3 logins plus one request per `me` / `bad_token` run.
    let probes = s.task("me").map_or(0, |t| t.total()) + s.task("bad_token").map_or(0, |t| t.total());
    assert_eq!(s.requests_total, 3 + probes);
    assert_eq!(s.failed_requests_total, 0);
    assert_eq!(summary.checks_failed_total(), 0);
    assert_eq!(summary.checks_passed_total(), probes);

    let me = s
        .endpoint("/api/v1/auth/me")
        .unwrap_or_else(|| panic!("missing /auth/me endpoint"));
    assert_eq!(me.method, "GET");
    assert_eq!(me.requests, probes);
    assert!(me.latency_us.is_some());
    assert_eq!(
        me.statuses.get("401").copied().unwrap_or(0),
        s.task("bad_token").map_or(0, |t| t.total())
    );
    assert!(
        s.latency_us
            .as_ref()
            .is_some_and(|h| h.count == s.requests_total)
    );

    server.shutdown().await;
}

#[tokio::test]
async fn stop_signal_interrupts_waits() {
    let server = TestServer::start()
        .await
        .unwrap_or_else(|e| panic!("start test server: {e}"));

    let cfg = RunConfig {
        vus: Some(2),
        iterations: None,
        duration: Some(Duration::from_secs(60)),
    };
    let wait = WaitTime::between(Duration::from_secs(10), Duration::from_secs(20))
        .unwrap_or_else(|e| panic!("wait: {e}"));
    let logins = Arc::new(AtomicU64::new(0));
    let scenario = scenario_for(ScenarioOptions::new("Prober", wait), &cfg, move |_| Prober {
        logins: logins.clone(),
    })
    .unwrap_or_else(|e| panic!("scenario: {e}"));

    let stop = Arc::new(Signal::new());
    let ctx = Arc::new(
        RunContext::new(server.base_url(), server.prefix(), HttpClient::default())
            .with_stop(stop.clone()),
    );

    let started = Instant::now();
    let run = tokio::spawn(run_scenarios(vec![scenario], ctx));
    tokio::time::sleep(Duration::from_millis(300)).await;
    stop.fire();

    let summary = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap_or_else(|_| panic!("run did not stop"))
        .unwrap_or_else(|e| panic!("join: {e}"))
        .unwrap_or_else(|e| panic!("run: {e}"));
    assert!(started.elapsed() < Duration::from_secs(5));

    let s = summary
        .scenario("Prober")
        .unwrap_or_else(|| panic!("missing scenario summary"));
    let task_runs: u64 = s.tasks.iter().map(|t| t.total()).sum();
    assert_eq!(task_runs, 2);

    server.shutdown().await;
}

#[tokio::test]
async fn duplicate_scenarios_are_rejected() {
    let cfg = RunConfig::default();
    let make = || {
        let logins = Arc::new(AtomicU64::new(0));
        scenario_for(ScenarioOptions::new("Same", WaitTime::ZERO), &cfg, move |_| Prober {
            logins: logins.clone(),
        })
        .unwrap_or_else(|e| panic!("scenario: {e}"))
    };

    let ctx = Arc::new(RunContext::new("http://127.0.0.1:9", "", HttpClient::default()));
    let res = run_scenarios(vec![make(), make()], ctx).await;
    assert!(matches!(res, Err(gatestorm_core::Error::DuplicateScenario(name)) if name == "Same"));
}
