use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use gatestorm_http::HttpClient;
use gatestorm_metrics::Registry;
use tracing::{debug, info};

use crate::aggregate::summarize;
use crate::config::ScenarioConfig;
use crate::error::{Error, Result};
use crate::gate::IterationGate;
use crate::request_metrics::RequestMetricIds;
use crate::scenario::VuContext;
use crate::session::Session;
use crate::signal::Signal;
use crate::summary::RunSummary;
use crate::task_metrics::{TaskMetricIds, TaskOutcome};
use crate::user::VirtualUser;

/// Shared, read-only state of one run.
#[derive(Debug)]
pub struct RunContext {
    pub client: HttpClient,
    /// Scheme and authority, without a trailing slash.
    pub host: String,
    pub prefix: String,
    pub metrics: Arc<Registry>,
    pub request_ids: RequestMetricIds,
    pub task_ids: TaskMetricIds,
    pub stop: Arc<Signal>,
    /// Makes per-VU RNG streams reproducible.
    pub seed: Option<u64>,
}

impl RunContext {
    pub fn new(host: &str, prefix: &str, client: HttpClient) -> Self {
        let metrics = Arc::new(Registry::default());
        let request_ids = RequestMetricIds::register(&metrics);
        let task_ids = TaskMetricIds::register(&metrics);

        Self {
            client,
            host: host.trim_end_matches('/').to_string(),
            prefix: normalize_prefix(prefix),
            metrics,
            request_ids,
            task_ids,
            stop: Arc::new(Signal::new()),
            seed: None,
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_stop(mut self, stop: Arc<Signal>) -> Self {
        self.stop = stop;
        self
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Spawns every VU of every scenario, releases them together, and waits for all of them.
pub async fn run_scenarios(scenarios: Vec<ScenarioConfig>, run: Arc<RunContext>) -> Result<RunSummary> {
    if scenarios.is_empty() {
        return Err(Error::NoScenarios);
    }

    let mut seen = HashSet::new();
    for sc in &scenarios {
        if !seen.insert(sc.name.as_str()) {
            return Err(Error::DuplicateScenario(sc.name.clone()));
        }
    }

    let start_signal = Arc::new(Signal::new());
    let mut gates = Vec::with_capacity(scenarios.len());
    let mut handles = Vec::new();
    let mut next_vu_id = 1u64;

    for sc in &scenarios {
        let gate = Arc::new(IterationGate::new(sc.iterations, sc.duration));
        let scenario: Arc<str> = Arc::from(sc.name.as_str());

        for _ in 0..sc.vus {
            let ctx = VuContext {
                vu_id: next_vu_id,
                scenario: scenario.clone(),
                run: run.clone(),
                gate: gate.clone(),
                wait_time: sc.wait_time,
                start_signal: start_signal.clone(),
            };
            next_vu_id += 1;
            handles.push(tokio::spawn((sc.spawner)(ctx)));
        }

        gates.push(gate);
    }

    info!(
        scenarios = scenarios.len(),
        vus = next_vu_id - 1,
        "starting run"
    );

    let started = Instant::now();
    for gate in &gates {
        gate.start_at(started);
    }
    start_signal.fire();

    for handle in handles {
        handle.await?;
    }

    let elapsed = started.elapsed();
    info!(elapsed = ?elapsed, "run finished");
    if tracing::enabled!(tracing::Level::DEBUG) {
        for series in run.metrics.summarize() {
            debug!(
                metric = %series.name,
                kind = %series.kind,
                tags = ?series.tags,
                value = ?series.value,
                "metric series"
            );
        }
    }

    Ok(summarize(&run, &scenarios, elapsed))
}

pub(crate) async fn run_vu<U: VirtualUser>(mut user: U, ctx: VuContext) {
    let run = ctx.run.clone();

    tokio::select! {
        _ = ctx.start_signal.wait() => {}
        _ = run.stop.wait() => return,
    }

    let _active = run.task_ids.enter_active_vu(&run.metrics, &ctx.scenario);
    let tasks = U::tasks();
    let mut session = Session::new(run.clone(), ctx.scenario.clone(), ctx.vu_id);

    tokio::select! {
        _ = user.on_start(&mut session) => {}
        _ = run.stop.wait() => return,
    }

    while !run.stop.is_fired() && ctx.gate.next() {
        let Some(task) = tasks.pick(session.rng()) else {
            break;
        };

        let started = Instant::now();
        let result = tokio::select! {
            res = (task.run)(&mut user, &mut session) => res,
            _ = run.stop.wait() => break,
        };

        let skipped = session.take_skipped();
        let outcome = match result {
            Ok(()) if skipped => TaskOutcome::Skipped,
            Ok(()) => TaskOutcome::Ok,
            Err(err) => {
                debug!(
                    vu = ctx.vu_id,
                    scenario = %ctx.scenario,
                    task = task.name,
                    error_kind = %err.kind(),
                    error = %err,
                    "task failed"
                );
                TaskOutcome::Error
            }
        };
        run.task_ids.record_task(
            &run.metrics,
            &ctx.scenario,
            task.name,
            outcome,
            started.elapsed(),
        );

        let mut pause = ctx.wait_time.sample(session.rng());
        if let Some(remaining) = ctx.gate.remaining() {
            pause = pause.min(remaining);
        }
        if pause.is_zero() {
            continue;
        }

        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = run.stop.wait() => break,
        }
    }
}
