use std::collections::BTreeMap;
use std::time::Duration;

use gatestorm_metrics::{KeyId, Registry, TagSet};

use crate::config::ScenarioConfig;
use crate::run::RunContext;
use crate::summary::{CheckSummary, EndpointSummary, RunSummary, ScenarioSummary, TaskSummary};
use crate::task_metrics::scenario_tags;

#[derive(Debug, Clone, Copy)]
struct TagKeys {
    scenario: KeyId,
    name: KeyId,
    method: KeyId,
    status: KeyId,
    task: KeyId,
    error_kind: KeyId,
}

impl TagKeys {
    fn new(metrics: &Registry) -> Self {
        Self {
            scenario: metrics.resolve_key("scenario"),
            name: metrics.resolve_key("name"),
            method: metrics.resolve_key("method"),
            status: metrics.resolve_key("status"),
            task: metrics.resolve_key("task"),
            error_kind: metrics.resolve_key("error_kind"),
        }
    }
}

fn tag_str(metrics: &Registry, tags: &TagSet, key: KeyId) -> String {
    tags.get(key)
        .and_then(|v| metrics.resolve_key_id(v))
        .map(|s| s.to_string())
        .unwrap_or_default()
}

pub(crate) fn summarize(
    run: &RunContext,
    scenarios: &[ScenarioConfig],
    elapsed: Duration,
) -> RunSummary {
    let keys = TagKeys::new(&run.metrics);
    RunSummary {
        elapsed,
        scenarios: scenarios
            .iter()
            .map(|sc| summarize_scenario(run, keys, &sc.name))
            .collect(),
    }
}

fn summarize_scenario(run: &RunContext, keys: TagKeys, scenario: &str) -> ScenarioSummary {
    let metrics = &*run.metrics;
    let req = run.request_ids;
    let task_ids = run.task_ids;
    let Some(sv) = metrics.lookup_key(scenario) else {
        return ScenarioSummary {
            scenario: scenario.to_string(),
            ..ScenarioSummary::default()
        };
    };

    let total = |id| {
        metrics
            .query(id)
            .where_eq(keys.scenario, sv)
            .sum_counter_total()
    };

    let mut errors_by_kind = BTreeMap::new();
    for (tags, v) in metrics
        .query(req.errors_by_kind_total)
        .where_eq(keys.scenario, sv)
        .group_by([keys.error_kind])
        .sum_counter()
    {
        *errors_by_kind
            .entry(tag_str(metrics, &tags, keys.error_kind))
            .or_insert(0) += v;
    }

    let latency_us = metrics
        .query(req.latency_us)
        .where_eq(keys.scenario, sv)
        .where_missing(keys.name)
        .merge_histogram_single();

    // Endpoints, keyed by (name, method)
    let mut endpoints_acc: BTreeMap<(String, String), EndpointSummary> = BTreeMap::new();
    let entry_for = |tags: &TagSet| -> (String, String) {
        (
            tag_str(metrics, tags, keys.name),
            tag_str(metrics, tags, keys.method),
        )
    };

    for (tags, v) in metrics
        .query(req.requests_total)
        .where_eq(keys.scenario, sv)
        .group_by([keys.name, keys.method, keys.status])
        .sum_counter()
    {
        let e = endpoints_acc.entry(entry_for(&tags)).or_default();
        e.requests += v;
        *e.statuses
            .entry(tag_str(metrics, &tags, keys.status))
            .or_insert(0) += v;
    }

    for (tags, v) in metrics
        .query(req.failures_total)
        .where_eq(keys.scenario, sv)
        .group_by([keys.name, keys.method])
        .sum_counter()
    {
        endpoints_acc.entry(entry_for(&tags)).or_default().failures += v;
    }

    for (tags, h) in metrics
        .query(req.latency_us)
        .where_eq(keys.scenario, sv)
        .where_has(keys.name)
        .group_by([keys.name, keys.method])
        .merge_histogram()
    {
        endpoints_acc.entry(entry_for(&tags)).or_default().latency_us = Some(h);
    }

    let endpoints = endpoints_acc
        .into_iter()
        .map(|((name, method), e)| EndpointSummary { name, method, ..e })
        .collect();

    // Tasks
    let mut tasks: BTreeMap<String, TaskSummary> = BTreeMap::new();
    for (tags, v) in metrics
        .query(task_ids.tasks_total)
        .where_eq(keys.scenario, sv)
        .group_by([keys.task, keys.status])
        .sum_counter()
    {
        let task = tag_str(metrics, &tags, keys.task);
        let t = tasks.entry(task.clone()).or_insert_with(|| TaskSummary {
            task,
            ..TaskSummary::default()
        });
        match tag_str(metrics, &tags, keys.status).as_str() {
            "ok" => t.ok += v,
            "error" => t.error += v,
            _ => t.skipped += v,
        }
    }

    // Checks
    let mut checks: BTreeMap<String, CheckSummary> = BTreeMap::new();
    for (tags, v) in metrics
        .query(task_ids.checks)
        .where_eq(keys.scenario, sv)
        .group_by([keys.name, keys.status])
        .sum_counter()
    {
        let name = tag_str(metrics, &tags, keys.name);
        let c = checks.entry(name.clone()).or_insert_with(|| CheckSummary {
            name,
            ..CheckSummary::default()
        });
        if tag_str(metrics, &tags, keys.status) == "pass" {
            c.passes += v;
        } else {
            c.fails += v;
        }
    }

    let vus_max = metrics
        .handle(task_ids.vus_active_max, scenario_tags(metrics, scenario))
        .map_or(0, |h| u64::try_from(h.gauge()).unwrap_or(0));

    ScenarioSummary {
        scenario: scenario.to_string(),
        vus_max,
        requests_total: total(req.requests_total),
        failed_requests_total: total(req.failures_total),
        bytes_received_total: total(req.bytes_received_total),
        bytes_sent_total: total(req.bytes_sent_total),
        errors_by_kind,
        latency_us,
        tasks: tasks.into_values().collect(),
        endpoints,
        checks: checks.into_values().collect(),
    }
}
