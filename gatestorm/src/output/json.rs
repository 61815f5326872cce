use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write as _;

use gatestorm_core::{HistogramSummary, RunSummary, ScenarioConfig};
use gatestorm_gateway::{Archetype, GatewayConfig};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &GatewayConfig, _scenarios: &[ScenarioConfig]) {}

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        emit_json_line(&build_summary_line(summary))
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub elapsed_secs: f64,
    pub scenarios: Vec<JsonScenarioSummary>,
    pub totals: JsonTotals,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonScenarioSummary {
    pub scenario: String,
    pub vus_max: u64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    pub errors_by_kind: BTreeMap<String, u64>,

    pub latency: Option<JsonLatencySummary>,
    pub tasks: Vec<JsonTask>,
    pub endpoints: Vec<JsonEndpoint>,
    pub checks: Vec<JsonCheck>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonTask {
    pub task: String,
    pub ok: u64,
    pub error: u64,
    pub skipped: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonEndpoint {
    pub name: String,
    pub method: String,
    pub requests: u64,
    pub failures: u64,
    pub statuses: BTreeMap<String, u64>,
    pub latency: Option<JsonLatencySummary>,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonCheck {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}

/// Microseconds.
#[derive(Debug, Serialize)]
pub(crate) struct JsonLatencySummary {
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub count: u64,
}

impl From<&HistogramSummary> for JsonLatencySummary {
    fn from(l: &HistogramSummary) -> Self {
        Self {
            p50: l.p50,
            p75: l.p75,
            p90: l.p90,
            p95: l.p95,
            p99: l.p99,
            min: l.min,
            max: l.max,
            mean: l.mean,
            stdev: l.stdev,
            count: l.count,
        }
    }
}

#[derive(Debug, Serialize, Default)]
pub(crate) struct JsonTotals {
    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub checks_passed_total: u64,
    pub checks_failed_total: u64,
}

fn build_summary_line(summary: &RunSummary) -> JsonSummaryLine {
    let scenarios = summary
        .scenarios
        .iter()
        .map(|s| JsonScenarioSummary {
            scenario: s.scenario.clone(),
            vus_max: s.vus_max,
            requests_total: s.requests_total,
            failed_requests_total: s.failed_requests_total,
            bytes_received_total: s.bytes_received_total,
            bytes_sent_total: s.bytes_sent_total,
            errors_by_kind: s.errors_by_kind.clone(),
            latency: s.latency_us.as_ref().map(JsonLatencySummary::from),
            tasks: s
                .tasks
                .iter()
                .map(|t| JsonTask {
                    task: t.task.clone(),
                    ok: t.ok,
                    error: t.error,
                    skipped: t.skipped,
                })
                .collect(),
            endpoints: s
                .endpoints
                .iter()
                .map(|e| JsonEndpoint {
                    name: e.name.clone(),
                    method: e.method.clone(),
                    requests: e.requests,
                    failures: e.failures,
                    statuses: e.statuses.clone(),
                    latency: e.latency_us.as_ref().map(JsonLatencySummary::from),
                })
                .collect(),
            checks: s
                .checks
                .iter()
                .map(|c| JsonCheck {
                    name: c.name.clone(),
                    passes: c.passes,
                    fails: c.fails,
                })
                .collect(),
        })
        .collect();

    JsonSummaryLine {
        kind: "summary",
        elapsed_secs: summary.elapsed.as_secs_f64(),
        scenarios,
        totals: JsonTotals {
            requests_total: summary.requests_total(),
            failed_requests_total: summary.failed_requests_total(),
            checks_passed_total: summary.checks_passed_total(),
            checks_failed_total: summary.checks_failed_total(),
        },
    }
}

#[derive(Debug, Serialize)]
struct JsonArchetype {
    name: String,
    scenario: &'static str,
    enabled: bool,
    wait_min_ms: u128,
    wait_max_ms: u128,
    tasks: BTreeMap<&'static str, u32>,
}

pub(crate) fn emit_archetypes(cfg: &GatewayConfig) -> anyhow::Result<()> {
    let archetypes = Archetype::ALL
        .into_iter()
        .map(|a| {
            let settings = cfg.archetypes.get(a);
            let wait = settings.wait.unwrap_or_else(|| a.default_wait());
            JsonArchetype {
                name: a.to_string(),
                scenario: a.scenario_name(),
                enabled: settings.enabled,
                wait_min_ms: wait.min.into_inner().as_millis(),
                wait_max_ms: wait.max.into_inner().as_millis(),
                tasks: a.task_weights().into_iter().collect(),
            }
        })
        .collect::<Vec<_>>();
    emit_json_line(&archetypes)
}

fn emit_json_line<T: Serialize>(line: &T) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, line)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use gatestorm_core::{CheckSummary, ScenarioSummary};
    use serde_json::Value;

    use super::*;

    #[test]
    fn summary_line_has_totals_and_checks() {
        let summary = RunSummary {
            elapsed: Duration::from_millis(1500),
            scenarios: vec![ScenarioSummary {
                scenario: "BruteForceProtectionTester".to_string(),
                requests_total: 10,
                failed_requests_total: 2,
                checks: vec![CheckSummary {
                    name: "login_rate_limiting".to_string(),
                    passes: 4,
                    fails: 1,
                }],
                ..ScenarioSummary::default()
            }],
        };

        let v: Value = match serde_json::to_value(build_summary_line(&summary)) {
            Ok(v) => v,
            Err(err) => panic!("to_value failed: {err}"),
        };

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("summary"));
        assert_eq!(
            v.pointer("/totals/requests_total").and_then(Value::as_u64),
            Some(10)
        );
        assert_eq!(
            v.pointer("/totals/checks_failed_total")
                .and_then(Value::as_u64),
            Some(1)
        );
        assert_eq!(
            v.pointer("/scenarios/0/checks/0/name").and_then(Value::as_str),
            Some("login_rate_limiting")
        );
        assert_eq!(v.pointer("/scenarios/0/latency"), Some(&Value::Null));
    }
}
