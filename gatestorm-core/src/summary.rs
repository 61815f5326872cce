use std::collections::BTreeMap;
use std::time::Duration;

use gatestorm_metrics::HistogramSummary;

#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub scenarios: Vec<ScenarioSummary>,
}

impl RunSummary {
    pub fn requests_total(&self) -> u64 {
        self.scenarios.iter().map(|s| s.requests_total).sum()
    }

    pub fn failed_requests_total(&self) -> u64 {
        self.scenarios.iter().map(|s| s.failed_requests_total).sum()
    }

    pub fn checks_passed_total(&self) -> u64 {
        self.scenarios.iter().map(ScenarioSummary::checks_passed_total).sum()
    }

    pub fn checks_failed_total(&self) -> u64 {
        self.scenarios.iter().map(ScenarioSummary::checks_failed_total).sum()
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioSummary> {
        self.scenarios.iter().find(|s| s.scenario == name)
    }
}

#[derive(Debug, Default, Clone)]
pub struct ScenarioSummary {
    pub scenario: String,
    pub vus_max: u64,

    pub requests_total: u64,
    pub failed_requests_total: u64,
    pub bytes_received_total: u64,
    pub bytes_sent_total: u64,
    /// Transport failures by kind.
    pub errors_by_kind: BTreeMap<String, u64>,

    /// Scenario-wide request latency in microseconds.
    pub latency_us: Option<HistogramSummary>,

    /// Sorted by task name.
    pub tasks: Vec<TaskSummary>,
    /// Sorted by endpoint name, then method.
    pub endpoints: Vec<EndpointSummary>,
    /// Sorted by check name.
    pub checks: Vec<CheckSummary>,
}

impl ScenarioSummary {
    pub fn checks_passed_total(&self) -> u64 {
        self.checks.iter().map(|c| c.passes).sum()
    }

    pub fn checks_failed_total(&self) -> u64 {
        self.checks.iter().map(|c| c.fails).sum()
    }

    pub fn task(&self, name: &str) -> Option<&TaskSummary> {
        self.tasks.iter().find(|t| t.task == name)
    }

    pub fn check(&self, name: &str) -> Option<&CheckSummary> {
        self.checks.iter().find(|c| c.name == name)
    }

    pub fn endpoint(&self, name: &str) -> Option<&EndpointSummary> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    pub task: String,
    pub ok: u64,
    pub error: u64,
    pub skipped: u64,
}

impl TaskSummary {
    pub fn total(&self) -> u64 {
        self.ok + self.error + self.skipped
    }
}

#[derive(Debug, Default, Clone)]
pub struct EndpointSummary {
    pub name: String,
    pub method: String,
    pub requests: u64,
    pub failures: u64,
    /// Keyed by status code, or `error` for transport failures.
    pub statuses: BTreeMap<String, u64>,
    pub latency_us: Option<HistogramSummary>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CheckSummary {
    pub name: String,
    pub passes: u64,
    pub fails: u64,
}
