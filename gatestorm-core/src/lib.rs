//! Minimal load-generation engine: scenarios of virtual users drawing weighted tasks,
//! per-request and per-check metrics, and an end-of-run summary.

mod aggregate;
mod config;
mod credential;
mod error;
mod gate;
mod request_metrics;
mod run;
mod scenario;
mod session;
mod signal;
mod summary;
mod task;
mod task_metrics;
mod user;

pub use config::{RunConfig, ScenarioConfig, ScenarioOptions, WaitTime};
pub use credential::Credential;
pub use error::{Error, Result, TaskError, TaskResult};
pub use gate::IterationGate;
pub use request_metrics::{RequestMetricIds, RequestSample};
pub use run::{RunContext, run_scenarios};
pub use scenario::{VuContext, VuSpawner, scenario_for, spawner_for};
pub use session::{Auth, Call, Judgment, Session};
pub use signal::Signal;
pub use summary::{CheckSummary, EndpointSummary, RunSummary, ScenarioSummary, TaskSummary};
pub use task::{Task, TaskFn, TaskSet};
pub use task_metrics::{ActiveVuGuard, TaskMetricIds, TaskOutcome};
pub use user::VirtualUser;

pub use futures::future::BoxFuture;
pub use gatestorm_http::{
    Cookie, CookieJar, HttpClient, HttpResponse, SameSite, attribute_summary,
    is_same_site_restricted, parse_set_cookie,
};
pub use gatestorm_metrics::HistogramSummary;
