use std::time::Duration;

use gatestorm_core::{
    BoxFuture, Error, RunConfig, ScenarioOptions, Session, Task, TaskResult, TaskSet, VirtualUser,
    WaitTime, scenario_for,
};

struct Idle;

impl Idle {
    fn idle<'a>(&'a mut self, _session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async { Ok(()) })
    }
}

impl VirtualUser for Idle {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([Task::new("idle", 1, Self::idle)])
    }
}

struct NoTasks;

impl NoTasks {
    fn disabled<'a>(&'a mut self, _session: &'a mut Session) -> BoxFuture<'a, TaskResult> {
        Box::pin(async { Ok(()) })
    }
}

impl VirtualUser for NoTasks {
    fn tasks() -> TaskSet<Self> {
        TaskSet::new([Task::new("disabled", 0, Self::disabled)])
    }
}

fn options() -> ScenarioOptions {
    ScenarioOptions {
        vus: Some(4),
        iterations: Some(100),
        duration: Some(Duration::from_secs(30)),
        ..ScenarioOptions::new("Idle", WaitTime::ZERO)
    }
}

#[test]
fn cli_values_win_over_scenario_values() {
    let cfg = RunConfig {
        vus: Some(1),
        iterations: Some(3),
        duration: Some(Duration::from_secs(2)),
    };

    let sc = scenario_for(options(), &cfg, |_| Idle)
        .unwrap_or_else(|e| panic!("expected scenario to be valid: {e}"));
    assert_eq!(sc.name, "Idle");
    assert_eq!(sc.vus, 1);
    assert_eq!(sc.iterations, Some(3));
    assert_eq!(sc.duration, Some(Duration::from_secs(2)));
}

#[test]
fn scenario_values_apply_without_cli_overrides() {
    let sc = scenario_for(options(), &RunConfig::default(), |_| Idle)
        .unwrap_or_else(|e| panic!("expected scenario to be valid: {e}"));
    assert_eq!(sc.vus, 4);
    assert_eq!(sc.iterations, Some(100));
    assert_eq!(sc.duration, Some(Duration::from_secs(30)));
}

#[test]
fn defaults_to_one_vu_and_one_iteration() {
    let sc = scenario_for(
        ScenarioOptions::new("Idle", WaitTime::ZERO),
        &RunConfig::default(),
        |_| Idle,
    )
    .unwrap_or_else(|e| panic!("expected scenario to be valid: {e}"));
    assert_eq!(sc.vus, 1);
    assert_eq!(sc.iterations, Some(1));
    assert_eq!(sc.duration, None);
}

#[test]
fn duration_alone_leaves_iterations_unbounded() {
    let cfg = RunConfig {
        duration: Some(Duration::from_secs(5)),
        ..RunConfig::default()
    };
    let sc = scenario_for(ScenarioOptions::new("Idle", WaitTime::ZERO), &cfg, |_| Idle)
        .unwrap_or_else(|e| panic!("expected scenario to be valid: {e}"));
    assert_eq!(sc.iterations, None);
    assert_eq!(sc.duration, Some(Duration::from_secs(5)));
}

#[test]
fn zero_values_are_rejected() {
    let zero_vus = RunConfig {
        vus: Some(0),
        ..RunConfig::default()
    };
    assert!(matches!(
        scenario_for(options(), &zero_vus, |_| Idle),
        Err(Error::InvalidVus(name)) if name == "Idle"
    ));

    let zero_iterations = RunConfig {
        iterations: Some(0),
        ..RunConfig::default()
    };
    assert!(matches!(
        scenario_for(options(), &zero_iterations, |_| Idle),
        Err(Error::InvalidIterations(_))
    ));

    let zero_duration = RunConfig {
        duration: Some(Duration::ZERO),
        ..RunConfig::default()
    };
    assert!(matches!(
        scenario_for(options(), &zero_duration, |_| Idle),
        Err(Error::InvalidDuration(_))
    ));
}

#[test]
fn task_table_without_weight_is_rejected() {
    let res = scenario_for(
        ScenarioOptions::new("NoTasks", WaitTime::ZERO),
        &RunConfig::default(),
        |_| NoTasks,
    );
    assert!(matches!(res, Err(Error::EmptyTaskSet(name)) if name == "NoTasks"));
}
