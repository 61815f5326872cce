use std::sync::Arc;

use futures::future::BoxFuture;

use crate::config::{RunConfig, ScenarioConfig, ScenarioOptions, WaitTime};
use crate::error::{Error, Result};
use crate::gate::IterationGate;
use crate::run::{RunContext, run_vu};
use crate::signal::Signal;
use crate::user::VirtualUser;

/// Everything one VU task needs from the run.
#[derive(Debug, Clone)]
pub struct VuContext {
    /// Unique across the run, starting at 1.
    pub vu_id: u64,
    pub scenario: Arc<str>,
    pub run: Arc<RunContext>,
    pub gate: Arc<IterationGate>,
    pub wait_time: WaitTime,
    pub start_signal: Arc<Signal>,
}

pub type VuSpawner = Arc<dyn Fn(VuContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Spawner that builds a fresh `U` per VU with `factory(vu_id)` and drives it.
pub fn spawner_for<U, F>(factory: F) -> VuSpawner
where
    U: VirtualUser,
    F: Fn(u64) -> U + Send + Sync + 'static,
{
    Arc::new(move |ctx: VuContext| -> BoxFuture<'static, ()> {
        let user = factory(ctx.vu_id);
        Box::pin(run_vu(user, ctx))
    })
}

/// Resolves a scenario for archetype `U`, rejecting a task table without positive weights.
pub fn scenario_for<U, F>(opts: ScenarioOptions, cfg: &RunConfig, factory: F) -> Result<ScenarioConfig>
where
    U: VirtualUser,
    F: Fn(u64) -> U + Send + Sync + 'static,
{
    if U::tasks().is_empty() {
        return Err(Error::EmptyTaskSet(opts.name));
    }
    ScenarioConfig::resolve(opts, cfg, spawner_for(factory))
}
