use std::time::Duration;

use crate::error::{Error, Result};
use crate::scenario::VuSpawner;

/// Run-shape overrides coming from the command line. They win over scenario values.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
}

/// Pause between two task invocations of one virtual user, drawn uniformly from `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTime {
    min: Duration,
    max: Duration,
}

impl WaitTime {
    pub const ZERO: WaitTime = WaitTime {
        min: Duration::ZERO,
        max: Duration::ZERO,
    };

    pub fn between(min: Duration, max: Duration) -> Result<Self> {
        if min > max {
            return Err(Error::InvalidWaitTime { min, max });
        }
        Ok(Self { min, max })
    }

    pub const fn constant(d: Duration) -> Self {
        Self { min: d, max: d }
    }

    pub fn min(&self) -> Duration {
        self.min
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn sample(&self, rng: &mut fastrand::Rng) -> Duration {
        let span = self.max.saturating_sub(self.min);
        if span.is_zero() {
            return self.min;
        }

        let span_ns = u64::try_from(span.as_nanos()).unwrap_or(u64::MAX);
        self.min + Duration::from_nanos(rng.u64(0..=span_ns))
    }
}

/// Per-scenario settings before CLI overrides are applied.
#[derive(Debug, Clone)]
pub struct ScenarioOptions {
    pub name: String,
    pub vus: Option<u64>,
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub wait_time: WaitTime,
}

impl ScenarioOptions {
    pub fn new(name: impl Into<String>, wait_time: WaitTime) -> Self {
        Self {
            name: name.into(),
            vus: None,
            iterations: None,
            duration: None,
            wait_time,
        }
    }
}

#[derive(Clone)]
pub struct ScenarioConfig {
    pub name: String,
    pub vus: u64,
    /// Task invocations shared by all VUs of the scenario.
    pub iterations: Option<u64>,
    pub duration: Option<Duration>,
    pub wait_time: WaitTime,
    pub spawner: VuSpawner,
}

impl std::fmt::Debug for ScenarioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioConfig")
            .field("name", &self.name)
            .field("vus", &self.vus)
            .field("iterations", &self.iterations)
            .field("duration", &self.duration)
            .field("wait_time", &self.wait_time)
            .finish_non_exhaustive()
    }
}

impl ScenarioConfig {
    /// Applies `cfg` over `opts`. Without iterations or duration a scenario runs one task.
    pub fn resolve(opts: ScenarioOptions, cfg: &RunConfig, spawner: VuSpawner) -> Result<Self> {
        let vus = cfg.vus.or(opts.vus).unwrap_or(1);
        if vus == 0 {
            return Err(Error::InvalidVus(opts.name));
        }

        let duration = cfg.duration.or(opts.duration);
        if duration.is_some_and(|d| d.is_zero()) {
            return Err(Error::InvalidDuration(opts.name));
        }

        let iterations = cfg
            .iterations
            .or(opts.iterations)
            .or_else(|| duration.is_none().then_some(1));
        if iterations == Some(0) {
            return Err(Error::InvalidIterations(opts.name));
        }

        Ok(Self {
            name: opts.name,
            vus,
            iterations,
            duration,
            wait_time: opts.wait_time,
            spawner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_time_rejects_inverted_bounds() {
        let err = WaitTime::between(Duration::from_secs(3), Duration::from_secs(1));
        assert!(matches!(err, Err(Error::InvalidWaitTime { .. })));
    }

    #[test]
    fn wait_time_samples_within_bounds() {
        let wait = WaitTime::between(Duration::from_millis(100), Duration::from_millis(500))
            .unwrap_or_else(|e| panic!("{e}"));
        let mut rng = fastrand::Rng::with_seed(7);

        let mut saw_low = false;
        let mut saw_high = false;
        for _ in 0..2_000 {
            let d = wait.sample(&mut rng);
            assert!(d >= wait.min() && d <= wait.max(), "out of range: {d:?}");
            saw_low |= d < Duration::from_millis(200);
            saw_high |= d > Duration::from_millis(400);
        }
        assert!(saw_low && saw_high);
    }

    #[test]
    fn constant_wait_time_is_exact() {
        let wait = WaitTime::constant(Duration::from_millis(250));
        let mut rng = fastrand::Rng::with_seed(1);
        assert_eq!(wait.sample(&mut rng), Duration::from_millis(250));
        assert_eq!(WaitTime::ZERO.sample(&mut rng), Duration::ZERO);
    }
}
