use std::sync::Arc;

use gatestorm_metrics::{MetricHandle, MetricId, MetricKind, Registry, TagSet};
use strum::{Display, EnumString, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum TaskOutcome {
    Ok,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskMetricIds {
    pub tasks_total: MetricId,
    /// Task duration in microseconds.
    pub task_duration_us: MetricId,
    pub checks: MetricId,
    pub vus_active: MetricId,
    pub vus_active_max: MetricId,
}

impl TaskMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            tasks_total: metrics.register("tasks_total", MetricKind::Counter),
            task_duration_us: metrics.register("task_duration_us", MetricKind::Histogram),
            checks: metrics.register("checks", MetricKind::Counter),
            vus_active: metrics.register("vus_active", MetricKind::Gauge),
            vus_active_max: metrics.register("vus_active_max", MetricKind::Gauge),
        }
    }

    pub fn record_task(
        &self,
        metrics: &Registry,
        scenario: &str,
        task: &str,
        outcome: TaskOutcome,
        duration: std::time::Duration,
    ) {
        let status: &'static str = outcome.into();
        let tags = metrics.resolve_tags(&[
            ("scenario", scenario),
            ("task", task),
            ("status", status),
        ]);
        if let Some(h) = metrics.handle(self.tasks_total, tags) {
            h.increment(1);
        }

        let duration_us: u64 = duration.as_micros().try_into().unwrap_or(u64::MAX);
        let tags = metrics.resolve_tags(&[("scenario", scenario), ("task", task)]);
        if let Some(h) = metrics.handle(self.task_duration_us, tags) {
            h.observe(duration_us);
        }
    }

    pub fn record_check(&self, metrics: &Registry, scenario: &str, name: &str, passed: bool) {
        let status = if passed { "pass" } else { "fail" };
        let tags = metrics.resolve_tags(&[("scenario", scenario), ("name", name), ("status", status)]);
        if let Some(h) = metrics.handle(self.checks, tags) {
            h.increment(1);
        }
    }

    pub fn enter_active_vu(&self, metrics: &Arc<Registry>, scenario: &str) -> ActiveVuGuard {
        let tags = metrics.resolve_tags(&[("scenario", scenario)]);
        let active = metrics.handle(self.vus_active, tags.clone());

        if let Some(active) = &active {
            let now = active.add_gauge(1);
            // Keep the peak so the summary does not report zero once every VU has exited.
            if let Some(peak) = metrics.handle(self.vus_active_max, tags) {
                peak.max_gauge(now);
            }
        }

        ActiveVuGuard { active }
    }
}

pub struct ActiveVuGuard {
    active: Option<MetricHandle>,
}

impl Drop for ActiveVuGuard {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.add_gauge(-1);
        }
    }
}

/// Tags for scenario-scoped lookups.
pub(crate) fn scenario_tags(metrics: &Registry, scenario: &str) -> TagSet {
    metrics.resolve_tags(&[("scenario", scenario)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn active_vu_guard_tracks_peak() {
        let metrics = Arc::new(Registry::default());
        let ids = TaskMetricIds::register(&metrics);

        let a = ids.enter_active_vu(&metrics, "s");
        let b = ids.enter_active_vu(&metrics, "s");
        drop(a);
        drop(b);

        let tags = scenario_tags(&metrics, "s");
        let active = metrics
            .handle(ids.vus_active, tags.clone())
            .map(|h| h.gauge());
        let peak = metrics.handle(ids.vus_active_max, tags).map(|h| h.gauge());
        assert_eq!(active, Some(0));
        assert_eq!(peak, Some(2));
    }

    #[test]
    fn task_outcomes_are_tagged() {
        let metrics = Registry::default();
        let ids = TaskMetricIds::register(&metrics);

        ids.record_task(&metrics, "s", "a", TaskOutcome::Ok, Duration::from_millis(1));
        ids.record_task(&metrics, "s", "a", TaskOutcome::Error, Duration::from_millis(1));
        ids.record_task(&metrics, "s", "b", TaskOutcome::Skipped, Duration::ZERO);

        let status = metrics.resolve_key("status");
        let skipped = metrics.resolve_key("skipped");
        assert_eq!(metrics.query(ids.tasks_total).sum_counter_total(), 3);
        assert_eq!(
            metrics
                .query(ids.tasks_total)
                .where_eq(status, skipped)
                .sum_counter_total(),
            1
        );
    }

    #[test]
    fn checks_count_pass_and_fail() {
        let metrics = Registry::default();
        let ids = TaskMetricIds::register(&metrics);

        ids.record_check(&metrics, "s", "c", true);
        ids.record_check(&metrics, "s", "c", false);
        ids.record_check(&metrics, "s", "c", false);

        let status = metrics.resolve_key("status");
        let fail = metrics.resolve_key("fail");
        assert_eq!(
            metrics
                .query(ids.checks)
                .where_eq(status, fail)
                .sum_counter_total(),
            2
        );
    }
}
