use std::fmt::Write as _;

use gatestorm_core::{RunSummary, ScenarioConfig};
use gatestorm_gateway::{Archetype, GatewayConfig};

mod format;
mod summary;

use format::format_duration_single;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &GatewayConfig, scenarios: &[ScenarioConfig]) {
        println!("target: {}", cfg.url(""));
        for s in scenarios {
            println!(
                "scenario: {} vus={} iterations={:?} duration={:?} wait={}..{}",
                s.name,
                s.vus,
                s.iterations,
                s.duration,
                format_duration_single(s.wait_time.min()),
                format_duration_single(s.wait_time.max()),
            );
        }
        if !scenarios.is_empty() {
            println!();
        }
    }

    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()> {
        print!("{}", render(summary));
        Ok(())
    }
}

pub(crate) fn render_archetypes(cfg: &GatewayConfig) -> String {
    let mut out = String::new();
    for archetype in Archetype::ALL {
        let settings = cfg.archetypes.get(archetype);
        let wait = settings.wait.unwrap_or_else(|| archetype.default_wait());
        writeln!(
            &mut out,
            "{archetype} ({}) wait={}..{}{}",
            archetype.scenario_name(),
            format_duration_single(wait.min.into_inner()),
            format_duration_single(wait.max.into_inner()),
            if settings.enabled { "" } else { " disabled" },
        )
        .ok();

        let weights = archetype.task_weights();
        let total: u32 = weights.iter().map(|(_, w)| *w).sum();
        for (task, weight) in weights {
            let share = if total == 0 {
                0.0
            } else {
                f64::from(weight) * 100.0 / f64::from(total)
            };
            writeln!(&mut out, "  {task:<24} weight={weight:<3} ({share:.0}%)").ok();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_listing_shows_tasks_and_waits() {
        let mut cfg = GatewayConfig::default();
        cfg.archetypes.brute_force.enabled = false;

        let out = render_archetypes(&cfg);
        assert!(out.contains("api-gateway (ApiGatewayUser) wait=1s..3s"), "{out}");
        assert!(out.contains("jwt-blacklist (JwtBlacklistTester) wait=3s..5s"), "{out}");
        assert!(
            out.contains("brute-force (BruteForceProtectionTester) wait=100ms..500ms disabled"),
            "{out}"
        );
        assert!(out.contains("get_user_news_feed"), "{out}");
    }
}
