use crate::cli::OutputFormat;

use gatestorm_core::{RunSummary, ScenarioConfig};
use gatestorm_gateway::GatewayConfig;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &GatewayConfig, scenarios: &[ScenarioConfig]);
    fn print_summary(&self, summary: &RunSummary) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}

pub(crate) use human::render_archetypes;
pub(crate) use json::emit_archetypes;
