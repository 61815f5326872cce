use anyhow::Context as _;
use std::path::Path;
use std::sync::Arc;

use gatestorm_core::{HttpClient, RunConfig, RunContext, Signal, run_scenarios};
use gatestorm_gateway::{GatewayConfig, UserDirectory, build_scenarios, discover};
use tracing::{info, warn};

use crate::cli::{ListArgs, OutputFormat, RunArgs};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let cfg = gateway_config(&args).await.map_err(RunError::InvalidInput)?;
    let cfg = Arc::new(cfg);
    let run_cfg = run_config(&args);

    let client = HttpClient::default();
    let directory = if cfg.discovery {
        discover(&client, &cfg).await
    } else {
        info!("user discovery disabled");
        UserDirectory::default()
    };
    if directory.is_empty() {
        warn!("user directory is empty; per-user feeds and messages will be skipped");
    }
    let directory = Arc::new(directory);

    let scenarios = build_scenarios(&cfg, &directory, &run_cfg, &args.archetypes)
        .context("invalid run configuration")
        .map_err(RunError::InvalidInput)?;

    let stop = Arc::new(Signal::new());
    spawn_ctrl_c(stop.clone());

    let run = Arc::new(
        RunContext::new(&cfg.host, &cfg.prefix, client)
            .with_seed(args.seed)
            .with_stop(stop),
    );

    out.print_header(&cfg, &scenarios);
    let summary = run_scenarios(scenarios, run)
        .await
        .context("run failed")
        .map_err(RunError::RuntimeError)?;
    out.print_summary(&summary)
        .map_err(RunError::RuntimeError)?;

    Ok(ExitCode::from_checks(summary.checks_failed_total()))
}

pub fn list(args: ListArgs) -> anyhow::Result<()> {
    let cfg = GatewayConfig::default();
    match args.output {
        OutputFormat::HumanReadable => print!("{}", output::render_archetypes(&cfg)),
        OutputFormat::Json => output::emit_archetypes(&cfg)?,
    }
    Ok(())
}

/// Defaults, then the config file, then CLI flags.
async fn gateway_config(args: &RunArgs) -> anyhow::Result<GatewayConfig> {
    let mut cfg = match &args.config {
        Some(path) => load_config(path).await?,
        None => GatewayConfig::default(),
    };

    if let Some(host) = &args.host {
        cfg.host = host.clone();
    }
    if let Some(prefix) = &args.prefix {
        cfg.prefix = prefix.clone();
    }
    if args.no_discovery {
        cfg.discovery = false;
    }

    if !(cfg.host.starts_with("http://") || cfg.host.starts_with("https://")) {
        anyhow::bail!(
            "invalid host `{}` (expected http:// or https:// scheme)",
            cfg.host
        );
    }
    Ok(cfg)
}

async fn load_config(path: &Path) -> anyhow::Result<GatewayConfig> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    GatewayConfig::from_yaml_slice(&bytes)
        .with_context(|| format!("failed to load config: {}", path.display()))
}

fn run_config(args: &RunArgs) -> RunConfig {
    RunConfig {
        vus: args.users,
        iterations: args.iterations,
        duration: args.duration,
    }
}

fn spawn_ctrl_c(stop: Arc<Signal>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted; stopping virtual users");
            stop.fire();
        }
    });
}
