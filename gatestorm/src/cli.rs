use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use gatestorm_gateway::Archetype;

const DURATION_HINT: &str = "expected e.g. 10s, 250ms, 1m";

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err(format!("duration cannot be empty ({DURATION_HINT})"));
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!("invalid duration '{s}' ({DURATION_HINT})"));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' ({DURATION_HINT})"))?;

    let too_large = || format!("duration '{s}' is too large");
    match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => value
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        "h" | "hr" | "hrs" | "hour" | "hours" => value
            .checked_mul(60 * 60)
            .map(Duration::from_secs)
            .ok_or_else(too_large),
        _ => Err(format!("invalid duration '{s}' ({DURATION_HINT})")),
    }
}

fn parse_archetype(input: &str) -> Result<Archetype, String> {
    Archetype::from_str(input.trim()).map_err(|_| {
        let known = Archetype::ALL
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        format!("unknown archetype '{input}' (expected one of: {known})")
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    HumanReadable,
    /// Single JSON summary document on stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "gatestorm",
    author,
    version,
    about = "Load and security probing for HTTP API gateways",
    long_about = "gatestorm drives virtual users against an HTTP API gateway.\n\nFive archetypes are available: general authenticated traffic, JWT validation probes, token revocation after logout, session-cookie observation and rate-limit probing. Probes record named checks; any failed check makes the run exit with code 10.",
    after_help = "Examples:\n  gatestorm run --host http://localhost:3001 --duration 1m\n  gatestorm run --archetype jwt-security --archetype jwt-blacklist --iterations 200\n  gatestorm run --config gateway.yaml --users 20 --output json\n  gatestorm list"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run archetypes against a gateway
    #[command(
        long_about = "Run the selected archetypes (all enabled ones by default) against the gateway.\n\nCLI flags override values from the config file, which override built-in defaults."
    )]
    Run(RunArgs),

    /// List archetypes with their tasks and default pacing
    List(ListArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Gateway scheme and authority (e.g. http://localhost:3001)
    #[arg(long, env = "GATESTORM_HOST")]
    pub host: Option<String>,

    /// Path prefix of every API route (e.g. /api/v1)
    #[arg(long)]
    pub prefix: Option<String>,

    /// YAML config file (identities, probes, per-archetype users and waits)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Archetype to run (repeatable). Defaults to every enabled archetype.
    #[arg(long = "archetype", value_name = "NAME", value_parser = parse_archetype)]
    pub archetypes: Vec<Archetype>,

    /// Virtual users per archetype
    #[arg(long)]
    pub users: Option<u64>,

    /// Task invocations per archetype, shared by its virtual users
    #[arg(long)]
    pub iterations: Option<u64>,

    /// Test duration (e.g. 10s, 250ms, 1m)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Skip admin discovery of the user directory
    #[arg(long)]
    pub no_discovery: bool,

    /// Seed for reproducible task selection and pacing
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log filter used when RUST_LOG is unset (e.g. info, gatestorm_gateway=debug)
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("10"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
    }

    #[test]
    fn parse_archetype_lists_known_names() {
        assert_eq!(parse_archetype("brute-force"), Ok(Archetype::BruteForce));
        let err = parse_archetype("nope").err().unwrap_or_default();
        assert!(err.contains("api-gateway"), "{err}");
        assert!(err.contains("session-security"), "{err}");
    }

    #[test]
    fn cli_parses_run() {
        let parsed = Cli::try_parse_from([
            "gatestorm",
            "run",
            "--host",
            "http://gw:8080",
            "--prefix",
            "/api/v2",
            "--archetype",
            "jwt-security",
            "--archetype",
            "jwt-blacklist",
            "--users",
            "5",
            "--iterations",
            "100",
            "--duration",
            "30s",
            "--no-discovery",
            "--seed",
            "9",
            "--output",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.host.as_deref(), Some("http://gw:8080"));
                assert_eq!(args.prefix.as_deref(), Some("/api/v2"));
                assert_eq!(
                    args.archetypes,
                    vec![Archetype::JwtSecurity, Archetype::JwtBlacklist]
                );
                assert_eq!(args.users, Some(5));
                assert_eq!(args.iterations, Some(100));
                assert_eq!(args.duration, Some(Duration::from_secs(30)));
                assert!(args.no_discovery);
                assert_eq!(args.seed, Some(9));
                assert_eq!(args.log_level, "warn");
                assert_eq!(args.output, OutputFormat::Json);
            }
            Command::List(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_archetype() {
        let parsed = Cli::try_parse_from(["gatestorm", "run", "--archetype", "ddos"]);
        assert!(parsed.is_err());
    }
}
