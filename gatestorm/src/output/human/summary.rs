use std::fmt::Write as _;

use gatestorm_core::{HistogramSummary, RunSummary, ScenarioSummary};

use super::format::{format_bytes, format_duration_single, format_micros_opt, format_rate};

pub(crate) fn render(summary: &RunSummary) -> String {
    let mut out = String::new();

    if summary.scenarios.is_empty() {
        out.push_str("summary: no scenarios\n");
        return out;
    }

    out.push_str("summary\n");
    for s in &summary.scenarios {
        render_scenario(s, &mut out);
        out.push('\n');
    }

    out.push_str("totals\n");
    writeln!(
        &mut out,
        "  requests: {} (failed {})",
        summary.requests_total(),
        summary.failed_requests_total()
    )
    .ok();

    let secs = summary.elapsed.as_secs_f64().max(1e-9);
    writeln!(
        &mut out,
        "  elapsed: {} rps={}",
        format_duration_single(summary.elapsed),
        format_rate(summary.requests_total() as f64 / secs)
    )
    .ok();
    writeln!(
        &mut out,
        "  checks: passed {} failed {}",
        summary.checks_passed_total(),
        summary.checks_failed_total()
    )
    .ok();

    out
}

fn render_scenario(s: &ScenarioSummary, out: &mut String) {
    writeln!(out, "scenario: {} (vus {})", s.scenario, s.vus_max).ok();
    writeln!(
        out,
        "  requests: {} (failed {})",
        s.requests_total, s.failed_requests_total
    )
    .ok();
    writeln!(
        out,
        "  bytes: recv {} sent {}",
        format_bytes(s.bytes_received_total),
        format_bytes(s.bytes_sent_total)
    )
    .ok();
    writeln!(out, "  latency: {}", latency(s.latency_us.as_ref())).ok();

    if !s.errors_by_kind.is_empty() {
        let kinds = s
            .errors_by_kind
            .iter()
            .map(|(kind, n)| format!("{kind}={n}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(out, "  errors: {kinds}").ok();
    }

    if !s.tasks.is_empty() {
        out.push_str("  tasks:\n");
        for t in &s.tasks {
            writeln!(
                out,
                "    {:<24} runs={} ok={} error={} skipped={}",
                t.task,
                t.total(),
                t.ok,
                t.error,
                t.skipped
            )
            .ok();
        }
    }

    if !s.endpoints.is_empty() {
        out.push_str("  endpoints:\n");
        for e in &s.endpoints {
            let statuses = e
                .statuses
                .iter()
                .map(|(status, n)| format!("{status}={n}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                out,
                "    {} {} requests={} failed={} [{statuses}] {}",
                e.method,
                e.name,
                e.requests,
                e.failures,
                latency(e.latency_us.as_ref())
            )
            .ok();
        }
    }

    if !s.checks.is_empty() {
        out.push_str("  checks:\n");
        for c in &s.checks {
            let mark = if c.fails == 0 { "ok  " } else { "FAIL" };
            writeln!(
                out,
                "    {mark} {:<28} passed={} failed={}",
                c.name, c.passes, c.fails
            )
            .ok();
        }
    }
}

fn latency(h: Option<&HistogramSummary>) -> String {
    match h {
        Some(h) => format!(
            "p50={} p90={} p99={} mean={} max={} (n={})",
            format_micros_opt(h.p50),
            format_micros_opt(h.p90),
            format_micros_opt(h.p99),
            format_micros_opt(h.mean),
            format_micros_opt(h.max),
            h.count
        ),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use gatestorm_core::{CheckSummary, EndpointSummary, TaskSummary};

    use super::*;

    #[test]
    fn renders_checks_tasks_and_endpoints() {
        let summary = RunSummary {
            elapsed: Duration::from_secs(2),
            scenarios: vec![ScenarioSummary {
                scenario: "JwtSecurityTester".to_string(),
                vus_max: 2,
                requests_total: 10,
                failed_requests_total: 1,
                tasks: vec![TaskSummary {
                    task: "expired_token".to_string(),
                    ok: 3,
                    error: 0,
                    skipped: 0,
                }],
                endpoints: vec![EndpointSummary {
                    name: "/api/v1/auth/me".to_string(),
                    method: "GET".to_string(),
                    requests: 10,
                    failures: 1,
                    statuses: BTreeMap::from([("200".to_string(), 7), ("401".to_string(), 3)]),
                    latency_us: None,
                }],
                checks: vec![CheckSummary {
                    name: "expired_token_rejected".to_string(),
                    passes: 2,
                    fails: 1,
                }],
                ..ScenarioSummary::default()
            }],
        };

        let out = render(&summary);
        assert!(out.contains("scenario: JwtSecurityTester (vus 2)"), "{out}");
        assert!(out.contains("GET /api/v1/auth/me requests=10 failed=1 [200=7 401=3]"), "{out}");
        assert!(out.contains("FAIL expired_token_rejected"), "{out}");
        assert!(out.contains("checks: passed 2 failed 1"), "{out}");
        assert!(out.contains("rps=5.0"), "{out}");
    }
}
