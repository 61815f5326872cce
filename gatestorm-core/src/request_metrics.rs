use gatestorm_metrics::{MetricId, MetricKind, Registry};

#[derive(Debug, Clone, Copy)]
pub struct RequestMetricIds {
    pub requests_total: MetricId,
    pub failures_total: MetricId,
    pub errors_by_kind_total: MetricId,
    pub bytes_received_total: MetricId,
    pub bytes_sent_total: MetricId,
    /// Request latency in microseconds.
    pub latency_us: MetricId,
}

#[derive(Debug, Clone, Copy)]
pub struct RequestSample<'a> {
    pub scenario: &'a str,
    /// Endpoint label, usually a route template such as `/api/v1/newsfeed/{userId}`.
    pub name: &'a str,
    pub method: &'a str,
    /// `None` when the transport failed before a status was received.
    pub status: Option<u16>,
    pub failed: bool,
    pub latency: std::time::Duration,
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub error_kind: Option<&'a str>,
}

impl RequestMetricIds {
    pub fn register(metrics: &Registry) -> Self {
        Self {
            requests_total: metrics.register("requests_total", MetricKind::Counter),
            failures_total: metrics.register("request_failures_total", MetricKind::Counter),
            errors_by_kind_total: metrics
                .register("request_errors_by_kind_total", MetricKind::Counter),
            bytes_received_total: metrics.register("bytes_received_total", MetricKind::Counter),
            bytes_sent_total: metrics.register("bytes_sent_total", MetricKind::Counter),
            latency_us: metrics.register("request_latency_us", MetricKind::Histogram),
        }
    }

    pub fn record_request(&self, metrics: &Registry, sample: RequestSample<'_>) {
        let status = sample
            .status
            .map_or_else(|| "error".to_string(), |s| s.to_string());

        let counter = |id: MetricId, tags: &[(&str, &str)], value: u64| {
            if let Some(h) = metrics.handle(id, metrics.resolve_tags(tags)) {
                h.increment(value);
            }
        };

        counter(
            self.requests_total,
            &[
                ("scenario", sample.scenario),
                ("name", sample.name),
                ("method", sample.method),
                ("status", status.as_str()),
            ],
            1,
        );

        let scenario_only = [("scenario", sample.scenario)];
        counter(self.bytes_received_total, &scenario_only, sample.bytes_received);
        counter(self.bytes_sent_total, &scenario_only, sample.bytes_sent);

        if sample.failed {
            counter(
                self.failures_total,
                &[
                    ("scenario", sample.scenario),
                    ("name", sample.name),
                    ("method", sample.method),
                ],
                1,
            );
        }

        if let Some(kind) = sample.error_kind {
            counter(
                self.errors_by_kind_total,
                &[("scenario", sample.scenario), ("error_kind", kind)],
                1,
            );
        }

        // Latency histogram (two series: scenario-wide + per endpoint)
        let latency_us: u64 = sample.latency.as_micros().try_into().unwrap_or(u64::MAX);
        for tags in [
            metrics.resolve_tags(&scenario_only),
            metrics.resolve_tags(&[
                ("scenario", sample.scenario),
                ("name", sample.name),
                ("method", sample.method),
            ]),
        ] {
            if let Some(h) = metrics.handle(self.latency_us, tags) {
                h.observe(latency_us);
            }
        }
    }
}
