use hdrhistogram::Histogram;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

#[derive(Debug, Clone)]
pub struct MetricSeriesSummary {
    pub name: String,
    pub kind: MetricKind,
    pub tags: Vec<(String, String)>,
    pub value: MetricValue,
}

#[derive(Debug, Clone)]
pub enum MetricValue {
    Counter(u64),
    Gauge(i64),
    Histogram(HistogramSummary),
}

/// Percentile view of a histogram. All values share the recorded unit.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSummary {
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub p90: Option<f64>,
    pub p95: Option<f64>,
    pub p99: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub count: u64,
}

pub(crate) fn new_default_histogram() -> Histogram<u64> {
    // 1us .. 1h, three significant figures.
    match Histogram::<u64>::new_with_bounds(1, 3_600_000_000, 3) {
        Ok(h) => h,
        Err(err) => panic!("failed to create histogram: {err}"),
    }
}

pub(crate) fn summarize_histogram(h: &Histogram<u64>) -> HistogramSummary {
    let count = h.len();
    let any = count > 0;
    let q = |quantile: f64| any.then(|| h.value_at_quantile(quantile) as f64);

    HistogramSummary {
        p50: q(0.50),
        p75: q(0.75),
        p90: q(0.90),
        p95: q(0.95),
        p99: q(0.99),
        min: any.then(|| h.min() as f64),
        max: any.then(|| h.max() as f64),
        mean: any.then(|| h.mean()),
        stdev: any.then(|| h.stdev()),
        count,
    }
}

#[derive(Debug)]
pub(crate) enum MetricStorage {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>),
    Histogram(Arc<Mutex<Histogram<u64>>>),
}

impl MetricStorage {
    pub(crate) fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Self::Counter(Arc::new(AtomicU64::new(0))),
            MetricKind::Gauge => Self::Gauge(Arc::new(AtomicI64::new(0))),
            MetricKind::Histogram => Self::Histogram(Arc::new(Mutex::new(new_default_histogram()))),
        }
    }

    pub(crate) fn handle(&self) -> MetricHandle {
        match self {
            Self::Counter(c) => MetricHandle::Counter(c.clone()),
            Self::Gauge(g) => MetricHandle::Gauge(g.clone()),
            Self::Histogram(h) => MetricHandle::Histogram(h.clone()),
        }
    }

    pub(crate) fn value(&self) -> MetricValue {
        match self {
            Self::Counter(c) => MetricValue::Counter(c.load(Ordering::Relaxed)),
            Self::Gauge(g) => MetricValue::Gauge(g.load(Ordering::Relaxed)),
            Self::Histogram(h) => MetricValue::Histogram(summarize_histogram(&h.lock())),
        }
    }
}

/// Write handle for one series. Operations on the wrong kind are no-ops.
#[derive(Debug, Clone)]
pub enum MetricHandle {
    Counter(Arc<AtomicU64>),
    Gauge(Arc<AtomicI64>),
    Histogram(Arc<Mutex<Histogram<u64>>>),
}

impl MetricHandle {
    #[inline]
    pub fn increment(&self, value: u64) {
        if let Self::Counter(c) = self {
            c.fetch_add(value, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn add_gauge(&self, delta: i64) -> i64 {
        match self {
            Self::Gauge(g) => g.fetch_add(delta, Ordering::Relaxed).saturating_add(delta),
            _ => 0,
        }
    }

    /// Raises the gauge to `value` if it is currently lower.
    #[inline]
    pub fn max_gauge(&self, value: i64) {
        if let Self::Gauge(g) = self {
            g.fetch_max(value, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn observe(&self, value: u64) {
        if let Self::Histogram(h) = self {
            let _ = h.lock().record(value.max(1));
        }
    }

    pub fn counter(&self) -> u64 {
        match self {
            Self::Counter(c) => c.load(Ordering::Relaxed),
            _ => 0,
        }
    }

    pub fn gauge(&self) -> i64 {
        match self {
            Self::Gauge(g) => g.load(Ordering::Relaxed),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarize_histogram_empty_has_no_stats() {
        let s = summarize_histogram(&new_default_histogram());
        assert_eq!(s.count, 0);
        assert!(s.p50.is_none());
        assert!(s.min.is_none());
        assert!(s.stdev.is_none());
    }

    #[test]
    fn summarize_histogram_non_empty_has_stats() {
        let mut h = new_default_histogram();
        for v in [10, 20, 30] {
            let _ = h.record(v);
        }

        let s = summarize_histogram(&h);
        assert_eq!(s.count, 3);
        assert_eq!(s.min, Some(10.0));
        assert_eq!(s.max, Some(30.0));
        assert!(s.p95.is_some());
        assert!(s.mean.is_some());
    }

    #[test]
    fn handles_ignore_mismatched_operations() {
        let c = MetricStorage::new(MetricKind::Counter).handle();
        c.increment(2);
        c.increment(3);
        c.observe(99);
        assert_eq!(c.counter(), 5);
        assert_eq!(c.gauge(), 0);

        let g = MetricStorage::new(MetricKind::Gauge).handle();
        assert_eq!(g.add_gauge(4), 4);
        assert_eq!(g.add_gauge(-1), 3);
        g.max_gauge(2);
        assert_eq!(g.gauge(), 3);
        g.max_gauge(7);
        assert_eq!(g.gauge(), 7);
    }

    #[test]
    fn histogram_handle_clamps_zero() {
        let storage = MetricStorage::new(MetricKind::Histogram);
        let h = storage.handle();
        h.observe(0);
        h.observe(20);

        let MetricValue::Histogram(s) = storage.value() else {
            panic!("expected histogram value");
        };
        assert_eq!(s.count, 2);
        assert_eq!(s.min, Some(1.0));
    }
}
