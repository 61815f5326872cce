use std::collections::HashMap;
use std::sync::atomic::Ordering;

use hdrhistogram::Histogram;
use smallvec::SmallVec;

use crate::key::KeyId;
use crate::metrics::{HistogramSummary, MetricStorage, new_default_histogram, summarize_histogram};
use crate::registry::{MetricId, Registry};
use crate::tags::TagSet;

#[derive(Debug, Clone, Copy)]
enum TagFilter {
    Eq(KeyId, KeyId),
    Has(KeyId),
    Missing(KeyId),
}

impl TagFilter {
    fn matches(self, tags: &TagSet) -> bool {
        match self {
            Self::Eq(k, v) => tags.get(k) == Some(v),
            Self::Has(k) => tags.get(k).is_some(),
            Self::Missing(k) => tags.get(k).is_none(),
        }
    }
}

/// Read-side aggregation over the series of one metric.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    registry: &'a Registry,
    metric: MetricId,
    filters: SmallVec<[TagFilter; 4]>,
    group_keys: SmallVec<[KeyId; 4]>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(registry: &'a Registry, metric: MetricId) -> Self {
        Self {
            registry,
            metric,
            filters: SmallVec::new(),
            group_keys: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn where_eq(mut self, key: KeyId, value: KeyId) -> Self {
        self.filters.push(TagFilter::Eq(key, value));
        self
    }

    #[must_use]
    pub fn where_has(mut self, key: KeyId) -> Self {
        self.filters.push(TagFilter::Has(key));
        self
    }

    #[must_use]
    pub fn where_missing(mut self, key: KeyId) -> Self {
        self.filters.push(TagFilter::Missing(key));
        self
    }

    #[must_use]
    pub fn group_by(mut self, keys: impl IntoIterator<Item = KeyId>) -> Self {
        self.group_keys = keys.into_iter().collect();
        self.group_keys.sort_unstable();
        self.group_keys.dedup();
        self
    }

    fn matches(&self, tags: &TagSet) -> bool {
        self.filters.iter().all(|f| f.matches(tags))
    }

    /// Sums matching counters per group. Zero-valued series are omitted.
    pub fn sum_counter(self) -> HashMap<TagSet, u64> {
        let mut out: HashMap<TagSet, u64> = HashMap::new();

        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            let MetricStorage::Counter(c) = storage else {
                return;
            };

            let v = c.load(Ordering::Relaxed);
            if v == 0 {
                return;
            }

            let slot = out.entry(tags.project(&self.group_keys)).or_default();
            *slot = slot.saturating_add(v);
        });

        out
    }

    pub fn sum_counter_total(self) -> u64 {
        self.sum_counter()
            .values()
            .fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn merge_histogram(self) -> HashMap<TagSet, HistogramSummary> {
        let mut acc: HashMap<TagSet, Histogram<u64>> = HashMap::new();

        self.registry.visit_series(self.metric, |tags, storage| {
            if !self.matches(tags) {
                return;
            }
            let MetricStorage::Histogram(h) = storage else {
                return;
            };

            let merged = acc
                .entry(tags.project(&self.group_keys))
                .or_insert_with(new_default_histogram);
            let _ = merged.add(&*h.lock());
        });

        acc.into_iter()
            .map(|(k, h)| (k, summarize_histogram(&h)))
            .collect()
    }

    /// Merges every matching series into one summary, ignoring `group_by`.
    pub fn merge_histogram_single(mut self) -> Option<HistogramSummary> {
        self.group_keys.clear();
        self.merge_histogram().into_values().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricKind;

    #[test]
    fn sum_counter_groups_and_filters() {
        let reg = Registry::default();
        let metric = reg.register("requests_total", MetricKind::Counter);

        let scenario_k = reg.resolve_key("scenario");
        let status_k = reg.resolve_key("status");
        let a = reg.resolve_key("jwt_security");

        for (status, n) in [("200", 10), ("401", 3)] {
            let tags = reg.resolve_tags(&[("scenario", "jwt_security"), ("status", status)]);
            if let Some(h) = reg.handle(metric, tags) {
                h.increment(n);
            }
        }
        let other = reg.resolve_tags(&[("scenario", "brute_force"), ("status", "429")]);
        if let Some(h) = reg.handle(metric, other) {
            h.increment(7);
        }

        let grouped = reg
            .query(metric)
            .where_eq(scenario_k, a)
            .group_by([status_k])
            .sum_counter();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.values().sum::<u64>(), 13);

        let unauthorized = reg.resolve_key("401");
        let only_401 = reg
            .query(metric)
            .where_eq(scenario_k, a)
            .where_eq(status_k, unauthorized)
            .sum_counter_total();
        assert_eq!(only_401, 3);

        assert_eq!(reg.query(metric).sum_counter_total(), 20);
    }

    #[test]
    fn merge_histogram_respects_missing_tag_filter() {
        let reg = Registry::default();
        let metric = reg.register("request_latency_us", MetricKind::Histogram);

        let scenario_k = reg.resolve_key("scenario");
        let name_k = reg.resolve_key("name");
        let a = reg.resolve_key("api_gateway");

        let overall = reg.resolve_tags(&[("scenario", "api_gateway")]);
        let by_name = reg.resolve_tags(&[("scenario", "api_gateway"), ("name", "/newsfeed")]);

        if let Some(h) = reg.handle(metric, overall) {
            h.observe(10);
            h.observe(20);
        }
        if let Some(h) = reg.handle(metric, by_name) {
            h.observe(999);
        }

        let summary = reg
            .query(metric)
            .where_eq(scenario_k, a)
            .where_missing(name_k)
            .merge_histogram_single()
            .unwrap_or_else(|| panic!("expected summary"));
        assert_eq!(summary.count, 2);
        assert_eq!(summary.max, Some(20.0));

        let named = reg
            .query(metric)
            .where_has(name_k)
            .merge_histogram_single()
            .unwrap_or_else(|| panic!("expected summary"));
        assert_eq!(named.count, 1);
    }

    #[test]
    fn merge_histogram_single_on_empty_metric_is_none() {
        let reg = Registry::default();
        let metric = reg.register("request_latency_us", MetricKind::Histogram);
        assert!(reg.query(metric).merge_histogram_single().is_none());
    }
}
