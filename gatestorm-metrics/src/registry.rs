use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::key::{Interner, KeyId};
use crate::metrics::{MetricHandle, MetricKind, MetricSeriesSummary, MetricStorage};
use crate::query::Query;
use crate::tags::TagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricId(u32);

#[derive(Debug)]
struct MetricDef {
    name: KeyId,
    kind: MetricKind,
}

/// Process-wide store of tagged metric series.
#[derive(Debug, Default)]
pub struct Registry {
    interner: Interner,
    defs: RwLock<Vec<MetricDef>>,
    storage: DashMap<MetricId, DashMap<TagSet, MetricStorage>>,
}

impl Registry {
    /// Registers `name`, or returns the existing id. The first registration fixes the kind.
    pub fn register(&self, name: &str, kind: MetricKind) -> MetricId {
        let name_id = self.interner.intern(name);

        let mut defs = self.defs.write();
        if let Some(idx) = defs.iter().position(|d| d.name == name_id) {
            return MetricId(idx as u32);
        }

        let id = MetricId(defs.len() as u32);
        defs.push(MetricDef {
            name: name_id,
            kind,
        });
        self.storage.insert(id, DashMap::new());
        id
    }

    pub fn kind(&self, metric: MetricId) -> Option<MetricKind> {
        self.defs.read().get(metric.0 as usize).map(|d| d.kind)
    }

    pub fn resolve_key(&self, key: &str) -> KeyId {
        self.interner.intern(key)
    }

    pub fn resolve_key_id(&self, id: KeyId) -> Option<Arc<str>> {
        self.interner.resolve(id)
    }

    /// Like [`Registry::resolve_key`] but never interns; used by read paths.
    pub fn lookup_key(&self, key: &str) -> Option<KeyId> {
        self.interner.lookup(key)
    }

    pub fn resolve_tags(&self, tags: &[(&str, &str)]) -> TagSet {
        TagSet::from_pairs(
            tags.iter()
                .map(|(k, v)| (self.resolve_key(k), self.resolve_key(v))),
        )
    }

    /// Returns the handle for `(metric, tags)`, creating the series on first use.
    pub fn handle(&self, metric: MetricId, tags: TagSet) -> Option<MetricHandle> {
        let series = self.storage.get(&metric)?;
        if let Some(existing) = series.get(&tags) {
            return Some(existing.handle());
        }

        let kind = self.kind(metric)?;
        let entry = series
            .entry(tags)
            .or_insert_with(|| MetricStorage::new(kind));
        Some(entry.handle())
    }

    pub fn query(&self, metric: MetricId) -> Query<'_> {
        Query::new(self, metric)
    }

    pub(crate) fn visit_series(
        &self,
        metric: MetricId,
        mut f: impl FnMut(&TagSet, &MetricStorage),
    ) {
        let Some(series) = self.storage.get(&metric) else {
            return;
        };
        for entry in series.iter() {
            f(entry.key(), entry.value());
        }
    }

    /// Flat dump of every series, sorted by name then tags.
    pub fn summarize(&self) -> Vec<MetricSeriesSummary> {
        let resolve = |id: KeyId| {
            self.interner
                .resolve(id)
                .map(|s| s.to_string())
                .unwrap_or_default()
        };

        let defs = self.defs.read();
        let mut out = Vec::new();
        for (idx, def) in defs.iter().enumerate() {
            let name = resolve(def.name);
            self.visit_series(MetricId(idx as u32), |tags, storage| {
                out.push(MetricSeriesSummary {
                    name: name.clone(),
                    kind: def.kind,
                    tags: tags.iter().map(|(k, v)| (resolve(k), resolve(v))).collect(),
                    value: storage.value(),
                });
            });
        }

        out.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.tags.cmp(&b.tags)));
        out
    }
}
