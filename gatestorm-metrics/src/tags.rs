use crate::key::KeyId;
use smallvec::SmallVec;

/// Sorted set of interned `(key, value)` pairs identifying one series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TagSet {
    // Request series carry at most four tags.
    pub(crate) tags: SmallVec<[(KeyId, KeyId); 4]>,
}

impl TagSet {
    /// Builds a set from pairs; duplicate keys keep the last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (KeyId, KeyId)>) -> Self {
        let mut tags: SmallVec<[(KeyId, KeyId); 4]> = SmallVec::new();
        for (k, v) in pairs {
            match tags.binary_search_by(|(ek, _)| ek.cmp(&k)) {
                Ok(idx) => tags[idx].1 = v,
                Err(idx) => tags.insert(idx, (k, v)),
            }
        }
        Self { tags }
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyId, KeyId)> + '_ {
        self.tags.iter().copied()
    }

    pub fn get(&self, key: KeyId) -> Option<KeyId> {
        self.tags
            .binary_search_by(|(k, _)| k.cmp(&key))
            .ok()
            .map(|idx| self.tags[idx].1)
    }

    /// Keeps only the given keys (missing keys are simply absent).
    pub fn project(&self, keys: &[KeyId]) -> TagSet {
        Self {
            tags: self
                .tags
                .iter()
                .copied()
                .filter(|(k, _)| keys.contains(k))
                .collect(),
        }
    }
}
