use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Interned identifier for a metric name, tag key or tag value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u32);

impl From<u32> for KeyId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<KeyId> for u32 {
    fn from(v: KeyId) -> Self {
        v.0
    }
}

#[derive(Debug, Default)]
struct Table {
    ids: HashMap<Arc<str>, KeyId>,
    strings: Vec<Arc<str>>,
}

#[derive(Debug, Default)]
pub(crate) struct Interner {
    table: RwLock<Table>,
}

impl Interner {
    pub(crate) fn intern(&self, s: &str) -> KeyId {
        if let Some(id) = self.lookup(s) {
            return id;
        }

        let mut table = self.table.write();
        // Another writer may have won the race between the read and write lock.
        if let Some(&id) = table.ids.get(s) {
            return id;
        }

        let id = KeyId(table.strings.len() as u32);
        let s: Arc<str> = Arc::from(s);
        table.strings.push(s.clone());
        table.ids.insert(s, id);
        id
    }

    pub(crate) fn lookup(&self, s: &str) -> Option<KeyId> {
        self.table.read().ids.get(s).copied()
    }

    pub(crate) fn resolve(&self, id: KeyId) -> Option<Arc<str>> {
        self.table.read().strings.get(id.0 as usize).cloned()
    }
}
