use dashmap::DashMap;

/// This node's authoritative key-value map.
///
/// Safe to share behind an `Arc` between request handlers, peer calls and the
/// coordinator's own fan-outs.
#[derive(Debug, Default)]
pub struct LocalStore {
    data: DashMap<String, String>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    /// Returns `true` if the key was new or its value changed.
    pub fn put(&self, key: String, value: String) -> bool {
        match self.data.insert(key, value.clone()) {
            Some(previous) => previous != value,
            None => true,
        }
    }

    /// Returns `true` if the key existed.
    pub fn delete(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.data.clear();
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
