use std::time::Instant;

/// A client-side copy of entities the server owns (saved addresses, markers, ...).
///
/// The cache never decides on its own when it is outdated. Callers replace its
/// content with `refresh` whenever they refetch. Entries keep the order in which
/// they arrived; an updated entry moves to the back.
#[derive(Debug, Clone)]
pub struct EntityCache<K, V> {
    entries: Vec<(K, V)>,
    last_refresh: Option<Instant>,
}

impl<K: PartialEq, V> EntityCache<K, V> {
    /// Create a new, empty `EntityCache`.
    pub fn new() -> Self {
        Self {
            entries: vec![],
            last_refresh: None,
        }
    }

    /// Replaces the whole content with what `fetch` returns.
    ///
    /// On failure the previous content is kept and the error is handed back.
    pub fn refresh<E: std::fmt::Display>(
        &mut self,
        fetch: impl FnOnce() -> Result<Vec<(K, V)>, E>,
    ) -> Result<usize, E> {
        match fetch() {
            Ok(entries) => {
                self.replace_all(entries);
                self.last_refresh = Some(Instant::now());
                Ok(self.entries.len())
            }
            Err(e) => {
                log::error!("Unable to refresh cached entities. Reason:\r\n{}", e);
                Err(e)
            }
        }
    }

    pub fn replace_all(&mut self, entries: Vec<(K, V)>) {
        self.entries = entries;
    }

    /// Inserts `value`, replacing any entry with the same key.
    pub fn upsert(&mut self, key: K, value: V) {
        self.remove(&key);
        self.entries.push((key, value));
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        let i = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(i).1)
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// When the content was last replaced by a successful `refresh`.
    pub fn last_refresh(&self) -> Option<Instant> {
        self.last_refresh
    }
}

impl<K: PartialEq, V> Default for EntityCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[test]
fn upsert_replaces_and_moves_to_the_back() {
    let mut cache = EntityCache::new();
    cache.upsert("a", 1);
    cache.upsert("b", 2);
    cache.upsert("a", 3);

    let entries: Vec<_> = cache.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries, vec![("b", 2), ("a", 3)]);
    assert_eq!(cache.get(&"a"), Some(&3));
}

#[test]
fn failed_refresh_keeps_previous_content() {
    let mut cache = EntityCache::new();
    assert_eq!(cache.refresh(|| Ok::<_, String>(vec![(1, "home")])), Ok(1));
    assert!(cache.last_refresh().is_some());

    let result = cache.refresh(|| Err("backend unreachable".to_string()));

    assert_eq!(result, Err("backend unreachable".to_string()));
    assert_eq!(cache.get(&1), Some(&"home"));
    assert_eq!(cache.remove(&1), Some("home"));
    assert!(cache.is_empty());
}
