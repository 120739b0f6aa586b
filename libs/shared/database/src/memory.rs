use std::collections::HashMap;
use std::hash::Hash;

use tokio::sync::{RwLock, RwLockWriteGuard};

/// Keyed in-process table backing the fixture implementation of each store.
///
/// Rows are cloned in and out so callers never hold references across awaits.
pub struct MemoryTable<K, V> {
    rows: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for MemoryTable<K, V> {
    fn default() -> Self {
        Self { rows: RwLock::new(HashMap::new()) }
    }
}

impl<K, V> MemoryTable<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.rows.read().await.get(key).cloned()
    }

    /// Inserts or replaces the row, returning the previous value.
    pub async fn put(&self, key: K, value: V) -> Option<V> {
        self.rows.write().await.insert(key, value)
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        self.rows.write().await.remove(key)
    }

    /// Applies `apply` to the row in place and returns the updated copy.
    pub async fn update<F>(&self, key: &K, apply: F) -> Option<V>
    where
        F: FnOnce(&mut V),
    {
        let mut rows = self.rows.write().await;
        let row = rows.get_mut(key)?;
        apply(row);
        Some(row.clone())
    }

    pub async fn filter<F>(&self, predicate: F) -> Vec<V>
    where
        F: Fn(&V) -> bool,
    {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    pub async fn find<F>(&self, predicate: F) -> Option<V>
    where
        F: Fn(&V) -> bool,
    {
        self.rows.read().await.values().find(|row| predicate(row)).cloned()
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Exclusive access for check-then-write sequences that must not interleave.
    pub async fn lock(&self) -> RwLockWriteGuard<'_, HashMap<K, V>> {
        self.rows.write().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_replaces_existing_row() {
        let table: MemoryTable<u32, &str> = MemoryTable::new();
        assert_eq!(table.put(1, "a").await, None);
        assert_eq!(table.put(1, "b").await, Some("a"));
        assert_eq!(table.len().await, 1);
        assert_eq!(table.get(&1).await, Some("b"));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_none() {
        let table: MemoryTable<u32, String> = MemoryTable::new();
        assert!(table.update(&7, |v| v.push('x')).await.is_none());
    }
}
