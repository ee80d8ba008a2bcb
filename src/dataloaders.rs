//! DataLoader utilities for batch loading
///
/// Implements the DataLoader pattern for preventing N+1 scans when many
/// posts in one response select their comments.
/// See: https://github.com/graphql/dataloader

use async_trait::async_trait;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::store::{Comment, SharedStore};

/// Batch loader trait for loading multiple items at once
#[async_trait]
pub trait BatchLoader<K, V>: Send + Sync
where
    K: Send + Sync + Clone + Eq + Hash,
    V: Send + Sync + Clone,
{
    /// Load batch of items by keys
    ///
    /// This method should fetch all items for the given keys in a single
    /// pass over the backing collection.
    async fn load_batch(&self, keys: &[K]) -> HashMap<K, V>;
}

/// DataLoader with caching and batching
///
/// Lives for a single request; results are cached per key so repeated
/// loads of the same key never hit the backing store twice.
pub struct DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    loader: Arc<L>,
    cache: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V, L> DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    /// Create new DataLoader with a batch loader
    pub fn new(loader: L) -> Self {
        Self {
            loader: Arc::new(loader),
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Load a single item by key
    ///
    /// Checks cache first, then falls back to batch loading if needed.
    pub async fn load(&self, key: K) -> Option<V> {
        {
            let cache = self.cache.lock().await;
            if let Some(value) = cache.get(&key) {
                return Some(value.clone());
            }
        }

        let results = self.loader.load_batch(std::slice::from_ref(&key)).await;

        {
            let mut cache = self.cache.lock().await;
            for (k, v) in results.iter() {
                cache.insert(k.clone(), v.clone());
            }
        }

        results.get(&key).cloned()
    }

    /// Load multiple items by keys
    ///
    /// Batches keys that aren't in cache and loads them together.
    pub async fn load_many(&self, keys: Vec<K>) -> HashMap<K, V> {
        let mut result = HashMap::new();
        let mut uncached_keys = Vec::new();

        {
            let cache = self.cache.lock().await;
            for key in keys {
                if let Some(value) = cache.get(&key) {
                    result.insert(key, value.clone());
                } else if !uncached_keys.contains(&key) {
                    uncached_keys.push(key);
                }
            }
        }

        if !uncached_keys.is_empty() {
            let batch_results = self.loader.load_batch(&uncached_keys).await;

            let mut cache = self.cache.lock().await;
            for (k, v) in batch_results {
                cache.insert(k.clone(), v.clone());
                result.insert(k, v);
            }
        }

        result
    }
}

impl<K, V, L> Clone for DataLoader<K, V, L>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    L: BatchLoader<K, V> + 'static,
{
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            cache: self.cache.clone(),
        }
    }
}

/// Loads comment lists keyed by post id
pub struct CommentsByPostLoader {
    store: SharedStore,
}

impl CommentsByPostLoader {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl BatchLoader<String, Vec<Comment>> for CommentsByPostLoader {
    async fn load_batch(&self, keys: &[String]) -> HashMap<String, Vec<Comment>> {
        self.store.comments_by_post_ids(keys)
    }
}

/// Request-scoped comment loader attached to each GraphQL request
pub type CommentLoader = DataLoader<String, Vec<Comment>, CommentsByPostLoader>;

impl CommentLoader {
    /// Fresh loader with an empty cache
    pub fn for_store(store: SharedStore) -> Self {
        DataLoader::new(CommentsByPostLoader::new(store))
    }
}
