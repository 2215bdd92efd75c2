use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

/// Callback receiving the full current value at a subscribed path (`None` once deleted).
pub type ChangeCallback = Arc<dyn Fn(Option<Value>) + Send + Sync>;

/// Handle returned by [`RecordStore::on_change`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Hierarchical JSON store addressed by slash-separated paths.
pub trait RecordStore: Send + Sync {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError>;
    /// Writes `value` at `path`; `null` deletes.
    fn set(&self, path: &str, value: Value) -> Result<(), StoreError>;
    /// Appends under a fresh, ordered key and returns that key.
    fn push(&self, path: &str, value: Value) -> Result<String, StoreError>;
    /// Delivers the current value immediately, then after every write touching `path`.
    fn on_change(&self, path: &str, callback: ChangeCallback)
        -> Result<SubscriptionId, StoreError>;
    fn off(&self, id: SubscriptionId) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("path '{0}' is not addressable")]
    InvalidPath(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

struct Subscription {
    segments: Vec<String>,
    callback: ChangeCallback,
}

/// In-process [`RecordStore`] backed by a single JSON tree.
///
/// Callbacks run after the tree lock is released, so they may write back into the store.
#[derive(Default)]
pub struct MemoryRecordStore {
    root: Mutex<Value>,
    subscriptions: Mutex<BTreeMap<SubscriptionId, Subscription>>,
    next_subscription: AtomicU64,
    next_push: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .map(|subscriptions| subscriptions.len())
            .unwrap_or_default()
    }

    fn read(&self, segments: &[String]) -> Result<Option<Value>, StoreError> {
        let root = self.root.lock().map_err(poisoned)?;
        Ok(lookup(&root, segments).filter(|value| !value.is_null()).cloned())
    }

    fn write(&self, segments: &[String], value: Value) -> Result<(), StoreError> {
        {
            let mut root = self.root.lock().map_err(poisoned)?;
            if value.is_null() {
                remove(&mut root, segments);
            } else {
                insert(&mut root, segments, value);
            }
        }
        self.notify(segments)
    }

    fn notify(&self, written: &[String]) -> Result<(), StoreError> {
        let interested: Vec<(Vec<String>, ChangeCallback)> = {
            let subscriptions = self.subscriptions.lock().map_err(poisoned)?;
            subscriptions
                .values()
                .filter(|subscription| overlaps(&subscription.segments, written))
                .map(|subscription| (subscription.segments.clone(), subscription.callback.clone()))
                .collect()
        };

        for (segments, callback) in interested {
            let current = self.read(&segments)?;
            callback(current);
        }
        Ok(())
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, path: &str) -> Result<Option<Value>, StoreError> {
        self.read(&split_path(path))
    }

    fn set(&self, path: &str, value: Value) -> Result<(), StoreError> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        self.write(&segments, value)
    }

    fn push(&self, path: &str, value: Value) -> Result<String, StoreError> {
        let sequence = self.next_push.fetch_add(1, Ordering::Relaxed) + 1;
        let key = format!("-L{sequence:010}");
        let mut segments = split_path(path);
        segments.push(key.clone());
        self.write(&segments, value)?;
        Ok(key)
    }

    fn on_change(
        &self,
        path: &str,
        callback: ChangeCallback,
    ) -> Result<SubscriptionId, StoreError> {
        let segments = split_path(path);
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        {
            let mut subscriptions = self.subscriptions.lock().map_err(poisoned)?;
            subscriptions.insert(
                id,
                Subscription {
                    segments: segments.clone(),
                    callback: callback.clone(),
                },
            );
        }

        callback(self.read(&segments)?);
        Ok(id)
    }

    fn off(&self, id: SubscriptionId) -> Result<(), StoreError> {
        let mut subscriptions = self.subscriptions.lock().map_err(poisoned)?;
        subscriptions.remove(&id);
        Ok(())
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> StoreError {
    StoreError::Unavailable("memory store lock poisoned".to_string())
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// A write at `written` is visible to subscribers at ancestors and descendants.
fn overlaps(subscribed: &[String], written: &[String]) -> bool {
    subscribed
        .iter()
        .zip(written.iter())
        .all(|(left, right)| left == right)
}

fn lookup<'a>(root: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
}

fn insert(root: &mut Value, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };

    let mut node = root;
    for segment in parents {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => return,
        };
    }

    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        map.insert(last.clone(), value);
    }
}

fn remove(root: &mut Value, segments: &[String]) {
    let Some((last, parents)) = segments.split_last() else {
        *root = Value::Null;
        return;
    };

    let mut node = root;
    for segment in parents {
        match node.as_object_mut().and_then(|map| map.get_mut(segment)) {
            Some(child) => node = child,
            None => return,
        }
    }
    if let Some(map) = node.as_object_mut() {
        map.remove(last);
    }
}
