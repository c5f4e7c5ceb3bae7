// Expense Store - the ordered, persisted list of records
//
// Load once at construction, persist the whole list after every mutation.
// A blob that is missing or unreadable becomes an empty list; a failed
// write keeps the in-memory change and is reported to the caller.

use crate::codec;
use crate::record::Record;
use crate::settings::KeyValueStore;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Key the list is stored under unless the caller picks another
pub const DEFAULT_KEY: &str = "Items";

/// Store handle guarded for multi-threaded callers
///
/// The mutex spans read, mutate and persist, keeping a single writer.
pub type SharedExpenseStore<S> = Arc<Mutex<ExpenseStore<S>>>;

/// Errors returned by store mutations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("index {index} is out of range for {len} expenses")]
    IndexOutOfRange { index: usize, len: usize },

    /// The in-memory list was updated but could not be written out
    #[error("failed to persist expenses: {0:#}")]
    Persist(anyhow::Error),
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&[Record]) + Send>;

pub struct ExpenseStore<S: KeyValueStore> {
    settings: S,
    key: String,
    items: Vec<Record>,
    revision: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
}

impl<S: KeyValueStore> ExpenseStore<S> {
    /// Open the store under the default key
    pub fn open(settings: S) -> Self {
        Self::with_key(settings, DEFAULT_KEY)
    }

    /// Open the store under a custom key, loading whatever is stored there
    pub fn with_key(settings: S, key: impl Into<String>) -> Self {
        let key = key.into();
        let items = Self::load(&settings, &key);

        ExpenseStore {
            settings,
            key,
            items,
            revision: 0,
            observers: Vec::new(),
            next_subscription: 0,
        }
    }

    fn load(settings: &S, key: &str) -> Vec<Record> {
        let blob = match settings.get(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                tracing::debug!(key, "no stored expenses, starting empty");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(key, "failed to read stored expenses, starting empty: {err:#}");
                return Vec::new();
            }
        };

        match codec::decode(&blob) {
            Ok(items) => {
                tracing::info!(key, count = items.len(), "loaded expenses");
                items
            }
            Err(err) => {
                tracing::warn!(key, "discarding unreadable expense data: {err}");
                Vec::new()
            }
        }
    }

    // ========================================================================
    // READS
    // ========================================================================

    pub fn items(&self) -> &[Record] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Record> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all amounts
    pub fn total(&self) -> i64 {
        self.items.iter().map(|record| record.amount).sum()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Bumped once per mutation, for callers that poll instead of subscribing
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    // ========================================================================
    // MUTATIONS
    // ========================================================================

    /// Add a record to the end of the list and persist
    pub fn append(&mut self, record: Record) -> Result<(), StoreError> {
        tracing::debug!(id = %record.id, name = %record.name, amount = record.amount, "appending expense");
        self.items.push(record);
        self.changed()
    }

    /// Remove the records at `indices` and persist
    ///
    /// Positions refer to the list as it is when called. If any position is
    /// out of range nothing is removed. Returns the removed records in list
    /// order.
    pub fn remove_at<I>(&mut self, indices: I) -> Result<Vec<Record>, StoreError>
    where
        I: IntoIterator<Item = usize>,
    {
        let targets: BTreeSet<usize> = indices.into_iter().collect();
        let len = self.items.len();

        if let Some(&index) = targets.iter().next_back() {
            if index >= len {
                tracing::warn!(index, len, "rejected removal of missing expense");
                return Err(StoreError::IndexOutOfRange { index, len });
            }
        } else {
            return Ok(Vec::new());
        }

        let mut removed = Vec::with_capacity(targets.len());
        let mut kept = Vec::with_capacity(len - targets.len());
        for (position, record) in self.items.drain(..).enumerate() {
            if targets.contains(&position) {
                removed.push(record);
            } else {
                kept.push(record);
            }
        }
        self.items = kept;

        tracing::debug!(count = removed.len(), "removed expenses");
        self.changed()?;
        Ok(removed)
    }

    // ========================================================================
    // OBSERVERS
    // ========================================================================

    /// Register a callback run with the current items after every mutation
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&[Record]) + Send + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Drop a callback, returns whether it was registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    pub fn into_shared(self) -> SharedExpenseStore<S> {
        Arc::new(Mutex::new(self))
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    fn changed(&mut self) -> Result<(), StoreError> {
        self.revision += 1;
        for (_, observer) in self.observers.iter_mut() {
            observer(&self.items);
        }
        self.persist()
    }

    /// Full-replace write of the current list
    fn persist(&self) -> Result<(), StoreError> {
        let result = codec::encode(&self.items)
            .map_err(anyhow::Error::from)
            .and_then(|blob| self.settings.set(&self.key, &blob));

        match result {
            Ok(()) => {
                tracing::debug!(key = %self.key, count = self.items.len(), "persisted expenses");
                Ok(())
            }
            Err(err) => {
                tracing::error!(key = %self.key, "failed to persist expenses: {err:#}");
                Err(StoreError::Persist(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemorySettings;
    use anyhow::{anyhow, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Settings that can read but refuse every write
    struct ReadOnlySettings;

    impl KeyValueStore for ReadOnlySettings {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Err(anyhow!("disk full"))
        }

        fn remove(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
    }

    /// Settings whose reads always fail
    struct BrokenSettings;

    impl KeyValueStore for BrokenSettings {
        fn get(&self, _key: &str) -> Result<Option<Vec<u8>>> {
            Err(anyhow!("I/O error"))
        }

        fn set(&self, _key: &str, _value: &[u8]) -> Result<()> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn names<S: KeyValueStore>(store: &ExpenseStore<S>) -> Vec<&str> {
        store.items().iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn test_empty_without_stored_blob() {
        let store = ExpenseStore::open(MemorySettings::new());

        assert!(store.is_empty());
        assert_eq!(store.revision(), 0);
        assert_eq!(store.key(), "Items");
    }

    #[test]
    fn test_coffee_and_laptop_scenario() {
        let mut store = ExpenseStore::open(MemorySettings::new());

        store.append(Record::new("Coffee", "Personal", 5)).unwrap();
        store.append(Record::new("Laptop", "Business", 1200)).unwrap();
        assert_eq!(names(&store), vec!["Coffee", "Laptop"]);

        let removed = store.remove_at([0]).unwrap();
        assert_eq!(removed[0].name, "Coffee");
        assert_eq!(names(&store), vec!["Laptop"]);
    }

    #[test]
    fn test_append_preserves_call_order() {
        let mut store = ExpenseStore::open(MemorySettings::new());

        for i in 0..25 {
            store.append(Record::new(format!("item {i}"), "Personal", i)).unwrap();
        }

        assert_eq!(store.len(), 25);
        let amounts: Vec<i64> = store.items().iter().map(|r| r.amount).collect();
        assert_eq!(amounts, (0..25).collect::<Vec<i64>>());
    }

    #[test]
    fn test_append_accepts_anything() {
        let mut store = ExpenseStore::open(MemorySettings::new());
        let record = Record::new("", "Groceries", -500);

        store.append(record.clone()).unwrap();
        store.append(record.clone()).unwrap();

        assert_eq!(store.len(), 2, "No validation and no duplicate detection");
        assert_eq!(store.total(), -1000);
    }

    #[test]
    fn test_restart_round_trip() {
        let settings = MemorySettings::new();
        let mut store = ExpenseStore::open(settings.clone());
        store.append(Record::new("Coffee", "Personal", 5)).unwrap();
        store.append(Record::new("Laptop", "Business", 1200)).unwrap();

        let restarted = ExpenseStore::open(settings);

        assert_eq!(restarted.items(), store.items());
    }

    #[test]
    fn test_single_append_blob_decodes() {
        let settings = MemorySettings::new();
        let mut store = ExpenseStore::open(settings.clone());
        let record = Record::new("Coffee", "Personal", 5);

        store.append(record.clone()).unwrap();

        let blob = settings.get("Items").unwrap().unwrap();
        assert_eq!(codec::decode(&blob).unwrap(), vec![record]);
    }

    #[test]
    fn test_corrupt_blob_loads_empty() {
        let settings = MemorySettings::new();
        settings.set("Items", b"{\"version\": 1, \"items\": [oops").unwrap();

        let store = ExpenseStore::open(settings);

        assert!(store.is_empty());
    }

    #[test]
    fn test_read_failure_loads_empty() {
        let store = ExpenseStore::open(BrokenSettings);

        assert!(store.is_empty());
    }

    #[test]
    fn test_custom_key_is_isolated() {
        let settings = MemorySettings::new();
        let mut work = ExpenseStore::with_key(settings.clone(), "Work");
        work.append(Record::new("Printer", "Business", 300)).unwrap();

        let default = ExpenseStore::open(settings);

        assert!(default.is_empty());
    }

    #[test]
    fn test_remove_keeps_survivor_order() {
        let mut store = ExpenseStore::open(MemorySettings::new());
        for name in ["a", "b", "c", "d", "e"] {
            store.append(Record::new(name, "Personal", 1)).unwrap();
        }

        let removed = store.remove_at([3, 1, 3]).unwrap();

        assert_eq!(removed.len(), 2);
        assert_eq!(names(&store), vec!["a", "c", "e"]);
    }

    #[test]
    fn test_remove_all_positions() {
        let settings = MemorySettings::new();
        let mut store = ExpenseStore::open(settings.clone());
        for i in 0..4 {
            store.append(Record::new("x", "Personal", i)).unwrap();
        }

        let len = store.len();
        store.remove_at(0..len).unwrap();

        assert!(store.is_empty());
        assert!(ExpenseStore::open(settings).is_empty());
    }

    #[test]
    fn test_remove_out_of_range_is_rejected() {
        let settings = MemorySettings::new();
        let mut store = ExpenseStore::open(settings.clone());
        store.append(Record::new("Coffee", "Personal", 5)).unwrap();
        let revision = store.revision();

        let err = store.remove_at([0, 1]).unwrap_err();

        assert!(matches!(err, StoreError::IndexOutOfRange { index: 1, len: 1 }));
        assert_eq!(store.len(), 1, "Nothing is removed when any index is invalid");
        assert_eq!(store.revision(), revision);
        assert_eq!(ExpenseStore::open(settings).len(), 1);
    }

    #[test]
    fn test_remove_nothing_is_noop() {
        let mut store = ExpenseStore::open(MemorySettings::new());
        store.append(Record::new("Coffee", "Personal", 5)).unwrap();

        let removed = store.remove_at(Vec::new()).unwrap();

        assert!(removed.is_empty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_failed_write_keeps_memory_state() {
        let mut store = ExpenseStore::open(ReadOnlySettings);

        let err = store.append(Record::new("Coffee", "Personal", 5)).unwrap_err();

        assert!(matches!(err, StoreError::Persist(_)));
        assert!(err.to_string().contains("disk full"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_observers_fire_per_mutation() {
        let mut store = ExpenseStore::open(MemorySettings::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let counter = Arc::clone(&calls);
        let lengths = Arc::clone(&seen);
        let id = store.subscribe(move |items| {
            counter.fetch_add(1, Ordering::SeqCst);
            lengths.lock().unwrap().push(items.len());
        });

        store.append(Record::new("Coffee", "Personal", 5)).unwrap();
        store.append(Record::new("Laptop", "Business", 1200)).unwrap();
        let _ = store.remove_at([9]);
        store.remove_at([0]).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 1]);

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.append(Record::new("Tea", "Personal", 3)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_shared_store_across_threads() {
        let settings = MemorySettings::new();
        let shared = ExpenseStore::open(settings.clone()).into_shared();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&shared);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let mut guard = store.lock().unwrap();
                        guard
                            .append(Record::new(format!("t{t}-{i}"), "Personal", i))
                            .unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.lock().unwrap().len(), 40);
        assert_eq!(ExpenseStore::open(settings).len(), 40);
    }
}
