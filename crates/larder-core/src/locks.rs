// src/locks.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Process-wide registry handing out one reader/writer lock per URI.
///
/// The table is monotonic: entries are created on first use and live for the
/// rest of the process, so a handle returned here never dangles. Only the
/// registry mutex is held while resolving a URI; request processing then
/// proceeds under the per-URI lock with no global section held.
pub struct UriLocks {
    table: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl UriLocks {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the stable lock associated with `uri`, creating it on first
    /// use. Two concurrent first-uses of the same URI observe one entry.
    pub fn get(&self, uri: &str) -> Arc<RwLock<()>> {
        let mut table = self.table.lock().unwrap();
        match table.get(uri) {
            Some(lock) => Arc::clone(lock),
            None => {
                let lock = Arc::new(RwLock::new(()));
                table.insert(uri.to_string(), Arc::clone(&lock));
                lock
            }
        }
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for UriLocks {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn same_uri_yields_same_lock_instance() {
        let locks = UriLocks::new();
        let a = locks.get("/alpha");
        let b = locks.get("/alpha");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn distinct_uris_get_distinct_locks() {
        let locks = UriLocks::new();
        let a = locks.get("/alpha");
        let b = locks.get("/beta");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn concurrent_first_use_creates_one_entry() {
        let locks = Arc::new(UriLocks::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = locks.clone();
                thread::spawn(move || locks.get("/contested"))
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(locks.len(), 1);
        for pair in instances.windows(2) {
            assert!(Arc::ptr_eq(&pair[0], &pair[1]));
        }
    }

    #[test]
    fn writer_excludes_readers() {
        let locks = UriLocks::new();
        let lock = locks.get("/guarded");
        let guard = lock.write().unwrap();
        assert!(lock.try_read().is_err());
        drop(guard);
        assert!(lock.try_read().is_ok());
    }
}
