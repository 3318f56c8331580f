//! `KeyValueStore` backends: in-memory and JSON-lines files.
//!
//! Both notify subscribers after a successful append, outside any internal
//! lock, so a callback may call back into the store.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use ph_traits::{KeyValueStore, StoreError, Subscription, SubscriptionCallback};

type Callback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_path: HashMap<String, Vec<(u64, Callback)>>,
}

/// Per-path subscriber lists shared by the backends.
#[derive(Clone, Default)]
struct Subscribers {
    inner: Arc<Mutex<Registry>>,
}

impl Subscribers {
    fn add(&self, path: &str, callback: SubscriptionCallback) -> Result<Subscription, StoreError> {
        let id = {
            let mut reg = self.inner.lock().map_err(|_| "subscriber lock poisoned")?;
            reg.next_id += 1;
            let id = reg.next_id;
            reg.by_path
                .entry(path.to_string())
                .or_default()
                .push((id, Arc::from(callback)));
            id
        };
        let weak: Weak<Mutex<Registry>> = Arc::downgrade(&self.inner);
        let path = path.to_string();
        Ok(Subscription::new(move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Ok(mut reg) = inner.lock() else {
                return;
            };
            if let Some(list) = reg.by_path.get_mut(&path) {
                list.retain(|(i, _)| *i != id);
            }
        }))
    }

    fn notify(&self, path: &str, record: &str) {
        let targets: Vec<Callback> = match self.inner.lock() {
            Ok(reg) => reg
                .by_path
                .get(path)
                .map(|l| l.iter().map(|(_, cb)| cb.clone()).collect())
                .unwrap_or_default(),
            Err(_) => return,
        };
        for cb in targets {
            cb(record);
        }
    }

    fn count(&self, path: &str) -> usize {
        self.inner
            .lock()
            .map(|reg| reg.by_path.get(path).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

fn check_record(record: &str) -> Result<(), StoreError> {
    if record.contains('\n') {
        return Err("record must be a single line".into());
    }
    Ok(())
}

/// Volatile store for tests and single-process sessions.
#[derive(Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<String, Vec<String>>>>,
    subs: Subscribers,
}

impl core::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriptions on `path`.
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.subs.count(path)
    }
}

impl KeyValueStore for MemoryStore {
    fn append(&self, path: &str, record: &str) -> Result<(), StoreError> {
        check_record(record)?;
        {
            let mut map = self.records.lock().map_err(|_| "memory store lock poisoned")?;
            map.entry(path.to_string())
                .or_default()
                .push(record.to_string());
        }
        self.subs.notify(path, record);
        Ok(())
    }

    fn read_all(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let map = self.records.lock().map_err(|_| "memory store lock poisoned")?;
        Ok(map.get(path).cloned().unwrap_or_default())
    }

    fn subscribe(
        &self,
        path: &str,
        callback: SubscriptionCallback,
    ) -> Result<Subscription, StoreError> {
        self.subs.add(path, callback)
    }

    fn clear(&self, path: &str) -> Result<(), StoreError> {
        let mut map = self.records.lock().map_err(|_| "memory store lock poisoned")?;
        map.remove(path);
        Ok(())
    }
}

/// Directory of JSON-lines files, one per store path:
/// `users/local/phReadings` lives at `<dir>/users/local/phReadings.jsonl`.
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
    subs: Subscribers,
}

impl core::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .map_err(|e| format!("create store dir {}: {e}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
            subs: Subscribers::default(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `path`. Empty, `.` and `..` segments are refused.
    pub fn file_for(&self, path: &str) -> Result<PathBuf, StoreError> {
        let mut out = self.dir.clone();
        let mut segments = 0usize;
        for seg in path.split('/') {
            if seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\') {
                return Err(format!("invalid store path '{path}'").into());
            }
            out.push(seg);
            segments += 1;
        }
        if segments == 0 {
            return Err("empty store path".into());
        }
        out.set_extension("jsonl");
        Ok(out)
    }

    pub fn subscriber_count(&self, path: &str) -> usize {
        self.subs.count(path)
    }
}

impl KeyValueStore for FileStore {
    fn append(&self, path: &str, record: &str) -> Result<(), StoreError> {
        check_record(record)?;
        let file = self.file_for(path)?;
        {
            let _guard = self.write_lock.lock().map_err(|_| "file store lock poisoned")?;
            if let Some(parent) = file.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut f = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&file)
                .map_err(|e| format!("open {}: {e}", file.display()))?;
            writeln!(f, "{record}")?;
            f.flush()?;
        }
        self.subs.notify(path, record);
        Ok(())
    }

    fn read_all(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let file = self.file_for(path)?;
        if !file.exists() {
            return Ok(Vec::new());
        }
        let text =
            fs::read_to_string(&file).map_err(|e| format!("read {}: {e}", file.display()))?;
        Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn subscribe(
        &self,
        path: &str,
        callback: SubscriptionCallback,
    ) -> Result<Subscription, StoreError> {
        self.file_for(path)?;
        self.subs.add(path, callback)
    }

    fn clear(&self, path: &str) -> Result<(), StoreError> {
        let file = self.file_for(path)?;
        let _guard = self.write_lock.lock().map_err(|_| "file store lock poisoned")?;
        if file.exists() {
            crate::atomic::write_atomic(&file, b"")
                .map_err(|e| format!("clear {}: {e}", file.display()))?;
        }
        Ok(())
    }
}
