//! Persistence for the temporary and permanent mode records
//!
//! The registry only talks to [`ModeStore`]. [`FileModeStore`] keeps each slot
//! in its own file, which is what the boot-time gadget script reads.
//! [`MemoryModeStore`] keeps them in a map and can simulate I/O failures.

use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, trace};

use super::ModeSlot;

/// Default permanent mode file
pub const DEFAULT_MODE_FILE: &str = "/mnt/data/mode.cfg";

/// Default temporary mode file
pub const DEFAULT_TEMP_MODE_FILE: &str = "/mnt/data/mode_tmp.cfg";

/// Storage for the two mode slots
pub trait ModeStore: Send + Sync {
    /// Stored integer, `None` when the slot is absent or unreadable
    fn read(&self, slot: ModeSlot) -> Option<i32>;

    /// Store an integer, replacing any previous value
    fn write(&self, slot: ModeSlot, value: i32) -> io::Result<()>;

    /// Remove the slot. Removing an absent slot succeeds.
    fn remove(&self, slot: ModeSlot) -> io::Result<()>;

    /// Whether the slot currently exists
    fn exists(&self, slot: ModeSlot) -> bool {
        self.read(slot).is_some()
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Slot-per-file store
///
/// Files contain the decimal value without a trailing newline.
#[derive(Debug, Clone)]
pub struct FileModeStore {
    permanent_path: PathBuf,
    temporary_path: PathBuf,
}

impl FileModeStore {
    pub fn new(permanent_path: impl Into<PathBuf>, temporary_path: impl Into<PathBuf>) -> Self {
        Self {
            permanent_path: permanent_path.into(),
            temporary_path: temporary_path.into(),
        }
    }

    /// Store at the fixed paths used by the gadget boot script
    pub fn legacy() -> Self {
        Self::new(DEFAULT_MODE_FILE, DEFAULT_TEMP_MODE_FILE)
    }

    /// File backing a slot
    pub fn path(&self, slot: ModeSlot) -> &Path {
        match slot {
            ModeSlot::Permanent => &self.permanent_path,
            ModeSlot::Temporary => &self.temporary_path,
        }
    }

    fn staging_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".new");
        path.with_file_name(name)
    }
}

impl ModeStore for FileModeStore {
    fn read(&self, slot: ModeSlot) -> Option<i32> {
        let path = self.path(slot);
        match fs::read_to_string(path) {
            Ok(content) => {
                let value = parse_stored_value(&content);
                if value.is_none() {
                    debug!("Ignoring unparseable {} mode file {}", slot, path.display());
                }
                value
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn write(&self, slot: ModeSlot, value: i32) -> io::Result<()> {
        let path = self.path(slot);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| with_path(e, parent))?;
        }

        // Stage next to the target and rename over it, readers never see a partial file
        let staging = Self::staging_path(path);
        let staged = File::create(&staging).and_then(|mut file| {
            file.write_all(value.to_string().as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = staged.and_then(|_| fs::rename(&staging, path)) {
            let _ = fs::remove_file(&staging);
            return Err(with_path(e, path));
        }

        trace!("Wrote {} to {}", value, path.display());
        Ok(())
    }

    fn remove(&self, slot: ModeSlot) -> io::Result<()> {
        let path = self.path(slot);
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(with_path(e, path)),
        }
    }

    fn exists(&self, slot: ModeSlot) -> bool {
        self.path(slot).exists()
    }
}

fn with_path(e: io::Error, path: &Path) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
}

/// Parse the leading decimal integer of a mode file.
///
/// Leading whitespace is skipped and anything after the number is ignored,
/// matching how the boot script reads the file.
pub fn parse_stored_value(content: &str) -> Option<i32> {
    let s = content.trim_start();
    let sign_len = usize::from(s.starts_with(|c: char| c == '+' || c == '-'));
    let digits = s[sign_len..]
        .bytes()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }
    s[..sign_len + digits].parse().ok()
}

// ============================================================================
// In-memory backend
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    values: HashMap<ModeSlot, i32>,
    failing_writes: HashSet<ModeSlot>,
    failing_removes: HashSet<ModeSlot>,
}

/// Map-backed store with failure injection
#[derive(Default)]
pub struct MemoryModeStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes to `slot` fail until turned off again
    pub fn fail_writes(&self, slot: ModeSlot, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.failing_writes.insert(slot);
        } else {
            inner.failing_writes.remove(&slot);
        }
    }

    /// Make removals of `slot` fail until turned off again
    pub fn fail_removes(&self, slot: ModeSlot, fail: bool) {
        let mut inner = self.inner.lock();
        if fail {
            inner.failing_removes.insert(slot);
        } else {
            inner.failing_removes.remove(&slot);
        }
    }

    /// Seed a slot with an arbitrary value, bypassing failure injection
    pub fn set_raw(&self, slot: ModeSlot, value: Option<i32>) {
        let mut inner = self.inner.lock();
        match value {
            Some(v) => inner.values.insert(slot, v),
            None => inner.values.remove(&slot),
        };
    }
}

impl ModeStore for MemoryModeStore {
    fn read(&self, slot: ModeSlot) -> Option<i32> {
        self.inner.lock().values.get(&slot).copied()
    }

    fn write(&self, slot: ModeSlot, value: i32) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing_writes.contains(&slot) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("injected write failure on {} slot", slot),
            ));
        }
        inner.values.insert(slot, value);
        Ok(())
    }

    fn remove(&self, slot: ModeSlot) -> io::Result<()> {
        let mut inner = self.inner.lock();
        if inner.failing_removes.contains(&slot) {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                format!("injected remove failure on {} slot", slot),
            ));
        }
        inner.values.remove(&slot);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn file_store(dir: &Path) -> FileModeStore {
        FileModeStore::new(dir.join("mode.cfg"), dir.join("mode_tmp.cfg"))
    }

    #[test]
    fn test_parse_stored_value() {
        assert_eq!(parse_stored_value("3"), Some(3));
        assert_eq!(parse_stored_value("  2\n"), Some(2));
        assert_eq!(parse_stored_value("1abc"), Some(1));
        assert_eq!(parse_stored_value("-1"), Some(-1));
        assert_eq!(parse_stored_value("+2"), Some(2));
        assert_eq!(parse_stored_value(""), None);
        assert_eq!(parse_stored_value("rndis"), None);
        assert_eq!(parse_stored_value("-"), None);
        assert_eq!(parse_stored_value("99999999999"), None);
    }

    #[test]
    fn test_file_store_write_read_remove() {
        let dir = tempdir().unwrap();
        let store = file_store(dir.path());

        assert_eq!(store.read(ModeSlot::Permanent), None);
        assert!(!store.exists(ModeSlot::Permanent));

        store.write(ModeSlot::Permanent, 2).unwrap();
        assert_eq!(store.read(ModeSlot::Permanent), Some(2));
        assert_eq!(
            fs::read_to_string(dir.path().join("mode.cfg")).unwrap(),
            "2"
        );
        assert!(!dir.path().join("mode.cfg.new").exists());

        store.write(ModeSlot::Permanent, 3).unwrap();
        assert_eq!(store.read(ModeSlot::Permanent), Some(3));
        assert_eq!(store.read(ModeSlot::Temporary), None);

        store.remove(ModeSlot::Permanent).unwrap();
        assert_eq!(store.read(ModeSlot::Permanent), None);
        // Removing twice is fine
        store.remove(ModeSlot::Permanent).unwrap();
    }

    #[test]
    fn test_file_store_creates_parent_dir() {
        let dir = tempdir().unwrap();
        let store = file_store(&dir.path().join("nested/data"));

        store.write(ModeSlot::Temporary, 1).unwrap();
        assert_eq!(store.read(ModeSlot::Temporary), Some(1));
    }

    #[test]
    fn test_file_store_corrupt_file_exists_but_reads_absent() {
        let dir = tempdir().unwrap();
        let store = file_store(dir.path());
        fs::write(store.path(ModeSlot::Temporary), "garbage").unwrap();

        assert!(store.exists(ModeSlot::Temporary));
        assert_eq!(store.read(ModeSlot::Temporary), None);
    }

    #[test]
    fn test_file_store_write_failure() {
        let dir = tempdir().unwrap();
        // Parent of the slot is a regular file, so nothing can be created under it
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let store = FileModeStore::new(blocker.join("mode.cfg"), blocker.join("mode_tmp.cfg"));

        assert!(store.write(ModeSlot::Permanent, 1).is_err());
        assert_eq!(store.read(ModeSlot::Permanent), None);
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let store = MemoryModeStore::new();
        store.write(ModeSlot::Temporary, 1).unwrap();

        store.fail_writes(ModeSlot::Temporary, true);
        assert!(store.write(ModeSlot::Temporary, 2).is_err());
        assert_eq!(store.read(ModeSlot::Temporary), Some(1));
        // Other slot unaffected
        store.write(ModeSlot::Permanent, 3).unwrap();

        store.fail_removes(ModeSlot::Temporary, true);
        assert!(store.remove(ModeSlot::Temporary).is_err());
        assert!(store.exists(ModeSlot::Temporary));

        store.fail_removes(ModeSlot::Temporary, false);
        store.remove(ModeSlot::Temporary).unwrap();
        assert!(!store.exists(ModeSlot::Temporary));
    }

    #[test]
    fn test_legacy_paths() {
        let store = FileModeStore::legacy();
        assert_eq!(store.path(ModeSlot::Permanent), Path::new(DEFAULT_MODE_FILE));
        assert_eq!(store.path(ModeSlot::Temporary), Path::new(DEFAULT_TEMP_MODE_FILE));
    }
}
