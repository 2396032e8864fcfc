use crate::result::CommonResult;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Storage abstraction for the persisted store snapshot
pub trait SnapshotStorage: Send + Sync {
    /// Read the last stored snapshot, `None` if nothing has been written yet
    fn load(&self) -> CommonResult<Option<String>>;

    /// Replace the stored snapshot
    fn store(&self, contents: &str) -> CommonResult<()>;
}

impl<S: SnapshotStorage + ?Sized> SnapshotStorage for Arc<S> {
    fn load(&self) -> CommonResult<Option<String>> {
        (**self).load()
    }

    fn store(&self, contents: &str) -> CommonResult<()> {
        (**self).store(contents)
    }
}

/// Snapshot kept in a single file on disk
pub struct FileSnapshotStorage {
    path: PathBuf,
}

impl FileSnapshotStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStorage for FileSnapshotStorage {
    fn load(&self) -> CommonResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(&self.path)?))
    }

    fn store(&self, contents: &str) -> CommonResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        // Write next to the target and rename so readers never see half a file
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory snapshot storage for testing
#[derive(Default)]
pub struct MockSnapshotStorage {
    contents: Mutex<Option<String>>,
    fail_writes: Mutex<bool>,
}

impl MockSnapshotStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
            fail_writes: Mutex::new(false),
        }
    }

    /// Make every subsequent `store` call fail
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStorage for MockSnapshotStorage {
    fn load(&self) -> CommonResult<Option<String>> {
        Ok(self.contents())
    }

    fn store(&self, contents: &str) -> CommonResult<()> {
        if *self.fail_writes.lock().unwrap_or_else(PoisonError::into_inner) {
            return Err("mock snapshot storage rejected the write".into());
        }
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        Ok(())
    }
}
