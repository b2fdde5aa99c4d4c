//! File-backed ledger storing one file per key.

use crate::client::LedgerClient;
use crate::error::LedgerError;
use async_trait::async_trait;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension for committed entries.
const ENTRY_EXTENSION: &str = "entry";
/// Extension for in-progress writes.
const TEMP_EXTENSION: &str = "entry.tmp";

/// Ledger persisted under a directory, one file per key.
///
/// File names are the hex encoding of the key so any key string maps to a
/// safe path. Each write lands through a temp file and a rename, so a reader
/// never observes a half-written value.
#[derive(Debug)]
pub struct FileLedger {
    /// Root directory for ledger entries.
    root: PathBuf,
    /// Serialize writers within this process.
    write_lock: Mutex<()>,
}

impl FileLedger {
    /// Create a file ledger under the given root.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("initialized file ledger (root={})", root.display());
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    /// Root directory of the ledger.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{ENTRY_EXTENSION}", hex::encode(key)))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{TEMP_EXTENSION}", hex::encode(key)))
    }
}

#[async_trait]
impl LedgerClient for FileLedger {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>, LedgerError> {
        let path = self.entry_path(key);
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("file ledger read (key={}, len={})", key, bytes.len());
                Ok(Some(bytes))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("file ledger read (key={}, found=false)", key);
                Ok(None)
            }
            Err(err) => Err(LedgerError::Io(err)),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<(), LedgerError> {
        if key.is_empty() {
            return Err(LedgerError::InvalidKey("empty key".to_string()));
        }
        let _guard = self.write_lock.lock();
        let path = self.entry_path(key);
        let temp_path = self.temp_path(key);
        {
            let mut file = OpenOptions::new()
                .create(true)
                .truncate(true)
                .write(true)
                .open(&temp_path)?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;
        debug!("file ledger write (key={}, len={})", key, bytes.len());
        Ok(())
    }

    async fn is_available(&self) -> Result<bool, LedgerError> {
        Ok(self.root.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::FileLedger;
    use crate::LedgerClient;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[tokio::test]
    async fn entries_survive_reopen() {
        let temp = tempdir().expect("tempdir");
        let ledger = FileLedger::new(temp.path()).expect("ledger");
        ledger.write("sample_keys", b"[\"a\"]").await.expect("write");
        ledger.write("sample_a", b"{}").await.expect("write");

        let reopened = FileLedger::new(temp.path()).expect("reopen");
        assert_eq!(
            reopened.read("sample_keys").await.expect("read"),
            Some(b"[\"a\"]".to_vec())
        );
        assert_eq!(reopened.read("sample_b").await.expect("read"), None);
    }

    #[tokio::test]
    async fn keys_with_path_characters_stay_inside_root() {
        let temp = tempdir().expect("tempdir");
        let ledger = FileLedger::new(temp.path()).expect("ledger");
        ledger.write("../escape/key", b"x").await.expect("write");

        let files: Vec<_> = std::fs::read_dir(temp.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(files.len(), 1);
        assert_eq!(
            ledger.read("../escape/key").await.expect("read"),
            Some(b"x".to_vec())
        );
    }

    #[tokio::test]
    async fn reports_unavailable_once_root_is_removed() {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("ledger");
        let ledger = FileLedger::new(&root).expect("ledger");
        assert!(ledger.is_available().await.expect("probe"));
        std::fs::remove_dir_all(&root).expect("remove");
        assert!(!ledger.is_available().await.expect("probe"));
    }
}
