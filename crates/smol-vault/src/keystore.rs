use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use zeroize::Zeroizing;

use crate::VaultError;

/// Trusted storage for the vault key.
pub trait KeyStore: Send + Sync {
    fn load(&self) -> Result<Option<Zeroizing<Vec<u8>>>, VaultError>;

    /// Persist `key` unless a key is already held, and return the key in
    /// effect afterwards. An existing key is never replaced.
    fn store(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError>;
}

/// Keeps the key base64 encoded in a file only the owner can read.
pub struct FileKeyStore {
    path: PathBuf,
}

impl FileKeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyStore for FileKeyStore {
    fn load(&self) -> Result<Option<Zeroizing<Vec<u8>>>, VaultError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let encoded = Zeroizing::new(std::fs::read_to_string(&self.path).map_err(|e| {
            VaultError::KeyStore(format!("reading {}: {}", self.path.display(), e))
        })?);
        let key = STANDARD
            .decode(encoded.trim())
            .map_err(|e| VaultError::KeyStore(format!("corrupt key file: {}", e)))?;
        Ok(Some(Zeroizing::new(key)))
    }

    fn store(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::KeyStore(format!("creating {}: {}", parent.display(), e)))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = match options.open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                debug!("Key file {} appeared concurrently, reusing it", self.path.display());
                return self.load()?.ok_or_else(|| {
                    VaultError::KeyStore(format!("{} vanished while opening", self.path.display()))
                });
            }
            Err(e) => {
                return Err(VaultError::KeyStore(format!(
                    "creating {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let encoded = Zeroizing::new(STANDARD.encode(key));
        file.write_all(encoded.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| VaultError::KeyStore(format!("writing {}: {}", self.path.display(), e)))?;

        Ok(Zeroizing::new(key.to_vec()))
    }
}

/// Process-local key storage, mostly for tests.
#[derive(Default)]
pub struct MemoryKeyStore {
    key: Mutex<Option<Zeroizing<Vec<u8>>>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn load(&self) -> Result<Option<Zeroizing<Vec<u8>>>, VaultError> {
        let key = self
            .key
            .lock()
            .map_err(|_| VaultError::KeyStore("key store lock poisoned".to_string()))?;
        Ok(key.clone())
    }

    fn store(&self, key: &[u8]) -> Result<Zeroizing<Vec<u8>>, VaultError> {
        let mut slot = self
            .key
            .lock()
            .map_err(|_| VaultError::KeyStore("key store lock poisoned".to_string()))?;
        Ok(slot
            .get_or_insert_with(|| Zeroizing::new(key.to_vec()))
            .clone())
    }
}
