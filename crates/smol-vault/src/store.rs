use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Credential, Vault, VaultError};

/// Alias of the planner endpoint URL.
pub const ENDPOINT_ALIAS: &str = "endpoint";
/// Alias of the planner API key.
pub const API_KEY_ALIAS: &str = "api_key";

/// Sealed credentials persisted as a JSON object of alias -> blob.
pub struct CredentialStore {
    path: PathBuf,
    vault: Vault,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, vault: Vault) -> Self {
        Self {
            path: path.into(),
            vault,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt `plaintext` and persist it under `alias`, replacing any
    /// previous value.
    pub fn put(&self, alias: &str, plaintext: &str) -> Result<(), VaultError> {
        let credential = self.vault.seal(alias, plaintext)?;
        let mut records = self.read_records()?;
        records.insert(alias.to_string(), credential.encode());
        self.write_records(&records)?;
        debug!("Stored credential '{}'", alias);
        Ok(())
    }

    /// Decrypt the value under `alias`, `None` if nothing is stored.
    pub fn get(&self, alias: &str) -> Result<Option<String>, VaultError> {
        let records = self.read_records()?;
        match records.get(alias) {
            Some(blob) => {
                let credential = Credential::decode(alias, blob)?;
                Ok(Some(self.vault.unseal(&credential)?))
            }
            None => Ok(None),
        }
    }

    /// Like [`CredentialStore::get`] but a missing alias is an error.
    pub fn require(&self, alias: &str) -> Result<String, VaultError> {
        self.get(alias)?
            .ok_or_else(|| VaultError::MissingCredential(alias.to_string()))
    }

    pub fn remove(&self, alias: &str) -> Result<bool, VaultError> {
        let mut records = self.read_records()?;
        let removed = records.remove(alias).is_some();
        if removed {
            self.write_records(&records)?;
        }
        Ok(removed)
    }

    pub fn aliases(&self) -> Result<Vec<String>, VaultError> {
        Ok(self.read_records()?.into_keys().collect())
    }

    fn read_records(&self) -> Result<BTreeMap<String, String>, VaultError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| VaultError::Storage(format!("reading {}: {}", self.path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| VaultError::Storage(format!("parsing {}: {}", self.path.display(), e)))
    }

    fn write_records(&self, records: &BTreeMap<String, String>) -> Result<(), VaultError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| VaultError::Storage(format!("creating {}: {}", parent.display(), e)))?;
        }

        let content = serde_json::to_string_pretty(records)
            .map_err(|e| VaultError::Storage(e.to_string()))?;

        // Write a sibling file, then rename it into place.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .map_err(|e| VaultError::Storage(format!("writing {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| VaultError::Storage(format!("replacing {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
