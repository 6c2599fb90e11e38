//! smol-vault: at-rest protection for the planner endpoint and API key.
//!
//! Secrets are sealed with AES-256-GCM under a single symmetric key that is
//! generated on first use and then reused for the life of the process. Each
//! sealed value is stored as `base64(nonce || ciphertext || tag)` with a
//! fresh 12-byte nonce and a 16-byte tag.

mod error;
mod keystore;
mod store;

pub use error::VaultError;
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use store::{CredentialStore, API_KEY_ALIAS, ENDPOINT_ALIAS};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, info};
use zeroize::Zeroizing;

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const KEY_LEN: usize = 32;

/// A sealed secret, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub alias: String,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
    pub tag: [u8; TAG_LEN],
}

impl Credential {
    /// `base64(nonce || ciphertext || tag)`
    pub fn encode(&self) -> String {
        let mut bytes = Vec::with_capacity(NONCE_LEN + self.ciphertext.len() + TAG_LEN);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes.extend_from_slice(&self.tag);
        STANDARD.encode(bytes)
    }

    pub fn decode(alias: &str, blob: &str) -> Result<Self, VaultError> {
        // Tolerate line-wrapped base64.
        let compact: String = blob.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact)
            .map_err(|e| VaultError::Format(format!("invalid base64: {}", e)))?;

        if bytes.len() < NONCE_LEN {
            return Err(VaultError::Format(format!(
                "{} bytes is shorter than the {}-byte nonce",
                bytes.len(),
                NONCE_LEN
            )));
        }
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Format(format!(
                "{} bytes leaves no room for the {}-byte tag",
                bytes.len(),
                TAG_LEN
            )));
        }

        let (nonce, rest) = bytes.split_at(NONCE_LEN);
        let (ciphertext, tag) = rest.split_at(rest.len() - TAG_LEN);

        let mut credential = Self {
            alias: alias.to_string(),
            nonce: [0; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: [0; TAG_LEN],
        };
        credential.nonce.copy_from_slice(nonce);
        credential.tag.copy_from_slice(tag);
        Ok(credential)
    }
}

/// AEAD sealing under the process-wide key.
pub struct Vault {
    cipher: Aes256Gcm,
}

impl Vault {
    /// Load the key from `keys`, generating and persisting one if none exists.
    pub fn open(keys: &dyn KeyStore) -> Result<Self, VaultError> {
        let key = match keys.load()? {
            Some(key) => {
                debug!("Loaded vault key");
                key
            }
            None => {
                let generated = Zeroizing::new(Aes256Gcm::generate_key(OsRng).to_vec());
                let key = keys.store(&generated)?;
                if key == generated {
                    info!("Generated new vault key");
                }
                key
            }
        };

        if key.len() != KEY_LEN {
            return Err(VaultError::KeyStore(format!(
                "vault key must be {} bytes, found {}",
                KEY_LEN,
                key.len()
            )));
        }

        Ok(Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key)),
        })
    }

    /// Seal `plaintext` with a fresh random nonce.
    pub fn seal(&self, alias: &str, plaintext: &str) -> Result<Credential, VaultError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Encryption)?;

        // aes-gcm appends the tag to the ciphertext.
        let (ciphertext, tag) = sealed.split_at(sealed.len() - TAG_LEN);
        let mut credential = Credential {
            alias: alias.to_string(),
            nonce: [0; NONCE_LEN],
            ciphertext: ciphertext.to_vec(),
            tag: [0; TAG_LEN],
        };
        credential.nonce.copy_from_slice(&nonce);
        credential.tag.copy_from_slice(tag);
        Ok(credential)
    }

    pub fn unseal(&self, credential: &Credential) -> Result<String, VaultError> {
        let mut sealed = Vec::with_capacity(credential.ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(&credential.ciphertext);
        sealed.extend_from_slice(&credential.tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&credential.nonce), sealed.as_slice())
            .map_err(|_| VaultError::Authentication)?;

        String::from_utf8(plaintext)
            .map_err(|_| VaultError::Format("plaintext is not valid UTF-8".to_string()))
    }

    /// Encrypt to the persisted blob format.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        Ok(self.seal("", plaintext)?.encode())
    }

    pub fn decrypt(&self, blob: &str) -> Result<String, VaultError> {
        self.unseal(&Credential::decode("", blob)?)
    }
}
