use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    /// The tag did not verify: the blob was tampered with or sealed under
    /// another key.
    #[error("credential failed authentication")]
    Authentication,

    #[error("malformed credential blob: {0}")]
    Format(String),

    #[error("encryption failed")]
    Encryption,

    #[error("key store error: {0}")]
    KeyStore(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("no credential stored under '{0}'")]
    MissingCredential(String),
}
