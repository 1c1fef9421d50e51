//! Encrypted package store
//!
//! `EncryptedPackages` wraps another `PackageService` and seals package
//! content with AES-256-GCM before it reaches the inner store. Stored
//! content is a random 12 byte nonce followed by the ciphertext. Envelopes
//! and manifests stay readable; encrypted packages carry the
//! `encrypted=true` label.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};
use std::sync::Arc;
use stevedore_core::{Locator, PackageEnvelope};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::packages::{PackageOptions, PackageReader, PackageService};

/// Label marking encrypted package content
pub const ENCRYPTED_LABEL: &str = "encrypted";

const NONCE_SIZE: usize = 12;

/// Package store encrypting content with a key derived from a passphrase
pub struct EncryptedPackages {
    inner: Arc<dyn PackageService>,
    cipher: Aes256Gcm,
}

impl EncryptedPackages {
    /// Wrap `inner`; the cipher key is the SHA-256 of `passphrase`
    pub fn new(inner: Arc<dyn PackageService>, passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest));
        Self { inner, cipher }
    }

    fn encrypt(&self, locator: &Locator, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| StoreError::Encryption {
                locator: locator.clone(),
                message: "failed to encrypt content".to_string(),
            })?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, locator: &Locator, sealed: &[u8]) -> Result<Vec<u8>> {
        let invalid = || StoreError::Encryption {
            locator: locator.clone(),
            message: "content cannot be decrypted with this key".to_string(),
        };

        if sealed.len() < NONCE_SIZE {
            return Err(invalid());
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| invalid())
    }
}

fn is_encrypted(envelope: &PackageEnvelope) -> bool {
    envelope
        .runtime_labels
        .get(ENCRYPTED_LABEL)
        .is_some_and(|v| v == "true")
}

impl PackageService for EncryptedPackages {
    fn upsert_repository(&self, name: &str, expires: Option<DateTime<Utc>>) -> Result<()> {
        self.inner.upsert_repository(name, expires)
    }

    fn get_repositories(&self) -> Result<Vec<String>> {
        self.inner.get_repositories()
    }

    fn create_package(
        &self,
        locator: &Locator,
        data: &mut dyn Read,
        mut options: PackageOptions,
    ) -> Result<PackageEnvelope> {
        let mut plaintext = Vec::new();
        data.read_to_end(&mut plaintext)?;
        let sealed = self.encrypt(locator, &plaintext)?;

        options
            .labels
            .insert(ENCRYPTED_LABEL.to_string(), "true".to_string());
        debug!(package = %locator, size = plaintext.len(), "encrypted package");
        self.inner
            .create_package(locator, &mut Cursor::new(sealed), options)
    }

    fn read_package_envelope(&self, locator: &Locator) -> Result<PackageEnvelope> {
        self.inner.read_package_envelope(locator)
    }

    fn read_package(&self, locator: &Locator) -> Result<(PackageEnvelope, PackageReader)> {
        let (envelope, mut reader) = self.inner.read_package(locator)?;
        if !is_encrypted(&envelope) {
            return Ok((envelope, reader));
        }

        let mut sealed = Vec::new();
        reader
            .read_to_end(&mut sealed)
            .map_err(|source| StoreError::ContentUnreadable {
                locator: locator.clone(),
                source,
            })?;
        let plaintext = self.decrypt(locator, &sealed)?;
        Ok((envelope, Box::new(Cursor::new(plaintext))))
    }

    fn get_packages(&self, repository: &str) -> Result<Vec<PackageEnvelope>> {
        self.inner.get_packages(repository)
    }

    fn delete_package(&self, locator: &Locator) -> Result<()> {
        self.inner.delete_package(locator)
    }
}
