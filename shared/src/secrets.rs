//! KMS-backed secret resolution.

use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::Client as KmsClient;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{Error, Result};

/// Decrypts base64 KMS ciphertexts held in environment variables.
///
/// Plaintexts are memoised per ciphertext for the life of the process, so a
/// warm Lambda only calls KMS once per secret.
pub struct SecretResolver {
    kms: Option<KmsClient>,
    cache: RwLock<HashMap<String, String>>,
}

impl SecretResolver {
    /// Create a resolver backed by the given KMS client.
    pub fn new(client: KmsClient) -> Self {
        Self {
            kms: Some(client),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Create a resolver that passes configured values through unchanged.
    ///
    /// Used by local runs and tests where secrets are not encrypted.
    pub fn plaintext() -> Self {
        Self {
            kms: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Decrypt a single ciphertext into its plaintext value.
    pub async fn decrypt(&self, ciphertext: &str) -> Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(value) = cache.get(ciphertext) {
                return Ok(value.clone());
            }
        }

        let plaintext = match &self.kms {
            Some(kms) => {
                let blob = STANDARD
                    .decode(ciphertext)
                    .map_err(|e| Error::Config(format!("Secret is not valid base64: {}", e)))?;

                let response = kms
                    .decrypt()
                    .ciphertext_blob(Blob::new(blob))
                    .send()
                    .await
                    .map_err(|e| Error::Aws(format!("Failed to decrypt secret: {}", e)))?;

                let bytes = response
                    .plaintext()
                    .ok_or_else(|| Error::Aws("Decrypted secret has no plaintext".to_string()))?;

                String::from_utf8(bytes.as_ref().to_vec())
                    .map_err(|e| Error::Aws(format!("Decrypted secret is not UTF-8: {}", e)))?
            }
            None => ciphertext.to_string(),
        };

        let mut cache = self.cache.write().await;
        cache.insert(ciphertext.to_string(), plaintext.clone());

        Ok(plaintext)
    }
}
