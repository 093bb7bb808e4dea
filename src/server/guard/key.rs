use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;

/// Process-wide secret that keys every verification hash.
///
/// Replacing the key invalidates every outstanding verification link.
#[derive(Clone)]
pub struct HashKey {
    key: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("decode base64 hash key: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("hash key must be at least {min} bytes, got {len}")]
    TooShort { len: usize, min: usize },
}

impl HashKey {
    pub const MIN_LENGTH: usize = 16;
    pub const GENERATE_LENGTH: usize = 32;

    pub fn new(key: Vec<u8>) -> Result<Self, KeyError> {
        if key.len() < Self::MIN_LENGTH {
            return Err(KeyError::TooShort {
                len: key.len(),
                min: Self::MIN_LENGTH,
            });
        }
        Ok(Self { key })
    }

    pub fn generate() -> Self {
        let mut key = vec![0u8; Self::GENERATE_LENGTH];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    /// Parses a base64 (standard alphabet) key, surrounding whitespace is
    /// ignored so that key files may end with a newline.
    pub fn decode(s: &str) -> Result<Self, KeyError> {
        let key = STANDARD.decode(s.trim())?;
        Self::new(key)
    }

    pub fn encode(&self) -> String {
        STANDARD.encode(&self.key)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }
}

impl fmt::Debug for HashKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashKey(<{} bytes>)", self.key.len())
    }
}
