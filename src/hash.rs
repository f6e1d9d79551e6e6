// src/hash.rs

//! SHA-256 content hashing for archive integrity
//!
//! Archives and build files are identified by the SHA-256 of their bytes.
//! Hashes are kept as lower-case hex strings and (de)serialize as such.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

/// Length of a SHA-256 digest as hex
pub const SHA256_HEX_LEN: usize = 64;

/// Buffer size for streaming file hashing (8 KB)
const HASH_BUFFER_SIZE: usize = 8192;

/// A validated SHA-256 digest in lower-case hex
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sha256Hash(String);

impl Sha256Hash {
    /// Parse a hex digest, accepting either case
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() != SHA256_HEX_LEN || !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidHash(value));
        }
        Ok(Self(value.to_lowercase()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Sha256Hash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl Serialize for Sha256Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Sha256Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

/// Compute the hash of a byte slice
pub fn hash_bytes(data: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    Sha256Hash(format!("{:x}", hasher.finalize()))
}

/// Compute the hash of everything a reader yields
pub fn hash_reader<R: Read>(reader: &mut R) -> io::Result<Sha256Hash> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(Sha256Hash(format!("{:x}", hasher.finalize())))
}

/// Hash a file by streaming it; blocking
pub fn hash_file(path: &Path) -> Result<Sha256Hash> {
    let mut file = std::fs::File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", path.display())))?;
    hash_reader(&mut file)
        .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))
}

/// Hash a file on the blocking thread pool
pub async fn hash_file_async(path: &Path) -> Result<Sha256Hash> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || hash_file(&owned))
        .await
        .map_err(|e| Error::IoError(format!("Hash task failed: {e}")))?
}
