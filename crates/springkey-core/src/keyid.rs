//! OpenPGP key identifiers
//!
//! A [`KeyId`] is the 8-byte "long" identifier of a key. Its canonical
//! rendering is 16 lowercase hexadecimal characters, which is the only form
//! ever returned to callers.

use std::fmt;
use std::str::FromStr;

use sequoia_openpgp as openpgp;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// 8-byte big-endian key identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

/// Error returned when a key id cannot be read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyIdError {
    #[error("Key id must be 8 bytes, got {0}")]
    Length(usize),

    #[error("Key id must be 16 hex characters")]
    Format,
}

impl KeyId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Read a key id from its big-endian byte form
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyIdError> {
        let raw: [u8; 8] = bytes
            .try_into()
            .map_err(|_| KeyIdError::Length(bytes.len()))?;
        Ok(Self(u64::from_be_bytes(raw)))
    }

    pub fn to_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    /// Canonical 16-character lowercase hex rendering
    pub fn long_id(&self) -> String {
        format!("{:016x}", self.0)
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for KeyId {
    type Err = KeyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 16 {
            return Err(KeyIdError::Format);
        }
        u64::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| KeyIdError::Format)
    }
}

impl From<u64> for KeyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl TryFrom<&openpgp::KeyID> for KeyId {
    type Error = KeyIdError;

    fn try_from(id: &openpgp::KeyID) -> Result<Self, Self::Error> {
        Self::from_bytes(id.as_bytes())
    }
}

impl TryFrom<&openpgp::Fingerprint> for KeyId {
    type Error = KeyIdError;

    fn try_from(fpr: &openpgp::Fingerprint) -> Result<Self, Self::Error> {
        Self::try_from(&openpgp::KeyID::from(fpr))
    }
}

impl Serialize for KeyId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
