use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::error::StorageError;

/// Upper bound (exclusive) of the random component in generated names.
const RANDOM_SPAN: u32 = 1_000_000_000;

/// A validated, flat blob filename such as `1718000000000-482913377.png`.
///
/// Every name handed to the filesystem goes through [`StoredName::parse`] or
/// [`StoredName::generate`], so it never contains separators, `..`, control
/// characters or a leading dot.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StoredName(String);

impl StoredName {
    /// Generate a new name from a timestamp, a random component and the
    /// caller's extension (with or without a leading dot).
    pub fn generate(at: DateTime<Utc>, extension: &str) -> Result<Self, StorageError> {
        let random = rand::rng().random_range(0..RANDOM_SPAN);
        Self::compose(at.timestamp_millis(), random, extension)
    }

    fn compose(millis: i64, random: u32, extension: &str) -> Result<Self, StorageError> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        if extension.is_empty() {
            return Ok(Self(format!("{millis}-{random}")));
        }
        if !extension.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(StorageError::InvalidName(format!(
                "unsupported extension '{extension}'"
            )));
        }
        Ok(Self(format!("{millis}-{random}.{extension}")))
    }

    /// Validate an untrusted name (e.g. from a URL path).
    pub fn parse(name: &str) -> Result<Self, StorageError> {
        let reason = if name.is_empty() {
            Some("name is empty")
        } else if name.len() > 255 {
            Some("name is too long")
        } else if name.chars().any(|c| c.is_control()) {
            Some("control characters are not allowed")
        } else if name.contains('/') || name.contains('\\') {
            Some("path separators are not allowed")
        } else if name.contains("..") {
            Some("'..' is not allowed")
        } else if name.starts_with('.') {
            Some("hidden names are not allowed")
        } else if name.contains(':') {
            Some("':' is not allowed")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(StorageError::InvalidName(reason.into())),
            None => Ok(Self(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Extension without the leading dot, if any.
    pub fn extension(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl TryFrom<String> for StoredName {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<StoredName> for String {
    fn from(name: StoredName) -> Self {
        name.0
    }
}

impl fmt::Debug for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StoredName({})", self.0)
    }
}

impl fmt::Display for StoredName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
