//! QR code validation against the bundled and user-registered code sets.
//!
//! A scanned code is valid when it appears in either set. Lookups compare
//! bytes exactly: no trimming, no case folding. Scanner output with stray
//! whitespace must be cleaned by the caller before it gets here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{BinscanError, Result};
use crate::storage::{Storage, USER_CODES_KEY};

const BUNDLED_CODES: &str = include_str!("../data/codes.json");

/// Longest code accepted for registration, in bytes.
pub const MAX_CODE_LENGTH: usize = 256;

#[allow(clippy::expect_used)] // literal pattern, covered by the format tests
static CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s\p{Cc}]+$").expect("code pattern is a valid regex"));

/// `true` iff `code` is a member of `bundled ∪ user`.
#[must_use]
pub fn is_valid(code: &str, bundled: &CodeSet, user: &CodeSet) -> bool {
    bundled.contains(code) || user.contains(code)
}

/// A set of recognized codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CodeSet(BTreeSet<String>);

/// On-disk shapes accepted for a code list: a plain array, or a
/// `{code: true}` presence map.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredCodes {
    List(Vec<String>),
    Presence(BTreeMap<String, bool>),
}

impl<'de> Deserialize<'de> for CodeSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let codes = match StoredCodes::deserialize(deserializer)? {
            StoredCodes::List(list) => list.into_iter().collect(),
            StoredCodes::Presence(map) => map
                .into_iter()
                .filter_map(|(code, present)| present.then_some(code))
                .collect(),
        };
        Ok(Self(codes))
    }
}

impl<S: Into<String>> FromIterator<S> for CodeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl CodeSet {
    /// Parse a JSON code list.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::BundledDataInvalid`] naming `source_name`.
    pub fn from_json(source_name: &str, json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BinscanError::BundledDataInvalid {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// The code list that ships with the crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the packaged data is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_json("bundled codes", BUNDLED_CODES)
    }

    /// Load a code list from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&path.display().to_string(), &content)
    }

    /// Exact membership test.
    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    /// Add a code; returns `true` if it was not present.
    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        self.0.insert(code.into())
    }

    /// Number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Codes in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Check a code is acceptable for registration.
///
/// # Errors
///
/// Returns [`BinscanError::InvalidCode`] for empty codes, codes containing
/// whitespace or control characters, or codes longer than [`MAX_CODE_LENGTH`].
pub fn validate_code_format(code: &str) -> Result<()> {
    let reject = |reason| {
        Err(BinscanError::InvalidCode {
            code: code.to_string(),
            reason,
        })
    };

    if code.is_empty() {
        return reject("code must not be empty");
    }
    if code.len() > MAX_CODE_LENGTH {
        return reject("code is longer than 256 bytes");
    }
    if !CODE_PATTERN.is_match(code) {
        return reject("code must not contain whitespace or control characters");
    }
    Ok(())
}

/// The bundled code set together with the user's registered codes.
#[derive(Debug, Clone, Default)]
pub struct ValidCodeSet {
    bundled: CodeSet,
    user: CodeSet,
}

impl ValidCodeSet {
    /// Compose a validator from its two sources.
    #[must_use]
    pub const fn new(bundled: CodeSet, user: CodeSet) -> Self {
        Self { bundled, user }
    }

    /// Bundled codes plus whatever user codes are in storage.
    ///
    /// # Errors
    ///
    /// Returns an error if stored user codes exist but cannot be read.
    pub fn load(bundled: CodeSet, storage: &Storage) -> Result<Self> {
        let user: CodeSet = storage.load(USER_CODES_KEY)?.unwrap_or_default();
        tracing::info!(
            bundled = bundled.len(),
            user = user.len(),
            "Loaded valid code sets"
        );
        Ok(Self::new(bundled, user))
    }

    /// Whether `code` is recognized by either source.
    #[must_use]
    pub fn is_valid(&self, code: &str) -> bool {
        is_valid(code, &self.bundled, &self.user)
    }

    /// Read-only bundled codes.
    #[must_use]
    pub const fn bundled(&self) -> &CodeSet {
        &self.bundled
    }

    /// User-registered codes.
    #[must_use]
    pub const fn user(&self) -> &CodeSet {
        &self.user
    }

    /// Register a code in the user set.
    ///
    /// Returns `true` if the code was newly added, `false` if it was already
    /// recognized by either source.
    ///
    /// # Errors
    ///
    /// Returns [`BinscanError::InvalidCode`] if the code is malformed.
    pub fn register(&mut self, code: &str) -> Result<bool> {
        validate_code_format(code)?;
        if self.bundled.contains(code) {
            return Ok(false);
        }
        let added = self.user.insert(code);
        if added {
            tracing::info!(code, "Registered user code");
        }
        Ok(added)
    }

    /// Register a code and persist the user set.
    ///
    /// The in-memory set only changes once the save has succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the code is malformed or the save fails.
    pub fn register_and_save(&mut self, code: &str, storage: &Storage) -> Result<bool> {
        validate_code_format(code)?;
        if self.is_valid(code) {
            return Ok(false);
        }

        let mut user = self.user.clone();
        user.insert(code);
        storage.save(USER_CODES_KEY, &user)?;
        self.user = user;
        tracing::info!(code, "Registered and saved user code");
        Ok(true)
    }
}
