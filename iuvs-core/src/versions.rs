//! Registry of the latest pipeline version of every dataset.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::dataset::DatasetId;
use crate::error::{Error, Result};

/// Key of the swath caveat threshold inside the registry file.
pub const LAST_VALIDATED_ORBIT_KEY: &str = "last_validated_orbit";

const BUNDLED: &str = include_str!("../resources/versions.json");

/// JSON layout of the registry file.
#[derive(Deserialize)]
struct JsonRegistry {
    #[serde(default)]
    last_validated_orbit: u32,
    #[serde(flatten)]
    versions: BTreeMap<String, u32>,
}

/// Mapping from registry key to the latest pipeline version.
///
/// Loaded once and never modified for the rest of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRegistry {
    versions: BTreeMap<String, u32>,
    last_validated_orbit: u32,
}

impl VersionRegistry {
    /// Creates a registry from explicit entries.
    pub fn new(versions: BTreeMap<String, u32>, last_validated_orbit: u32) -> Self {
        Self {
            versions,
            last_validated_orbit,
        }
    }

    /// Parses a registry from JSON.
    ///
    /// The document is a flat object of integer values. The reserved key
    /// `last_validated_orbit` is read separately and defaults to 0.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the JSON is malformed or a value is
    /// not a non-negative integer.
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: JsonRegistry = serde_json::from_str(json)?;
        Ok(Self::new(parsed.versions, parsed.last_validated_orbit))
    }

    /// Reads a registry from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        let registry = Self::from_json(&json)?;
        log::info!(
            "loaded {} dataset versions from {} (last validated orbit {})",
            registry.len(),
            path.display(),
            registry.last_validated_orbit
        );
        Ok(registry)
    }

    /// The registry shipped with the pipeline.
    ///
    /// # Errors
    /// Returns an error only if the bundled resource is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED)
    }

    /// Latest version of `id`.
    ///
    /// # Errors
    /// Returns [`Error::MissingVersion`] if the registry has no entry for
    /// the dataset's registry key.
    pub fn latest(&self, id: DatasetId) -> Result<u32> {
        self.latest_key(id.registry_key())
    }

    /// Latest version registered under a raw key.
    ///
    /// # Errors
    /// Returns [`Error::MissingVersion`] if `key` is not registered.
    pub fn latest_key(&self, key: &str) -> Result<u32> {
        self.versions
            .get(key)
            .copied()
            .ok_or_else(|| Error::MissingVersion {
                key: key.to_string(),
            })
    }

    /// Highest orbit whose swath caveats have been validated.
    pub fn last_validated_orbit(&self) -> u32 {
        self.last_validated_orbit
    }

    /// Returns a copy with `key` set to `version`.
    #[must_use]
    pub fn with_version(mut self, key: &str, version: u32) -> Self {
        self.versions.insert(key.to_string(), version);
        self
    }

    /// Returns a copy with a new caveat threshold.
    #[must_use]
    pub fn with_last_validated_orbit(mut self, orbit: u32) -> Self {
        self.last_validated_orbit = orbit;
        self
    }

    /// Dataset identifiers whose registry key is missing.
    pub fn missing(&self) -> Vec<DatasetId> {
        DatasetId::ALL
            .into_iter()
            .filter(|id| !self.versions.contains_key(id.registry_key()))
            .collect()
    }

    /// Iterates over `(key, version)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    /// True when no key is registered.
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
