//! Decides whether a dataset must be written.

use std::fmt;

use crate::dataset::{DatasetId, GroupPath};
use crate::error::Result;
use crate::store::ProductStore;
use crate::versions::VersionRegistry;

/// What to do with one dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Staleness {
    /// The dataset does not exist.
    Create,
    /// The dataset exists but was produced by another pipeline version.
    Update,
    /// The dataset is current.
    Skip,
}

impl Staleness {
    /// Returns true if the dataset has to be (re)computed.
    #[inline]
    pub fn needs_write(self) -> bool {
        !matches!(self, Self::Skip)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Skip => "skip",
        })
    }
}

/// Compares stored dataset versions against a [`VersionRegistry`].
#[derive(Debug, Clone, Copy)]
pub struct StalenessPolicy<'a> {
    registry: &'a VersionRegistry,
}

impl<'a> StalenessPolicy<'a> {
    /// Creates a policy against `registry`.
    pub fn new(registry: &'a VersionRegistry) -> Self {
        Self { registry }
    }

    /// Registry the policy consults.
    pub fn registry(&self) -> &'a VersionRegistry {
        self.registry
    }

    /// Decides what to do with `id` inside `group`.
    ///
    /// The registry is consulted before the store, so a missing registry
    /// entry fails even when the dataset does not exist yet.
    ///
    /// # Errors
    /// Returns [`crate::Error::MissingVersion`] if the registry has no entry
    /// for `id`, or any error raised by the store.
    pub fn decide<S: ProductStore + ?Sized>(
        &self,
        store: &S,
        group: GroupPath,
        id: DatasetId,
    ) -> Result<Staleness> {
        let latest = self.registry.latest(id)?;
        let path = group.dataset(id);
        if !store.dataset_exists(&path)? {
            return Ok(Staleness::Create);
        }
        match store.stored_version(&path)? {
            Some(stored) if stored == i64::from(latest) => Ok(Staleness::Skip),
            _ => Ok(Staleness::Update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Segment;
    use crate::store::{DatasetAttributes, MemoryStore, ProductArray};
    use crate::Error;
    use ndarray::array;

    fn registry() -> VersionRegistry {
        VersionRegistry::from_json(r#"{"apsis_sol": 2, "sol": 7}"#).unwrap()
    }

    #[test]
    fn test_create_update_skip() {
        let registry = registry();
        let policy = StalenessPolicy::new(&registry);
        let group = GroupPath::Apsis(Segment::Apoapse);
        let mut store = MemoryStore::new();
        store.require_group(&group.path()).unwrap();

        assert_eq!(
            policy.decide(&store, group, DatasetId::ApsisSol).unwrap(),
            Staleness::Create
        );

        let data = ProductArray::from(array![12.0]);
        store
            .write(&group.path(), "sol", &data, &DatasetAttributes::new(1, "", ""))
            .unwrap();
        assert_eq!(
            policy.decide(&store, group, DatasetId::ApsisSol).unwrap(),
            Staleness::Update
        );

        store.set_version("apoapse/apsis/sol", 2).unwrap();
        assert_eq!(
            policy.decide(&store, group, DatasetId::ApsisSol).unwrap(),
            Staleness::Skip
        );
    }

    #[test]
    fn test_composite_key_is_used() {
        // "sol" is registered at 7 but the apsis dataset reads "apsis_sol".
        let registry = registry();
        let policy = StalenessPolicy::new(&registry);
        let group = GroupPath::Apsis(Segment::Apoapse);
        let mut store = MemoryStore::new();
        store.require_group(&group.path()).unwrap();
        store
            .write(
                &group.path(),
                "sol",
                &ProductArray::from(array![1.0]),
                &DatasetAttributes::new(2, "", ""),
            )
            .unwrap();
        assert_eq!(
            policy.decide(&store, group, DatasetId::ApsisSol).unwrap(),
            Staleness::Skip
        );
    }

    #[test]
    fn test_missing_registry_entry_fails() {
        let registry = registry();
        let policy = StalenessPolicy::new(&registry);
        let store = MemoryStore::new();
        let err = policy
            .decide(&store, GroupPath::Integration(Segment::Apoapse), DatasetId::SwathNumber)
            .unwrap_err();
        assert!(matches!(err, Error::MissingVersion { .. }));
    }
}
