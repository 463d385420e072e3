//! The derivation engine.
//!
//! A [`Deriver`] visits datasets one at a time. For each it asks the
//! [`StalenessPolicy`] whether the stored copy is current, runs the
//! computation only when it is not, and writes the result with the
//! registry version, unit and comment of the dataset.
//!
//! Datasets name the paths they read. When one of those was written earlier
//! in the same run the dependent dataset is rewritten too, so bumping one
//! registry version re-derives everything downstream of it.

use std::collections::HashSet;

use iuvs_core::{
    DatasetAttributes, DatasetId, GroupPath, ProductArray, ProductStore, Result, Staleness,
    StalenessPolicy, VersionRegistry,
};

use super::report::DerivationReport;

/// Evaluates derivations against one product.
pub struct Deriver<'a, S: ProductStore + ?Sized> {
    store: &'a mut S,
    policy: StalenessPolicy<'a>,
    written: HashSet<String>,
    report: DerivationReport,
}

impl<'a, S: ProductStore + ?Sized> Deriver<'a, S> {
    /// Creates a deriver writing to `store` under `registry`.
    pub fn new(store: &'a mut S, registry: &'a VersionRegistry) -> Self {
        Self {
            store,
            policy: StalenessPolicy::new(registry),
            written: HashSet::new(),
            report: DerivationReport::new(),
        }
    }

    /// Store being updated.
    pub fn store(&self) -> &S {
        &*self.store
    }

    /// Mutable access to the store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut *self.store
    }

    /// Registry versions are taken from.
    pub fn registry(&self) -> &'a VersionRegistry {
        self.policy.registry()
    }

    /// Decisions made so far.
    pub fn report(&self) -> &DerivationReport {
        &self.report
    }

    /// Consumes the deriver and returns its decisions.
    pub fn into_report(self) -> DerivationReport {
        self.report
    }

    /// Returns true if `path` was created or updated during this run.
    pub fn was_written(&self, path: &str) -> bool {
        self.written.contains(path)
    }

    /// Decision for `id` in `group`, promoted from SKIP to UPDATE when an
    /// input was rewritten during this run.
    ///
    /// # Errors
    /// Returns [`iuvs_core::Error::MissingVersion`] when the registry has no
    /// entry for `id`, or a store error.
    pub fn decide(&self, group: GroupPath, id: DatasetId, inputs: &[String]) -> Result<Staleness> {
        let decision = self.policy.decide(&*self.store, group, id)?;
        if decision == Staleness::Skip && inputs.iter().any(|p| self.written.contains(p)) {
            return Ok(Staleness::Update);
        }
        Ok(decision)
    }

    /// Derives one dataset.
    ///
    /// `compute` receives the store to read its `inputs` from and is only
    /// called when the dataset has to be written.
    ///
    /// # Errors
    /// Propagates registry, store and computation errors.
    pub fn derive<F>(
        &mut self,
        group: GroupPath,
        id: DatasetId,
        inputs: &[String],
        compute: F,
    ) -> Result<Staleness>
    where
        F: FnOnce(&S) -> Result<ProductArray>,
    {
        self.derive_annotated(group, id, inputs, false, |store| {
            Ok((compute(store)?, Vec::new()))
        })
    }

    /// Derives one dataset that carries extra integer attributes.
    ///
    /// `stale` forces a rewrite of a dataset that is otherwise current.
    ///
    /// # Errors
    /// Propagates registry, store and computation errors.
    pub fn derive_annotated<F>(
        &mut self,
        group: GroupPath,
        id: DatasetId,
        inputs: &[String],
        stale: bool,
        compute: F,
    ) -> Result<Staleness>
    where
        F: FnOnce(&S) -> Result<(ProductArray, Vec<(String, i64)>)>,
    {
        let path = group.dataset(id);
        let mut decision = self.decide(group, id, inputs)?;
        if decision == Staleness::Skip && stale {
            decision = Staleness::Update;
        }
        let version = self.registry().latest(id)?;
        log::debug!("{path}: {decision} (version {version})");

        if decision.needs_write() {
            let (data, extra) = compute(&*self.store)?;
            let spec = id.spec();
            let mut attributes = DatasetAttributes::new(version, spec.unit, spec.comment);
            attributes.extra = extra;
            self.store
                .write(&group.path(), id.name(), &data, &attributes)?;
            self.written.insert(path.clone());
        }
        self.report.record(path, decision);
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iuvs_core::{MemoryStore, Segment};
    use ndarray::array;

    fn registry() -> VersionRegistry {
        VersionRegistry::bundled().unwrap()
    }

    fn setup() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.require_group("apoapse/integration").unwrap();
        store
    }

    #[test]
    fn test_derive_creates_then_skips() {
        let registry = registry();
        let mut store = setup();
        let group = GroupPath::Integration(Segment::Apoapse);
        {
            let mut deriver = Deriver::new(&mut store, &registry);
            let decision = deriver
                .derive(group, DatasetId::EphemerisTime, &[], |_| {
                    Ok(array![1.0, 2.0].into())
                })
                .unwrap();
            assert_eq!(decision, Staleness::Create);
        }
        let attrs = store.attributes("apoapse/integration/ephemeris_time").unwrap();
        assert_eq!(attrs.unit, DatasetId::EphemerisTime.spec().unit);
        assert_eq!(attrs.version, registry.latest(DatasetId::EphemerisTime).unwrap());

        let mut deriver = Deriver::new(&mut store, &registry);
        let decision = deriver
            .derive(group, DatasetId::EphemerisTime, &[], |_| {
                panic!("current datasets are not recomputed")
            })
            .unwrap();
        assert_eq!(decision, Staleness::Skip);
    }

    #[test]
    fn test_written_input_promotes_skip() {
        let registry = registry();
        let mut store = setup();
        let group = GroupPath::Integration(Segment::Apoapse);
        let fov = group.dataset(DatasetId::FieldOfView);
        {
            let mut deriver = Deriver::new(&mut store, &registry);
            deriver
                .derive(group, DatasetId::FieldOfView, &[], |_| Ok(array![60.0].into()))
                .unwrap();
            deriver
                .derive(group, DatasetId::SwathNumber, &[fov.clone()], |_| {
                    Ok(array![0_i64].into())
                })
                .unwrap();
        }
        store.set_version(&fov, 0).unwrap();

        let mut deriver = Deriver::new(&mut store, &registry);
        deriver
            .derive(group, DatasetId::FieldOfView, &[], |_| Ok(array![60.0].into()))
            .unwrap();
        assert!(deriver.was_written(&fov));
        let decision = deriver
            .derive(group, DatasetId::SwathNumber, &[fov], |_| Ok(array![0_i64].into()))
            .unwrap();
        assert_eq!(decision, Staleness::Update);
    }

    #[test]
    fn test_stale_flag_and_extra_attributes() {
        let registry = registry();
        let mut store = setup();
        let group = GroupPath::Integration(Segment::Apoapse);
        for (stale, expected) in [(false, Staleness::Create), (true, Staleness::Update)] {
            let mut deriver = Deriver::new(&mut store, &registry);
            let decision = deriver
                .derive_annotated(group, DatasetId::SwathNumber, &[], stale, |_| {
                    Ok((array![0_i64].into(), vec![("last_validated_orbit".into(), 7)]))
                })
                .unwrap();
            assert_eq!(decision, expected);
        }
        assert_eq!(
            store
                .dataset_attribute("apoapse/integration/swath_number", "last_validated_orbit")
                .unwrap(),
            Some(7)
        );
    }

    #[test]
    fn test_missing_registry_entry_is_fatal() {
        let registry = VersionRegistry::default();
        let mut store = setup();
        let mut deriver = Deriver::new(&mut store, &registry);
        let err = deriver
            .derive(
                GroupPath::Integration(Segment::Apoapse),
                DatasetId::EphemerisTime,
                &[],
                |_| Ok(array![1.0].into()),
            )
            .unwrap_err();
        assert!(matches!(err, iuvs_core::Error::MissingVersion { .. }));
        assert_eq!(store.writes(), 0);
    }
}
