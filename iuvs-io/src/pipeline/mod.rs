//! Orbit processing.
//!
//! One call to [`process_orbit`] brings one product file up to date: the
//! group layout is created, then every group is derived in dependency
//! order. Apsis quantities come first, then the integration, spacecraft
//! geometry and channel groups, then the binning, detector and bin geometry
//! groups of every experiment.

mod apsis;
mod channel;
pub mod engine;
mod experiment;
mod integration;
pub mod layout;
pub mod report;
mod spacecraft_geometry;

use iuvs_algorithms::{CalibrationTables, SwathCaveats};
use iuvs_core::{
    Channel, Experiment, InstrumentConstants, Orbit, ProductStore, RawRecord, Segment,
    VersionRegistry,
};

use crate::ephemeris::ApsisEphemeris;
use crate::records::RecordSource;
use crate::Result;

pub use engine::Deriver;
pub use layout::require_layout;
pub use report::DerivationReport;

/// Read-only inputs shared by every orbit of a run.
#[derive(Clone, Copy)]
pub struct PipelineContext<'a> {
    /// Instrument constants.
    pub constants: &'a InstrumentConstants,
    /// Latest dataset versions.
    pub registry: &'a VersionRegistry,
    /// Manual swath corrections.
    pub caveats: &'a SwathCaveats,
    /// Without tables, brightness is not derived.
    pub calibration: Option<&'a CalibrationTables>,
    /// Without an ephemeris, the apsis groups are not derived.
    pub ephemeris: Option<&'a dyn ApsisEphemeris>,
    /// Written as the root `version` attribute and appended to file names.
    pub product_version: Option<u32>,
}

impl<'a> PipelineContext<'a> {
    /// Context without calibration, ephemeris or product version.
    pub fn new(
        constants: &'a InstrumentConstants,
        registry: &'a VersionRegistry,
        caveats: &'a SwathCaveats,
    ) -> Self {
        Self {
            constants,
            registry,
            caveats,
            calibration: None,
            ephemeris: None,
            product_version: None,
        }
    }

    /// Derives brightness with `calibration`.
    #[must_use]
    pub fn with_calibration(mut self, calibration: &'a CalibrationTables) -> Self {
        self.calibration = Some(calibration);
        self
    }

    /// Derives the apsis groups from `ephemeris`.
    #[must_use]
    pub fn with_ephemeris(mut self, ephemeris: &'a dyn ApsisEphemeris) -> Self {
        self.ephemeris = Some(ephemeris);
        self
    }

    /// Sets the product version.
    #[must_use]
    pub fn with_product_version(mut self, version: u32) -> Self {
        self.product_version = Some(version);
        self
    }
}

/// Segments and channels processed for every orbit.
pub const DEFAULT_PLAN: [(Segment, Channel); 1] = [(Segment::Apoapse, Channel::Muv)];

/// Derives every group of one segment and channel from `record`.
///
/// # Errors
/// Fails on the first derivation that fails; datasets written before it
/// stay in the store.
pub fn process_segment<S: ProductStore + ?Sized>(
    store: &mut S,
    record: &RawRecord,
    orbit: Orbit,
    segment: Segment,
    channel: Channel,
    context: &PipelineContext<'_>,
) -> iuvs_core::Result<DerivationReport> {
    require_layout(store, orbit, segment, channel, context.product_version)?;
    let mut deriver = Deriver::new(store, context.registry);

    match context.ephemeris {
        Some(ephemeris) => apsis::derive(&mut deriver, orbit, segment, ephemeris)?,
        None => log::warn!("{}: no ephemeris, skipping apsis", orbit.code()),
    }
    integration::derive(&mut deriver, record, orbit, segment, context)?;
    spacecraft_geometry::derive(&mut deriver, record, segment, context.constants)?;
    channel::derive(&mut deriver, record, orbit, segment, channel, context.constants)?;
    for experiment in Experiment::ALL {
        experiment::derive(&mut deriver, record, orbit, segment, channel, experiment, context)?;
    }
    Ok(deriver.into_report())
}

/// Brings one product up to date for every segment and channel of `plan`.
///
/// # Errors
/// Returns an error if a record cannot be loaded or a derivation fails.
pub fn process_orbit_in<S: ProductStore + ?Sized>(
    store: &mut S,
    source: &dyn RecordSource,
    orbit: Orbit,
    plan: &[(Segment, Channel)],
    context: &PipelineContext<'_>,
) -> Result<DerivationReport> {
    let mut report = DerivationReport::new();
    for &(segment, channel) in plan {
        let record = source.load(orbit, segment, channel)?;
        report.merge(process_segment(store, &record, orbit, segment, channel, context)?);
    }
    log::info!("{}: {report}", orbit.code());
    Ok(report)
}

/// Opens or creates the product file of `orbit` under `save_root` and
/// brings it up to date.
///
/// # Errors
/// Returns an error if the file cannot be opened or processing fails.
#[cfg(feature = "hdf5")]
pub fn process_orbit(
    save_root: &std::path::Path,
    source: &dyn RecordSource,
    orbit: Orbit,
    plan: &[(Segment, Channel)],
    context: &PipelineContext<'_>,
) -> Result<DerivationReport> {
    let path = orbit.product_path(save_root, context.product_version);
    let mut product =
        crate::hdf5::Hdf5Product::open_or_create(&path, context.constants.deflate_level)?;
    let report = process_orbit_in(&mut product, source, orbit, plan, context)?;
    product.flush()?;
    Ok(report)
}
