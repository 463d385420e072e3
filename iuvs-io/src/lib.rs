//! iuvs-io: Product storage, raw record sources and the derivation pipeline.
//!
//! This crate provides:
//! - **HDF5 products** - one file per orbit behind [`iuvs_core::ProductStore`]
//! - **Record sources** - raw telemetry of an orbit, segment and channel
//! - **Ephemeris tables** - tabulated geometry for the apsis groups
//! - **Pipeline** - incremental derivation of every product group
//!
#![warn(missing_docs)]

#[cfg(feature = "hdf5")]
mod calibration;
pub mod ephemeris;
mod error;
#[cfg(feature = "hdf5")]
pub mod hdf5;
pub mod pipeline;
pub mod records;

#[cfg(feature = "hdf5")]
pub use calibration::load_calibration;
pub use ephemeris::{ApsisEphemeris, EphemerisSample, TabulatedEphemeris};
pub use error::{Error, Result};
#[cfg(feature = "hdf5")]
pub use self::hdf5::Hdf5Product;
#[cfg(feature = "hdf5")]
pub use pipeline::process_orbit;
pub use pipeline::{
    process_orbit_in, process_segment, require_layout, DerivationReport, Deriver,
    PipelineContext, DEFAULT_PLAN,
};
pub use records::{read_file, JsonRecordSource, RecordSource};
