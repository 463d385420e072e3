//! iuvs-core: Core types for versioned IUVS data products.
//!
//! This crate provides the instrument constants, dataset identifiers,
//! version registry, raw record types and the product store abstraction
//! shared by the derivation engine.
//!
#![warn(missing_docs)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod orbit;
pub mod records;
pub mod staleness;
pub mod store;
pub mod versions;

pub use config::InstrumentConstants;
pub use dataset::{Channel, DatasetId, DatasetSpec, Experiment, GroupCategory, GroupPath, Segment};
pub use error::{Error, Result};
pub use orbit::Orbit;
pub use records::{
    BinningTable, DetectorImages, IntegrationTable, ObservationTable, PixelGeometryTable,
    RawFile, RawRecord, SpacecraftGeometryTable,
};
pub use staleness::{Staleness, StalenessPolicy};
pub use store::{DatasetAttributes, MemoryStore, ProductArray, ProductStore};
pub use versions::VersionRegistry;
