//! iuvs-algorithms: Numeric kernels behind the IUVS data products.
//!
//! This crate provides:
//! - **Swath segmentation** - mirror-angle discontinuities and manual caveats
//! - **Calibration** - flatfield, sensitivity and MCP gain corrections
//! - **Geometry** - subpoints, haversine angles and APP flip detection
//! - **Classification** - failsafe, dayside and nightside experiments
//!
#![warn(missing_docs)]

pub mod binning;
pub mod calibration;
pub mod classification;
pub mod geometry;
pub mod mars_calendar;
pub mod stats;
pub mod swath;

pub use binning::{bin_edges, bin_width};
pub use calibration::{BrightnessInput, CalibrationTables, ReferenceBinning, DETECTOR_PIXELS};
pub use classification::{classify_file, classify_voltage, experiment_mask, files_of};
pub use geometry::{app_flip, haversine, latitude_longitude, subpoint, Body, Ephemeris};
pub use swath::{
    classify_opportunity, compute_swath_number, number_of_swaths, SwathCaveat, SwathCaveats,
};
