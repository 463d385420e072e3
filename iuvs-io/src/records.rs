//! Raw record sources.
//!
//! The derivations consume [`RawRecord`]s and do not care where they come
//! from. [`JsonRecordSource`] reads telemetry exported one JSON document
//! per data file, laid out like the Level 1b archive:
//! `<root>/<orbit_block>/*<segment>*<orbit_code>*<channel>*.json`.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use iuvs_core::{
    BinningTable, Channel, DetectorImages, IntegrationTable, ObservationTable, Orbit,
    PixelGeometryTable, RawFile, RawRecord, Segment, SpacecraftGeometryTable,
};
use ndarray::{Array2, Array3};
use serde::Deserialize;

use crate::{Error, Result};

/// Supplier of the raw telemetry of one orbit, segment and channel.
pub trait RecordSource: Send + Sync {
    /// Loads every file of the orbit in time order. An orbit without files
    /// yields an empty record.
    ///
    /// # Errors
    /// Returns an error if a file exists but cannot be read.
    fn load(&self, orbit: Orbit, segment: Segment, channel: Channel) -> Result<RawRecord>;
}

/// Reads per-file telemetry exported as JSON.
#[derive(Debug, Clone)]
pub struct JsonRecordSource {
    root: PathBuf,
}

impl JsonRecordSource {
    /// Source reading exports below `root`.
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Root of the exports.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Paths of the files of one orbit, segment and channel, sorted by name.
    ///
    /// # Errors
    /// Returns an error if the block directory cannot be listed.
    pub fn discover(&self, orbit: Orbit, segment: Segment, channel: Channel) -> Result<Vec<PathBuf>> {
        let directory = self.root.join(orbit.block());
        if !directory.is_dir() {
            log::debug!("no record directory {}", directory.display());
            return Ok(Vec::new());
        }
        let matcher = file_pattern(orbit, segment, channel)?;
        let mut paths = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let path = entry?.path();
            let matches = path
                .file_name()
                .is_some_and(|name| matcher.is_match(Path::new(name)));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

impl RecordSource for JsonRecordSource {
    fn load(&self, orbit: Orbit, segment: Segment, channel: Channel) -> Result<RawRecord> {
        let files = self
            .discover(orbit, segment, channel)?
            .iter()
            .map(|path| read_file(path))
            .collect::<Result<Vec<_>>>()?;
        log::debug!(
            "{} {} {}: {} files",
            orbit.code(),
            segment.name(),
            channel.name(),
            files.len()
        );
        Ok(RawRecord::new(files))
    }
}

fn file_pattern(orbit: Orbit, segment: Segment, channel: Channel) -> Result<GlobMatcher> {
    let pattern = format!(
        "*{}*{}*{}*.json",
        segment.name(),
        orbit.code(),
        channel.name()
    );
    Ok(Glob::new(&pattern)?.compile_matcher())
}

/// Reads one exported data file.
///
/// # Errors
/// Returns an error if the file is unreadable, not valid JSON or has
/// ragged arrays.
pub fn read_file(path: &Path) -> Result<RawFile> {
    let text = fs::read_to_string(path)?;
    let json: JsonFile = serde_json::from_str(&text)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    json.into_raw_file(name)
}

#[derive(Deserialize)]
struct JsonFile {
    integration: JsonIntegration,
    observation: JsonObservation,
    #[serde(default)]
    binning: JsonBinning,
    #[serde(default)]
    spacecraft_geometry: JsonSpacecraftGeometry,
    #[serde(default)]
    pixel_geometry: JsonPixelGeometry,
    #[serde(default)]
    detector: JsonDetector,
}

#[derive(Deserialize)]
struct JsonIntegration {
    ephemeris_time: Vec<f64>,
    mirror_angle: Vec<f64>,
    #[serde(default)]
    mirror_data_number: Vec<f64>,
    #[serde(default)]
    detector_temperature: Vec<f64>,
    #[serde(default)]
    case_temperature: Vec<f64>,
}

#[derive(Deserialize)]
struct JsonObservation {
    integration_time: f64,
    mcp_voltage: f64,
    mcp_voltage_gain: f64,
}

#[derive(Deserialize, Default)]
struct JsonBinning {
    spatial_pixel_low: Vec<i64>,
    spatial_pixel_high: Vec<i64>,
    spectral_pixel_low: Vec<i64>,
    spectral_pixel_high: Vec<i64>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonSpacecraftGeometry {
    subsolar_latitude: Vec<f64>,
    subsolar_longitude: Vec<f64>,
    subspacecraft_latitude: Vec<f64>,
    subspacecraft_longitude: Vec<f64>,
    subspacecraft_altitude: Vec<f64>,
    instrument_sun_angle: Vec<f64>,
    spacecraft_velocity_inertial: Vec<[f64; 3]>,
    instrument_x_inertial: Vec<[f64; 3]>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonPixelGeometry {
    latitude: Vec<Vec<[f64; 5]>>,
    longitude: Vec<Vec<[f64; 5]>>,
    tangent_altitude: Vec<Vec<[f64; 5]>>,
    tangent_altitude_rate: Vec<Vec<[f64; 5]>>,
    line_of_sight: Vec<Vec<[f64; 5]>>,
    right_ascension: Vec<Vec<[f64; 5]>>,
    declination: Vec<Vec<[f64; 5]>>,
    solar_zenith_angle: Vec<Vec<f64>>,
    emission_angle: Vec<Vec<f64>>,
    phase_angle: Vec<Vec<f64>>,
    zenith_angle: Vec<Vec<f64>>,
    local_time: Vec<Vec<f64>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonDetector {
    raw: Vec<Vec<Vec<f64>>>,
    dark_subtracted: Vec<Vec<Vec<f64>>>,
}

impl JsonFile {
    fn into_raw_file(self, name: String) -> Result<RawFile> {
        let n = self.integration.ephemeris_time.len();
        if self.integration.mirror_angle.len() != n {
            return Err(Error::InvalidFormat(format!(
                "{name}: {} mirror angles for {n} integrations",
                self.integration.mirror_angle.len()
            )));
        }
        let integration = IntegrationTable {
            field_of_view: IntegrationTable::field_of_view_from_mirror(
                &self.integration.mirror_angle,
            ),
            ephemeris_time: self.integration.ephemeris_time,
            mirror_data_number: self.integration.mirror_data_number,
            detector_temperature: self.integration.detector_temperature,
            case_temperature: self.integration.case_temperature,
        };
        let observation = ObservationTable {
            integration_time: self.observation.integration_time,
            mcp_voltage: self.observation.mcp_voltage,
            mcp_voltage_gain: self.observation.mcp_voltage_gain,
        };
        let binning = BinningTable {
            spatial_pixel_low: self.binning.spatial_pixel_low,
            spatial_pixel_high: self.binning.spatial_pixel_high,
            spectral_pixel_low: self.binning.spectral_pixel_low,
            spectral_pixel_high: self.binning.spectral_pixel_high,
        };
        let g = self.spacecraft_geometry;
        let spacecraft_geometry = SpacecraftGeometryTable {
            subsolar_latitude: g.subsolar_latitude,
            subsolar_longitude: g.subsolar_longitude,
            subspacecraft_latitude: g.subspacecraft_latitude,
            subspacecraft_longitude: g.subspacecraft_longitude,
            subspacecraft_altitude: g.subspacecraft_altitude,
            instrument_sun_angle: g.instrument_sun_angle,
            spacecraft_velocity_inertial: vectors(&g.spacecraft_velocity_inertial),
            instrument_x_inertial: vectors(&g.instrument_x_inertial),
        };
        let p = self.pixel_geometry;
        let pixel_geometry = PixelGeometryTable {
            latitude: corners(&name, "latitude", p.latitude)?,
            longitude: corners(&name, "longitude", p.longitude)?,
            tangent_altitude: corners(&name, "tangent_altitude", p.tangent_altitude)?,
            tangent_altitude_rate: corners(&name, "tangent_altitude_rate", p.tangent_altitude_rate)?,
            line_of_sight: corners(&name, "line_of_sight", p.line_of_sight)?,
            right_ascension: corners(&name, "right_ascension", p.right_ascension)?,
            declination: corners(&name, "declination", p.declination)?,
            solar_zenith_angle: centers(&name, "solar_zenith_angle", p.solar_zenith_angle)?,
            emission_angle: centers(&name, "emission_angle", p.emission_angle)?,
            phase_angle: centers(&name, "phase_angle", p.phase_angle)?,
            zenith_angle: centers(&name, "zenith_angle", p.zenith_angle)?,
            local_time: centers(&name, "local_time", p.local_time)?,
        };
        let detector = DetectorImages {
            raw: cube(&name, "raw", self.detector.raw)?,
            dark_subtracted: cube(&name, "dark_subtracted", self.detector.dark_subtracted)?,
        };
        Ok(RawFile {
            name,
            integration,
            observation,
            binning,
            spacecraft_geometry,
            pixel_geometry,
            detector,
        })
    }
}

fn vectors(rows: &[[f64; 3]]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), 3), |(i, j)| rows[i][j])
}

fn ragged(file: &str, field: &str) -> Error {
    Error::InvalidFormat(format!("{file}: '{field}' is ragged"))
}

fn corners(file: &str, field: &str, rows: Vec<Vec<[f64; 5]>>) -> Result<Array3<f64>> {
    let bins = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != bins) {
        return Err(ragged(file, field));
    }
    let flat: Vec<f64> = rows.into_iter().flatten().flatten().collect();
    Array3::from_shape_vec((flat.len() / (5 * bins.max(1)), bins, 5), flat)
        .map_err(|_| ragged(file, field))
}

fn centers(file: &str, field: &str, rows: Vec<Vec<f64>>) -> Result<Array2<f64>> {
    let bins = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != bins) {
        return Err(ragged(file, field));
    }
    let n = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((if bins == 0 { 0 } else { n }, bins), flat)
        .map_err(|_| ragged(file, field))
}

fn cube(file: &str, field: &str, images: Vec<Vec<Vec<f64>>>) -> Result<Array3<f64>> {
    let spatial = images.first().map_or(0, Vec::len);
    let spectral = images
        .first()
        .and_then(|image| image.first())
        .map_or(0, Vec::len);
    if images
        .iter()
        .any(|image| image.len() != spatial || image.iter().any(|row| row.len() != spectral))
    {
        return Err(ragged(file, field));
    }
    let n = if spatial * spectral == 0 { 0 } else { images.len() };
    let flat: Vec<f64> = images.into_iter().flatten().flatten().collect();
    Array3::from_shape_vec((n, spatial, spectral), flat).map_err(|_| ragged(file, field))
}
