//! Tabulated ephemeris.
//!
//! SPICE is not linked into the pipeline. Instead the answers it gives at
//! each orbit's apsis times are exported once to a CSV table, one row per
//! orbit and segment:
//!
//! ```text
//! orbit,segment,ephemeris_time,subsolar_x,subsolar_y,subsolar_z,
//! subspacecraft_x,subspacecraft_y,subspacecraft_z,spacecraft_altitude,
//! sun_distance,solar_longitude
//! ```
//!
//! Subpoints are body-fixed rectangular coordinates in km, distances in km
//! and the solar longitude in degrees.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use iuvs_algorithms::geometry::latitude_longitude;
use iuvs_algorithms::{Body, Ephemeris};
use iuvs_core::{Orbit, Segment};
use serde::Deserialize;

use crate::{Error, Result};

/// Largest difference [s] between a query time and a tabulated time that
/// still counts as a match.
const TIME_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Deserialize)]
struct EphemerisRow {
    orbit: u32,
    segment: String,
    ephemeris_time: f64,
    subsolar_x: f64,
    subsolar_y: f64,
    subsolar_z: f64,
    subspacecraft_x: f64,
    subspacecraft_y: f64,
    subspacecraft_z: f64,
    spacecraft_altitude: f64,
    sun_distance: f64,
    solar_longitude: f64,
}

/// Ephemeris answers at one time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EphemerisSample {
    /// Seconds after J2000.
    pub ephemeris_time: f64,
    /// Body fixed position of the subsolar point [km].
    pub subsolar_point: [f64; 3],
    /// Body fixed position of the subspacecraft point [km].
    pub subspacecraft_point: [f64; 3],
    /// km.
    pub spacecraft_altitude: f64,
    /// Mars-Sun distance [km].
    pub sun_distance: f64,
    /// Degrees.
    pub solar_longitude: f64,
}

/// Ephemeris backed by a table of precomputed samples.
#[derive(Debug, Clone, Default)]
pub struct TabulatedEphemeris {
    /// Sorted by ephemeris time.
    samples: Vec<EphemerisSample>,
    apsis: BTreeMap<(u32, Segment), f64>,
}

fn parse_segment(name: &str) -> Result<Segment> {
    match name.trim() {
        "apoapse" => Ok(Segment::Apoapse),
        "periapse" => Ok(Segment::Periapse),
        other => Err(Error::InvalidFormat(format!("unknown segment '{other}'"))),
    }
}

impl TabulatedEphemeris {
    /// Parses the CSV table. Lines starting with `#` are comments.
    ///
    /// # Errors
    /// Returns an error on malformed rows or unknown segment names.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut table = Self::default();
        for row in reader.deserialize() {
            let row: EphemerisRow = row?;
            let segment = parse_segment(&row.segment)?;
            table.apsis.insert((row.orbit, segment), row.ephemeris_time);
            table.samples.push(EphemerisSample {
                ephemeris_time: row.ephemeris_time,
                subsolar_point: [row.subsolar_x, row.subsolar_y, row.subsolar_z],
                subspacecraft_point: [
                    row.subspacecraft_x,
                    row.subspacecraft_y,
                    row.subspacecraft_z,
                ],
                spacecraft_altitude: row.spacecraft_altitude,
                sun_distance: row.sun_distance,
                solar_longitude: row.solar_longitude,
            });
        }
        table
            .samples
            .sort_by(|a, b| a.ephemeris_time.total_cmp(&b.ephemeris_time));
        Ok(table)
    }

    /// Reads the table from a file.
    ///
    /// # Errors
    /// See [`TabulatedEphemeris::from_reader`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::from_reader(std::fs::File::open(path)?)?;
        log::info!(
            "loaded {} ephemeris samples from {}",
            table.samples.len(),
            path.display()
        );
        Ok(table)
    }

    /// Number of tabulated samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when the table holds no sample.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// The sample tabulated at `ephemeris_time`.
    ///
    /// # Errors
    /// Returns [`iuvs_core::Error::EphemerisError`] if no sample lies within
    /// the time tolerance.
    pub fn sample(&self, ephemeris_time: f64) -> iuvs_core::Result<&EphemerisSample> {
        let index = self
            .samples
            .partition_point(|s| s.ephemeris_time < ephemeris_time - TIME_TOLERANCE);
        self.samples
            .get(index)
            .filter(|s| (s.ephemeris_time - ephemeris_time).abs() <= TIME_TOLERANCE)
            .ok_or_else(|| {
                iuvs_core::Error::EphemerisError(format!(
                    "no tabulated sample at ephemeris time {ephemeris_time}"
                ))
            })
    }
}

/// Ephemeris that also knows when each orbit reaches its apsides.
pub trait ApsisEphemeris: Ephemeris {
    /// Ephemeris time of the apsis of `segment` in `orbit`, if known.
    fn apsis_ephemeris_time(&self, orbit: Orbit, segment: Segment) -> Option<f64>;
}

impl ApsisEphemeris for TabulatedEphemeris {
    fn apsis_ephemeris_time(&self, orbit: Orbit, segment: Segment) -> Option<f64> {
        self.apsis.get(&(orbit.number(), segment)).copied()
    }
}

impl Ephemeris for TabulatedEphemeris {
    fn subpoint(&self, target: Body, ephemeris_time: f64) -> iuvs_core::Result<[f64; 3]> {
        let sample = self.sample(ephemeris_time)?;
        Ok(match target {
            Body::Sun => sample.subsolar_point,
            Body::Maven => sample.subspacecraft_point,
        })
    }

    fn surface_distance(&self, observer: Body, ephemeris_time: f64) -> iuvs_core::Result<f64> {
        let sample = self.sample(ephemeris_time)?;
        Ok(match observer {
            Body::Sun => sample.sun_distance,
            Body::Maven => sample.spacecraft_altitude,
        })
    }

    fn local_time(&self, ephemeris_time: f64, longitude: f64) -> iuvs_core::Result<f64> {
        let sample = self.sample(ephemeris_time)?;
        let (_, subsolar_longitude) = latitude_longitude(sample.subsolar_point);
        let hour_angle = longitude.to_degrees() - subsolar_longitude;
        Ok((12.0 + hour_angle / 15.0).rem_euclid(24.0))
    }

    fn solar_longitude(&self, ephemeris_time: f64) -> iuvs_core::Result<f64> {
        Ok(self.sample(ephemeris_time)?.solar_longitude.to_radians())
    }
}
