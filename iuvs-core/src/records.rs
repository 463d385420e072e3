//! Raw instrument records.
//!
//! One [`RawFile`] holds the telemetry sub-tables of a single data file.
//! A [`RawRecord`] is the ordered list of files of one orbit, segment and
//! channel. Records are read-only inputs to the derivations and are never
//! stored themselves.

use ndarray::{concatenate, Array1, Array2, Array3, ArrayView, Axis, Dimension, RemoveAxis};

use crate::dataset::DatasetId;
use crate::error::Result;

/// Per-integration housekeeping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntegrationTable {
    /// Seconds after J2000.
    pub ephemeris_time: Vec<f64>,
    /// Field of view, twice the scan-mirror angle [degrees].
    pub field_of_view: Vec<f64>,
    /// Scan-mirror encoder reading.
    pub mirror_data_number: Vec<f64>,
    /// Degrees [C].
    pub detector_temperature: Vec<f64>,
    /// Degrees [C].
    pub case_temperature: Vec<f64>,
}

impl IntegrationTable {
    /// Field of view of each scan-mirror angle [degrees].
    pub fn field_of_view_from_mirror(mirror_angle: &[f64]) -> Vec<f64> {
        mirror_angle.iter().map(|a| 2.0 * a).collect()
    }

    /// Number of integrations.
    pub fn len(&self) -> usize {
        self.ephemeris_time.len()
    }

    /// True when the table holds no integrations.
    pub fn is_empty(&self) -> bool {
        self.ephemeris_time.is_empty()
    }
}

/// Per-file observation settings, shared by every integration of a file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ObservationTable {
    /// Seconds.
    pub integration_time: f64,
    /// MCP voltage [V].
    pub mcp_voltage: f64,
    /// MCP voltage gain.
    pub mcp_voltage_gain: f64,
}

/// Detector pixel ranges of every spatial and spectral bin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinningTable {
    /// First detector row of each spatial bin.
    pub spatial_pixel_low: Vec<i64>,
    /// Last detector row of each spatial bin.
    pub spatial_pixel_high: Vec<i64>,
    /// First detector column of each spectral bin.
    pub spectral_pixel_low: Vec<i64>,
    /// Last detector column of each spectral bin.
    pub spectral_pixel_high: Vec<i64>,
}

impl BinningTable {
    /// Spatial bin edges: every low pixel, then one past the last high pixel.
    pub fn spatial_edges(&self) -> Vec<i64> {
        edges(&self.spatial_pixel_low, &self.spatial_pixel_high)
    }

    /// Spectral bin edges: every low pixel, then one past the last high pixel.
    pub fn spectral_edges(&self) -> Vec<i64> {
        edges(&self.spectral_pixel_low, &self.spectral_pixel_high)
    }
}

fn edges(low: &[i64], high: &[i64]) -> Vec<i64> {
    let mut edges = low.to_vec();
    if let Some(last) = high.last() {
        edges.push(last + 1);
    }
    edges
}

/// Per-integration spacecraft geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct SpacecraftGeometryTable {
    /// Degrees [N].
    pub subsolar_latitude: Vec<f64>,
    /// Degrees [E].
    pub subsolar_longitude: Vec<f64>,
    /// Degrees [N].
    pub subspacecraft_latitude: Vec<f64>,
    /// Degrees [E].
    pub subspacecraft_longitude: Vec<f64>,
    /// km.
    pub subspacecraft_altitude: Vec<f64>,
    /// Degrees.
    pub instrument_sun_angle: Vec<f64>,
    /// Spacecraft velocity in the inertial frame, (integration, 3).
    pub spacecraft_velocity_inertial: Array2<f64>,
    /// Instrument x axis in the inertial frame, (integration, 3).
    pub instrument_x_inertial: Array2<f64>,
}

impl Default for SpacecraftGeometryTable {
    fn default() -> Self {
        Self {
            subsolar_latitude: Vec::new(),
            subsolar_longitude: Vec::new(),
            subspacecraft_latitude: Vec::new(),
            subspacecraft_longitude: Vec::new(),
            subspacecraft_altitude: Vec::new(),
            instrument_sun_angle: Vec::new(),
            spacecraft_velocity_inertial: Array2::zeros((0, 3)),
            instrument_x_inertial: Array2::zeros((0, 3)),
        }
    }
}

/// Per-bin geometry.
///
/// Corner arrays are (integration, spatial bin, 5): four corners then the
/// bin center. Center-only arrays are (integration, spatial bin).
#[derive(Debug, Clone, PartialEq)]
pub struct PixelGeometryTable {
    /// Degrees [N].
    pub latitude: Array3<f64>,
    /// Degrees [E].
    pub longitude: Array3<f64>,
    /// km.
    pub tangent_altitude: Array3<f64>,
    /// km/s.
    pub tangent_altitude_rate: Array3<f64>,
    /// km.
    pub line_of_sight: Array3<f64>,
    /// Degrees.
    pub right_ascension: Array3<f64>,
    /// Degrees.
    pub declination: Array3<f64>,
    /// Degrees.
    pub solar_zenith_angle: Array2<f64>,
    /// Degrees.
    pub emission_angle: Array2<f64>,
    /// Degrees.
    pub phase_angle: Array2<f64>,
    /// Degrees.
    pub zenith_angle: Array2<f64>,
    /// Hours.
    pub local_time: Array2<f64>,
}

impl Default for PixelGeometryTable {
    fn default() -> Self {
        let corners = || Array3::zeros((0, 0, 5));
        let centers = || Array2::zeros((0, 0));
        Self {
            latitude: corners(),
            longitude: corners(),
            tangent_altitude: corners(),
            tangent_altitude_rate: corners(),
            line_of_sight: corners(),
            right_ascension: corners(),
            declination: corners(),
            solar_zenith_angle: centers(),
            emission_angle: centers(),
            phase_angle: centers(),
            zenith_angle: centers(),
            local_time: centers(),
        }
    }
}

/// Bin geometry column backing a dataset.
pub enum PixelColumn<'a> {
    /// (integration, spatial bin, 5).
    Corners(&'a Array3<f64>),
    /// (integration, spatial bin).
    Centers(&'a Array2<f64>),
}

impl PixelGeometryTable {
    /// Column stored as the bin geometry dataset `id`, if `id` is one.
    pub fn column(&self, id: DatasetId) -> Option<PixelColumn<'_>> {
        use PixelColumn::{Centers, Corners};
        Some(match id {
            DatasetId::BinLatitude => Corners(&self.latitude),
            DatasetId::BinLongitude => Corners(&self.longitude),
            DatasetId::BinTangentAltitude => Corners(&self.tangent_altitude),
            DatasetId::BinTangentAltitudeRate => Corners(&self.tangent_altitude_rate),
            DatasetId::BinLineOfSight => Corners(&self.line_of_sight),
            DatasetId::BinRightAscension => Corners(&self.right_ascension),
            DatasetId::BinDeclination => Corners(&self.declination),
            DatasetId::BinSolarZenithAngle => Centers(&self.solar_zenith_angle),
            DatasetId::BinEmissionAngle => Centers(&self.emission_angle),
            DatasetId::BinPhaseAngle => Centers(&self.phase_angle),
            DatasetId::BinZenithAngle => Centers(&self.zenith_angle),
            DatasetId::BinLocalTime => Centers(&self.local_time),
            _ => return None,
        })
    }
}

/// Detector count cubes, (integration, spatial bin, spectral bin).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorImages {
    /// Raw counts.
    pub raw: Array3<f64>,
    /// Counts after dark subtraction.
    pub dark_subtracted: Array3<f64>,
}

impl Default for DetectorImages {
    fn default() -> Self {
        Self {
            raw: Array3::zeros((0, 0, 0)),
            dark_subtracted: Array3::zeros((0, 0, 0)),
        }
    }
}

/// Telemetry of one data file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFile {
    /// File name the telemetry was read from.
    pub name: String,
    /// Per-integration housekeeping.
    pub integration: IntegrationTable,
    /// Observation settings.
    pub observation: ObservationTable,
    /// Bin layout.
    pub binning: BinningTable,
    /// Spacecraft geometry.
    pub spacecraft_geometry: SpacecraftGeometryTable,
    /// Bin geometry.
    pub pixel_geometry: PixelGeometryTable,
    /// Detector images.
    pub detector: DetectorImages,
}

impl RawFile {
    /// Number of integrations in the file.
    pub fn n_integrations(&self) -> usize {
        self.integration.len()
    }
}

/// Ordered files of one orbit, segment and channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    files: Vec<RawFile>,
}

impl RawRecord {
    /// Wraps `files` in acquisition order.
    pub fn new(files: Vec<RawFile>) -> Self {
        Self { files }
    }

    /// Files in acquisition order.
    pub fn files(&self) -> &[RawFile] {
        &self.files
    }

    /// True when no file was found.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total number of integrations over every file.
    pub fn n_integrations(&self) -> usize {
        self.files.iter().map(RawFile::n_integrations).sum()
    }

    /// Files for which `keep` returns true, in order.
    #[must_use]
    pub fn filter(&self, keep: impl Fn(&RawFile) -> bool) -> Self {
        Self::new(self.files.iter().filter(|&f| keep(f)).cloned().collect())
    }

    /// Concatenates a per-integration column over every file.
    pub fn integration_column(&self, column: impl Fn(&IntegrationTable) -> &[f64]) -> Array1<f64> {
        self.files
            .iter()
            .flat_map(|f| column(&f.integration).iter().copied())
            .collect()
    }

    /// Repeats a per-file observation value once per integration of the file.
    pub fn observation_column(&self, value: impl Fn(&ObservationTable) -> f64) -> Array1<f64> {
        self.files
            .iter()
            .flat_map(|f| std::iter::repeat(value(&f.observation)).take(f.n_integrations()))
            .collect()
    }

    /// Index of the source file of every integration.
    pub fn data_file(&self) -> Array1<i64> {
        self.files
            .iter()
            .zip(0_i64..)
            .flat_map(|(f, index)| std::iter::repeat(index).take(f.n_integrations()))
            .collect()
    }

    /// Concatenates a per-integration spacecraft geometry column.
    pub fn spacecraft_column(
        &self,
        column: impl Fn(&SpacecraftGeometryTable) -> &[f64],
    ) -> Array1<f64> {
        self.files
            .iter()
            .flat_map(|f| column(&f.spacecraft_geometry).iter().copied())
            .collect()
    }

    /// Stacks per-file (integration, 3) vectors.
    ///
    /// # Errors
    /// Returns [`crate::Error::ShapeMismatch`] if files disagree on the
    /// vector length.
    pub fn spacecraft_vectors(
        &self,
        column: impl Fn(&SpacecraftGeometryTable) -> &Array2<f64>,
    ) -> Result<Array2<f64>> {
        stack(
            self.files.iter().map(|f| column(&f.spacecraft_geometry).view()),
            Array2::zeros((0, 3)),
        )
    }

    /// Stacks per-file detector cubes along the integration axis.
    ///
    /// # Errors
    /// Returns [`crate::Error::ShapeMismatch`] if files use different
    /// binning.
    pub fn detector(&self, cube: impl Fn(&DetectorImages) -> &Array3<f64>) -> Result<Array3<f64>> {
        stack(
            self.files.iter().map(|f| cube(&f.detector).view()),
            Array3::zeros((0, 0, 0)),
        )
    }

    /// Stacks one bin geometry column along the integration axis.
    ///
    /// Returns `None` if `id` is not a bin geometry dataset.
    ///
    /// # Errors
    /// Returns [`crate::Error::ShapeMismatch`] if files use different
    /// binning.
    pub fn pixel_column(&self, id: DatasetId) -> Result<Option<ndarray::ArrayD<f64>>> {
        let mut corners = Vec::new();
        let mut centers = Vec::new();
        for file in &self.files {
            match file.pixel_geometry.column(id) {
                Some(PixelColumn::Corners(a)) => corners.push(a.view()),
                Some(PixelColumn::Centers(a)) => centers.push(a.view()),
                None => return Ok(None),
            }
        }
        if !corners.is_empty() {
            return Ok(Some(stack(corners, Array3::zeros((0, 0, 5)))?.into_dyn()));
        }
        if !centers.is_empty() {
            return Ok(Some(stack(centers, Array2::zeros((0, 0)))?.into_dyn()));
        }
        // No files: rank still follows the column kind.
        let probe = PixelGeometryTable::default();
        Ok(match probe.column(id) {
            Some(PixelColumn::Corners(a)) => Some(a.clone().into_dyn()),
            Some(PixelColumn::Centers(a)) => Some(a.clone().into_dyn()),
            None => None,
        })
    }

    /// Binning of the first file. Every file of a record shares one scheme.
    pub fn binning(&self) -> Option<&BinningTable> {
        self.files.first().map(|f| &f.binning)
    }
}

fn stack<'a, D, I>(views: I, empty: ndarray::Array<f64, D>) -> Result<ndarray::Array<f64, D>>
where
    D: Dimension + RemoveAxis,
    I: IntoIterator<Item = ArrayView<'a, f64, D>>,
{
    // Files without integrations carry no bin shape and are left out.
    let views: Vec<_> = views
        .into_iter()
        .filter(|v| v.len_of(Axis(0)) > 0)
        .collect();
    if views.is_empty() {
        return Ok(empty);
    }
    Ok(concatenate(Axis(0), &views)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(n: usize, voltage: f64) -> RawFile {
        let mut f = RawFile::default();
        f.integration.ephemeris_time = (0..n).map(|i| i as f64).collect();
        f.observation = ObservationTable {
            integration_time: 4.0,
            mcp_voltage: voltage,
            mcp_voltage_gain: 2.0,
        };
        f.detector.raw = Array3::ones((n, 2, 3));
        f.detector.dark_subtracted = Array3::zeros((n, 2, 3));
        f.pixel_geometry.latitude = Array3::zeros((n, 2, 5));
        f.pixel_geometry.local_time = Array2::zeros((n, 2));
        f
    }

    #[test]
    fn test_field_of_view_is_twice_the_mirror_angle() {
        let fov = IntegrationTable::field_of_view_from_mirror(&[30.25, 59.5]);
        assert_eq!(fov, vec![60.5, 119.0]);
        assert!(IntegrationTable::field_of_view_from_mirror(&[]).is_empty());
    }

    #[test]
    fn test_observation_values_repeat_per_integration() {
        let record = RawRecord::new(vec![file(2, 600.0), file(3, 800.0)]);
        let voltage = record.observation_column(|o| o.mcp_voltage);
        assert_eq!(voltage.to_vec(), vec![600.0, 600.0, 800.0, 800.0, 800.0]);
        assert_eq!(record.data_file().to_vec(), vec![0, 0, 1, 1, 1]);
        assert_eq!(record.n_integrations(), 5);
    }

    #[test]
    fn test_detector_stacks_files() {
        let record = RawRecord::new(vec![file(2, 600.0), file(3, 600.0)]);
        assert_eq!(record.detector(|d| &d.raw).unwrap().shape(), &[5, 2, 3]);

        let mut odd = file(1, 600.0);
        odd.detector.raw = Array3::ones((1, 4, 3));
        let record = RawRecord::new(vec![file(2, 600.0), odd]);
        assert!(record.detector(|d| &d.raw).is_err());
    }

    #[test]
    fn test_empty_record_keeps_rank() {
        let record = RawRecord::default();
        assert_eq!(record.detector(|d| &d.raw).unwrap().ndim(), 3);
        let vectors = record
            .spacecraft_vectors(|g| &g.instrument_x_inertial)
            .unwrap();
        assert_eq!(vectors.shape(), &[0, 3]);
        let lat = record.pixel_column(DatasetId::BinLatitude).unwrap().unwrap();
        assert_eq!(lat.ndim(), 3);
        let lt = record.pixel_column(DatasetId::BinLocalTime).unwrap().unwrap();
        assert_eq!(lt.ndim(), 2);
        assert!(record.pixel_column(DatasetId::Raw).unwrap().is_none());
    }

    #[test]
    fn test_pixel_columns() {
        let record = RawRecord::new(vec![file(2, 600.0), file(1, 600.0)]);
        let lat = record.pixel_column(DatasetId::BinLatitude).unwrap().unwrap();
        assert_eq!(lat.shape(), &[3, 2, 5]);
        let lt = record.pixel_column(DatasetId::BinLocalTime).unwrap().unwrap();
        assert_eq!(lt.shape(), &[3, 2]);
    }

    #[test]
    fn test_bin_edges() {
        let binning = BinningTable {
            spatial_pixel_low: vec![103, 109, 115],
            spatial_pixel_high: vec![108, 114, 120],
            spectral_pixel_low: vec![],
            spectral_pixel_high: vec![],
        };
        assert_eq!(binning.spatial_edges(), vec![103, 109, 115, 121]);
        assert!(binning.spectral_edges().is_empty());
    }
}
