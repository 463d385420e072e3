//! Detector calibration: flatfield, sensitivity and MCP gain correction.
//!
//! All calibration inputs are fixed tables measured at one reference
//! binning. They are expanded to full detector resolution and then averaged
//! onto the binning of each observation, so any bin-edge partition works.

use std::f64::consts::PI;

use iuvs_core::{Error, InstrumentConstants, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3, Axis, Zip};

use crate::stats::interp;

/// Detector size in pixels along both axes.
pub const DETECTOR_PIXELS: usize = 1024;

/// Converts counts per steradian to kilorayleigh.
const KILORAYLEIGH_FACTOR: f64 = 4.0 * PI * 1e-9;

/// Binning the master flatfield was measured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceBinning {
    /// Detector pixels per spatial bin.
    pub spatial_pixels_per_bin: usize,
    /// Detector pixels per spectral bin.
    pub spectral_pixels_per_bin: usize,
    /// First detector pixel covered spatially.
    pub spatial_start: usize,
    /// One past the last detector pixel covered spatially.
    pub spatial_end: usize,
    /// First detector pixel covered spectrally.
    pub spectral_start: usize,
    /// One past the last detector pixel covered spectrally.
    pub spectral_end: usize,
}

impl ReferenceBinning {
    /// Binning of the 133x19 MUV master flatfield.
    pub const MUV: Self = Self {
        spatial_pixels_per_bin: 6,
        spectral_pixels_per_bin: 34,
        spatial_start: 103,
        spatial_end: 901,
        spectral_start: 172,
        spectral_end: 818,
    };

    /// Number of spatial bins.
    pub fn spatial_bins(&self) -> usize {
        (self.spatial_end - self.spatial_start) / self.spatial_pixels_per_bin
    }

    /// Number of spectral bins.
    pub fn spectral_bins(&self) -> usize {
        (self.spectral_end - self.spectral_start) / self.spectral_pixels_per_bin
    }

    /// Spatial bin edges of the reference binning.
    pub fn spatial_edges(&self) -> Vec<i64> {
        reference_edges(self.spatial_start, self.spatial_end, self.spatial_pixels_per_bin)
    }

    /// Spectral bin edges of the reference binning.
    pub fn spectral_edges(&self) -> Vec<i64> {
        reference_edges(self.spectral_start, self.spectral_end, self.spectral_pixels_per_bin)
    }
}

#[allow(clippy::cast_possible_wrap)]
fn reference_edges(start: usize, end: usize, step: usize) -> Vec<i64> {
    (start..=end).step_by(step).map(|e| e as i64).collect()
}

/// Inputs of [`CalibrationTables::make_brightness`].
#[derive(Debug, Clone)]
pub struct BrightnessInput<'a> {
    /// Dark subtracted counts, (integration, spatial bin, spectral bin).
    pub dark_subtracted: ArrayView3<'a, f64>,
    /// Spatial bin edges [detector pixel].
    pub spatial_bin_edges: &'a [i64],
    /// Spatial bin width [detector pixel].
    pub spatial_bin_width: i64,
    /// Spectral bin edges [detector pixel].
    pub spectral_bin_edges: &'a [i64],
    /// Spectral bin width [detector pixel].
    pub spectral_bin_width: i64,
    /// Per-integration exposure [s].
    pub integration_time: ArrayView1<'a, f64>,
    /// Per-integration MCP voltage [V].
    pub voltage: ArrayView1<'a, f64>,
    /// Per-integration MCP voltage gain.
    pub voltage_gain: ArrayView1<'a, f64>,
    /// Whether the detector arrays were stored mirrored.
    pub app_flip: bool,
}

/// Fixed calibration tables of the MUV channel.
#[derive(Debug, Clone)]
pub struct CalibrationTables {
    master_flatfield: Array2<f64>,
    full_flatfield: Array2<f64>,
    sensitivity: Array1<f64>,
    voltage: Vec<f64>,
    coefficient_a: Vec<f64>,
    coefficient_b: Vec<f64>,
}

impl CalibrationTables {
    /// Builds the tables.
    ///
    /// * `master_flatfield`: flatfield at [`ReferenceBinning::MUV`], 133x19.
    /// * `sensitivity_curve`: 512 samples of the spectral sensitivity.
    /// * `voltage`: increasing MCP voltages of the gain fit.
    /// * `voltage_coefficients`: (voltage, 2) fit coefficients `a`, `b`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if a table has the wrong shape.
    pub fn new(
        master_flatfield: Array2<f64>,
        sensitivity_curve: Array1<f64>,
        voltage: Array1<f64>,
        voltage_coefficients: ArrayView2<'_, f64>,
    ) -> Result<Self> {
        let reference = ReferenceBinning::MUV;
        let expected = (reference.spatial_bins(), reference.spectral_bins());
        if master_flatfield.dim() != expected {
            return Err(Error::ShapeMismatch(format!(
                "master flatfield is {:?}, expected {expected:?}",
                master_flatfield.dim()
            )));
        }
        if sensitivity_curve.len() * 2 != DETECTOR_PIXELS {
            return Err(Error::ShapeMismatch(format!(
                "sensitivity curve has {} samples, expected {}",
                sensitivity_curve.len(),
                DETECTOR_PIXELS / 2
            )));
        }
        if voltage_coefficients.dim() != (voltage.len(), 2) {
            return Err(Error::ShapeMismatch(format!(
                "voltage coefficients are {:?}, expected ({}, 2)",
                voltage_coefficients.dim(),
                voltage.len()
            )));
        }

        let full_flatfield = expand_flatfield(master_flatfield.view(), reference);
        let sensitivity = sensitivity_curve
            .iter()
            .flat_map(|&v| [v, v])
            .collect::<Array1<f64>>();
        Ok(Self {
            master_flatfield,
            full_flatfield,
            sensitivity,
            voltage: voltage.to_vec(),
            coefficient_a: voltage_coefficients.column(0).to_vec(),
            coefficient_b: voltage_coefficients.column(1).to_vec(),
        })
    }

    /// The flatfield as measured, at the reference binning.
    pub fn master_flatfield(&self) -> ArrayView2<'_, f64> {
        self.master_flatfield.view()
    }

    /// The flatfield at full detector resolution, 1024x1024.
    pub fn full_flatfield(&self) -> ArrayView2<'_, f64> {
        self.full_flatfield.view()
    }

    /// Averages the full resolution flatfield onto a binning scheme.
    ///
    /// Bins that cover no detector pixel are NaN.
    pub fn make_flatfield(
        &self,
        spatial_bin_edges: &[i64],
        spectral_bin_edges: &[i64],
    ) -> Array2<f64> {
        let spatial = bin_ranges(spatial_bin_edges);
        let spectral = bin_ranges(spectral_bin_edges);
        Array2::from_shape_fn((spatial.len(), spectral.len()), |(i, j)| {
            let (r0, r1) = spatial[i];
            let (c0, c1) = spectral[j];
            if r0 >= r1 || c0 >= c1 {
                return f64::NAN;
            }
            self.full_flatfield
                .slice(s![r0..r1, c0..c1])
                .mean()
                .unwrap_or(f64::NAN)
        })
    }

    /// Averages the sensitivity curve onto spectral bins.
    pub fn rebin_sensitivity(&self, spectral_bin_edges: &[i64]) -> Array1<f64> {
        bin_ranges(spectral_bin_edges)
            .into_iter()
            .map(|(lo, hi)| {
                if lo >= hi {
                    f64::NAN
                } else {
                    self.sensitivity.slice(s![lo..hi]).mean().unwrap_or(f64::NAN)
                }
            })
            .collect()
    }

    /// MCP gain nonlinearity correction factor for every sample.
    ///
    /// Counts are normalized per second and per detector pixel. The fit
    /// coefficients `a` and `b` are interpolated at each integration's
    /// voltage and the factor is `exp(a + b ln(n)) / n * gain / reference`.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if a per-integration input does not
    /// have one value per integration.
    #[allow(clippy::cast_precision_loss, clippy::too_many_arguments)]
    pub fn make_gain_correction(
        &self,
        dark_subtracted: ArrayView3<'_, f64>,
        spatial_bin_width: i64,
        spectral_bin_width: i64,
        integration_time: ArrayView1<'_, f64>,
        voltage: ArrayView1<'_, f64>,
        voltage_gain: ArrayView1<'_, f64>,
        constants: &InstrumentConstants,
    ) -> Result<Array3<f64>> {
        let n = dark_subtracted.len_of(Axis(0));
        check_len("integration_time", integration_time.len(), n)?;
        check_len("voltage", voltage.len(), n)?;
        check_len("voltage_gain", voltage_gain.len(), n)?;

        let spatial_width = spatial_bin_width as f64;
        let spectral_width = spectral_bin_width as f64;
        let mut correction = Array3::zeros(dark_subtracted.raw_dim());
        for (i, (mut out, counts)) in correction
            .outer_iter_mut()
            .zip(dark_subtracted.outer_iter())
            .enumerate()
        {
            let a = interp(voltage[i], &self.voltage, &self.coefficient_a, None);
            let b = interp(voltage[i], &self.voltage, &self.coefficient_b, None);
            let scale = voltage_gain[i] / constants.reference_mcp_gain;
            let time = integration_time[i];
            Zip::from(&mut out).and(&counts).for_each(|o, &c| {
                let normalized = c / time / spatial_width / spectral_width;
                *o = (a + b * normalized.ln()).exp() / normalized * scale;
            });
        }
        Ok(correction)
    }

    /// Converts dark subtracted counts to brightness in kilorayleigh.
    ///
    /// Empty counts give an empty result whatever the other inputs are.
    /// NaN samples, which come from negative counts in the gain correction,
    /// are set to 0.
    ///
    /// # Errors
    /// Returns [`Error::ShapeMismatch`] if the inputs disagree on the
    /// number of integrations or bins.
    #[allow(clippy::cast_precision_loss)]
    pub fn make_brightness(
        &self,
        input: &BrightnessInput<'_>,
        constants: &InstrumentConstants,
    ) -> Result<Array3<f64>> {
        let counts = input.dark_subtracted;
        if counts.is_empty() {
            return Ok(Array3::zeros(counts.raw_dim()));
        }

        let mut flatfield = self.make_flatfield(input.spatial_bin_edges, input.spectral_bin_edges);
        if input.app_flip {
            flatfield.invert_axis(Axis(0));
        }
        let sensitivity = self.rebin_sensitivity(input.spectral_bin_edges);
        let (_, spatial_bins, spectral_bins) = counts.dim();
        if flatfield.dim() != (spatial_bins, spectral_bins) {
            return Err(Error::ShapeMismatch(format!(
                "binning gives {:?} bins but counts have {:?}",
                flatfield.dim(),
                (spatial_bins, spectral_bins)
            )));
        }

        let correction = self.make_gain_correction(
            counts,
            input.spatial_bin_width,
            input.spectral_bin_width,
            input.integration_time,
            input.voltage,
            input.voltage_gain,
            constants,
        )?;

        let conversion = KILORAYLEIGH_FACTOR
            / constants.pixel_angular_size
            / input.spatial_bin_width as f64;
        let mut brightness = Array3::zeros(counts.raw_dim());
        for (i, mut out) in brightness.outer_iter_mut().enumerate() {
            let per_integration = input.voltage_gain[i] * input.integration_time[i];
            Zip::indexed(&mut out)
                .and(&counts.index_axis(Axis(0), i))
                .and(&correction.index_axis(Axis(0), i))
                .for_each(|(j, k), o, &c, &corr| {
                    let partial = c / sensitivity[k] * conversion / per_integration;
                    let value = partial / flatfield[[j, k]] * corr;
                    *o = if value.is_nan() { 0.0 } else { value };
                });
        }
        Ok(brightness)
    }
}

/// Expands a reference-binned flatfield to full detector resolution.
///
/// Every reference bin is repeated over its detector pixels and the edge
/// bins are extended to the detector border.
fn expand_flatfield(master: ArrayView2<'_, f64>, reference: ReferenceBinning) -> Array2<f64> {
    let row = |pixel: usize| {
        (pixel.clamp(reference.spatial_start, reference.spatial_end - 1) - reference.spatial_start)
            / reference.spatial_pixels_per_bin
    };
    let col = |pixel: usize| {
        (pixel.clamp(reference.spectral_start, reference.spectral_end - 1)
            - reference.spectral_start)
            / reference.spectral_pixels_per_bin
    };
    Array2::from_shape_fn((DETECTOR_PIXELS, DETECTOR_PIXELS), |(i, j)| {
        master[[row(i), col(j)]]
    })
}

/// Detector pixel range `[lo, hi)` of every bin, clipped to the detector.
#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn bin_ranges(edges: &[i64]) -> Vec<(usize, usize)> {
    let clip = |e: i64| e.clamp(0, DETECTOR_PIXELS as i64) as usize;
    edges.windows(2).map(|w| (clip(w[0]), clip(w[1]))).collect()
}

fn check_len(name: &str, len: usize, expected: usize) -> Result<()> {
    if len == expected {
        Ok(())
    } else {
        Err(Error::ShapeMismatch(format!(
            "{name} has {len} values for {expected} integrations"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array};

    fn tables() -> CalibrationTables {
        let master = Array2::from_shape_fn((133, 19), |(i, j)| 0.9 + 0.001 * (i + j) as f64);
        let sensitivity = Array::linspace(1.0, 2.0, 512);
        let voltage = array![500.0, 700.0, 900.0];
        let coefficients = array![[0.0, 1.0], [0.0, 1.0], [0.0, 1.0]];
        CalibrationTables::new(master, sensitivity, voltage, coefficients.view()).unwrap()
    }

    #[test]
    fn test_reference_binning() {
        let reference = ReferenceBinning::MUV;
        assert_eq!(reference.spatial_bins(), 133);
        assert_eq!(reference.spectral_bins(), 19);
        assert_eq!(reference.spatial_edges().len(), 134);
        assert_eq!(reference.spectral_edges().last(), Some(&818));
    }

    #[test]
    fn test_flatfield_rebin_reproduces_master() {
        let tables = tables();
        let reference = ReferenceBinning::MUV;
        let rebinned =
            tables.make_flatfield(&reference.spatial_edges(), &reference.spectral_edges());
        assert_eq!(rebinned.dim(), (133, 19));
        for (a, b) in rebinned.iter().zip(tables.master_flatfield().iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_full_flatfield_edges_are_padded() {
        let tables = tables();
        let full = tables.full_flatfield();
        let master = tables.master_flatfield();
        assert_eq!(full.dim(), (1024, 1024));
        assert_relative_eq!(full[[0, 0]], master[[0, 0]]);
        assert_relative_eq!(full[[1023, 1023]], master[[132, 18]]);
        assert_relative_eq!(full[[108, 205]], master[[0, 0]]);
        assert_relative_eq!(full[[109, 206]], master[[1, 1]]);
    }

    #[test]
    fn test_flatfield_any_binning() {
        let tables = tables();
        let rebinned = tables.make_flatfield(&[0, 512, 1024], &[0, 1024]);
        assert_eq!(rebinned.dim(), (2, 1));
        assert!(rebinned.iter().all(|v| v.is_finite()));
        let degenerate = tables.make_flatfield(&[10, 10], &[0, 5]);
        assert!(degenerate[[0, 0]].is_nan());
    }

    #[test]
    fn test_rebin_sensitivity() {
        let tables = tables();
        let rebinned = tables.rebin_sensitivity(&[0, 2, 4]);
        assert_relative_eq!(rebinned[0], 1.0);
        assert_relative_eq!(rebinned[1], 1.0 + 1.0 / 511.0, epsilon = 1e-12);
    }

    #[test]
    fn test_unit_gain_fit_gives_gain_ratio() {
        // a = 0, b = 1 makes the fit the identity, leaving gain / reference.
        let tables = tables();
        let constants = InstrumentConstants::default();
        let counts = Array3::from_elem((2, 2, 2), 100.0);
        let time = array![1.0, 2.0];
        let voltage = array![600.0, 800.0];
        let gain = array![50.909_455, 101.818_91];
        let correction = tables
            .make_gain_correction(
                counts.view(),
                6,
                34,
                time.view(),
                voltage.view(),
                gain.view(),
                &constants,
            )
            .unwrap();
        assert_relative_eq!(correction[[0, 1, 1]], 1.0, epsilon = 1e-12);
        assert_relative_eq!(correction[[1, 0, 0]], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_brightness_on_empty_input() {
        let tables = tables();
        let constants = InstrumentConstants::default();
        let counts = Array3::<f64>::zeros((0, 0, 0));
        let time = array![1.0, 2.0, 3.0];
        let input = BrightnessInput {
            dark_subtracted: counts.view(),
            spatial_bin_edges: &[],
            spatial_bin_width: 0,
            spectral_bin_edges: &[0, 1, 2, 3, 4],
            spectral_bin_width: 1,
            integration_time: time.view(),
            voltage: time.view(),
            voltage_gain: time.view(),
            app_flip: true,
        };
        let brightness = tables.make_brightness(&input, &constants).unwrap();
        assert!(brightness.is_empty());
    }

    #[test]
    fn test_brightness_zeroes_negative_counts() {
        let tables = tables();
        let constants = InstrumentConstants::default();
        let mut counts = Array3::from_elem((1, 2, 2), 50.0);
        counts[[0, 0, 0]] = -5.0;
        let one = array![1.0];
        let gain = array![50.909_455];
        let input = BrightnessInput {
            dark_subtracted: counts.view(),
            spatial_bin_edges: &[400, 406, 412],
            spatial_bin_width: 6,
            spectral_bin_edges: &[400, 434, 468],
            spectral_bin_width: 34,
            integration_time: one.view(),
            voltage: one.view(),
            voltage_gain: gain.view(),
            app_flip: false,
        };
        let brightness = tables.make_brightness(&input, &constants).unwrap();
        assert_relative_eq!(brightness[[0, 0, 0]], 0.0);
        assert!(brightness[[0, 1, 1]] > 0.0);
        assert!(brightness.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_brightness_value() {
        // With a unit gain fit and reference gain the correction is 1.
        let tables = tables();
        let constants = InstrumentConstants::default();
        let counts = Array3::from_elem((1, 1, 1), 10.0);
        let time = array![2.0];
        let gain = array![50.909_455];
        let input = BrightnessInput {
            dark_subtracted: counts.view(),
            spatial_bin_edges: &[103, 109],
            spatial_bin_width: 6,
            spectral_bin_edges: &[0, 2],
            spectral_bin_width: 2,
            integration_time: time.view(),
            voltage: time.view(),
            voltage_gain: gain.view(),
            app_flip: false,
        };
        let brightness = tables.make_brightness(&input, &constants).unwrap();
        let flat = tables.master_flatfield()[[0, 0]];
        let expected =
            10.0 / 1.0 * 4.0 * PI * 1e-9 / constants.pixel_angular_size / 6.0 / 50.909_455 / 2.0
                / flat;
        assert_relative_eq!(brightness[[0, 0, 0]], expected, max_relative = 1e-12);
    }

    #[test]
    fn test_brightness_shape_mismatch() {
        let tables = tables();
        let constants = InstrumentConstants::default();
        let counts = Array3::from_elem((1, 3, 1), 10.0);
        let one = array![1.0];
        let input = BrightnessInput {
            dark_subtracted: counts.view(),
            spatial_bin_edges: &[0, 6],
            spatial_bin_width: 6,
            spectral_bin_edges: &[0, 2],
            spectral_bin_width: 2,
            integration_time: one.view(),
            voltage: one.view(),
            voltage_gain: one.view(),
            app_flip: false,
        };
        assert!(matches!(
            tables.make_brightness(&input, &constants),
            Err(Error::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_bad_tables() {
        let bad = CalibrationTables::new(
            Array2::zeros((10, 10)),
            Array1::zeros(512),
            array![1.0],
            array![[0.0, 1.0]].view(),
        );
        assert!(bad.is_err());
    }
}
