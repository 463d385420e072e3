//! Loading of the ancillary calibration file.

use std::path::Path;

use hdf5::File;
use iuvs_algorithms::CalibrationTables;
use ndarray::{Array1, Array2, Ix1, Ix2};

use crate::{Error, Result};

/// Dataset names inside the ancillary calibration file.
pub const FLATFIELD_DATASET: &str = "muv_flatfield";
/// Sensitivity curve, one value per detector column.
pub const SENSITIVITY_DATASET: &str = "muv_sensitivity_curve";
/// Voltages of the gain fit.
pub const VOLTAGE_DATASET: &str = "voltage";
/// Gain fit coefficients, one row per voltage.
pub const VOLTAGE_COEFFICIENTS_DATASET: &str = "voltage_fit_coefficients";

/// Reads the MUV calibration tables from an HDF5 file.
///
/// The sensitivity dataset holds wavelengths in row 0 and sensitivities in
/// row 1; only the latter is used.
///
/// # Errors
/// Returns an error if a dataset is missing or has the wrong shape.
pub fn load_calibration<P: AsRef<Path>>(path: P) -> Result<CalibrationTables> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let flatfield: Array2<f64> = read_2d(&file, FLATFIELD_DATASET)?;
    let sensitivity_table: Array2<f64> = read_2d(&file, SENSITIVITY_DATASET)?;
    if sensitivity_table.nrows() < 2 {
        return Err(Error::InvalidFormat(format!(
            "{SENSITIVITY_DATASET} has {} rows, expected 2",
            sensitivity_table.nrows()
        )));
    }
    let sensitivity = sensitivity_table.row(1).to_owned();
    let voltage: Array1<f64> = file
        .dataset(VOLTAGE_DATASET)?
        .read_dyn::<f64>()?
        .into_dimensionality::<Ix1>()
        .map_err(|e| Error::InvalidFormat(format!("{VOLTAGE_DATASET}: {e}")))?;
    let coefficients = read_2d(&file, VOLTAGE_COEFFICIENTS_DATASET)?;

    let tables = CalibrationTables::new(flatfield, sensitivity, voltage, coefficients.view())?;
    log::info!("loaded calibration tables from {}", path.display());
    Ok(tables)
}

fn read_2d(file: &File, name: &str) -> Result<Array2<f64>> {
    file.dataset(name)?
        .read_dyn::<f64>()?
        .into_dimensionality::<Ix2>()
        .map_err(|e| Error::InvalidFormat(format!("{name}: {e}")))
}
