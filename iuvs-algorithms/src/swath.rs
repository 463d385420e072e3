//! Swath segmentation of a mirror scan.
//!
//! During nominal scanning the mirror steps by a small, constant angle and
//! jumps back once at every swath boundary. A jump is any step larger than
//! four times the median step, so the threshold follows the cadence of each
//! observation without a fixed value.
//!
//! Orbits where this goes wrong are corrected from a [`SwathCaveats`]
//! table instead of code.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use iuvs_core::{Error, InstrumentConstants, Orbit, Result};
use serde::Deserialize;

use crate::stats::{diff, interp, median};

const BUNDLED_CAVEATS: &str = include_str!("../resources/swath_caveats.csv");

/// Multiple of the median step that marks a swath boundary.
const DISCONTINUITY_FACTOR: f64 = 4.0;

/// Assigns a swath number to every integration.
///
/// `field_of_view` is the time ordered field of view (twice the mirror
/// angle) of each integration. Integrations before the first jump belong to
/// swath 0; each jump starts the next swath at the integration it lands on.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn compute_swath_number(field_of_view: &[f64]) -> Vec<i64> {
    let steps = diff(field_of_view);
    let threshold = median(&steps).map_or(f64::NAN, |m| DISCONTINUITY_FACTOR * m.abs());
    let discontinuities: Vec<f64> = steps
        .iter()
        .enumerate()
        .filter(|(_, step)| step.abs() > threshold)
        .map(|(i, _)| (i + 1) as f64)
        .collect();

    if discontinuities.is_empty() {
        return vec![0; field_of_view.len()];
    }

    let levels: Vec<f64> = (1..=discontinuities.len()).map(|n| n as f64).collect();
    (0..field_of_view.len())
        .map(|i| interp(i as f64, &discontinuities, &levels, Some(0.0)).floor() as i64)
        .collect()
}

/// Number of swaths: one more than the largest swath number, 0 if empty.
pub fn number_of_swaths(swath_number: &[i64]) -> i64 {
    swath_number.iter().max().map_or(0, |m| m + 1)
}

/// Flags every integration belonging to a swath in which the mirror swept
/// its full mechanical range.
///
/// A swath is an opportunity (relay) swath when both the minimum and the
/// maximum field of view appear exactly among its values. The result has
/// one flag per integration, shaped like `swath_number`.
#[allow(clippy::float_cmp)]
pub fn classify_opportunity(
    field_of_view: &[f64],
    swath_number: &[i64],
    constants: &InstrumentConstants,
) -> Vec<bool> {
    let minimum = constants.minimum_field_of_view();
    let maximum = constants.maximum_field_of_view();
    let mut bounds: BTreeMap<i64, (bool, bool)> = BTreeMap::new();
    for (&fov, &swath) in field_of_view.iter().zip(swath_number) {
        let seen = bounds.entry(swath).or_default();
        seen.0 |= fov == minimum;
        seen.1 |= fov == maximum;
    }
    swath_number
        .iter()
        .map(|swath| bounds.get(swath).is_some_and(|&(lo, hi)| lo && hi))
        .collect()
}

/// Manual correction for one orbit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwathCaveat {
    /// Added to every swath number.
    pub swath_offset: Option<i64>,
    /// Added to the computed number of swaths.
    pub n_swaths_offset: Option<i64>,
    /// Replaces the number of swaths outright.
    pub n_swaths_override: Option<i64>,
}

impl SwathCaveat {
    /// Applies the swath-number offset in place.
    pub fn apply_to_swaths(&self, swath_number: &mut [i64]) {
        if let Some(offset) = self.swath_offset {
            swath_number.iter_mut().for_each(|s| *s += offset);
        }
    }

    /// Corrected number of swaths given the computed value.
    pub fn apply_to_count(&self, n_swaths: i64) -> i64 {
        self.n_swaths_override
            .unwrap_or(n_swaths + self.n_swaths_offset.unwrap_or(0))
    }
}

/// CSV layout of one caveat row.
#[derive(Deserialize)]
struct CaveatRow {
    orbit: u32,
    #[serde(default)]
    swath_offset: Option<i64>,
    #[serde(default)]
    n_swaths_offset: Option<i64>,
    #[serde(default)]
    n_swaths_override: Option<i64>,
}

/// Orbit keyed table of manual swath corrections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwathCaveats {
    rows: BTreeMap<u32, SwathCaveat>,
}

impl SwathCaveats {
    /// Parses a CSV table with header
    /// `orbit,swath_offset,n_swaths_offset,n_swaths_override`.
    ///
    /// Lines starting with `#` are ignored and empty cells mean "no
    /// correction". The `n_swaths_offset` and `n_swaths_override` columns may
    /// be omitted.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] on malformed rows.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .comment(Some(b'#'))
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut rows = BTreeMap::new();
        for row in csv.deserialize::<CaveatRow>() {
            let row = row.map_err(|e| Error::ConfigError(format!("swath caveats: {e}")))?;
            let caveat = SwathCaveat {
                swath_offset: row.swath_offset,
                n_swaths_offset: row.n_swaths_offset,
                n_swaths_override: row.n_swaths_override,
            };
            rows.insert(row.orbit, caveat);
        }
        Ok(Self { rows })
    }

    /// Reads a caveat table from a CSV file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    /// The table shipped with the pipeline.
    ///
    /// # Errors
    /// Returns an error only if the bundled resource is malformed.
    pub fn bundled() -> Result<Self> {
        Self::from_reader(BUNDLED_CAVEATS.as_bytes())
    }

    /// Correction recorded for `orbit`.
    pub fn get(&self, orbit: Orbit) -> Option<&SwathCaveat> {
        self.rows.get(&orbit.number())
    }

    /// Correction to apply to `orbit`: only orbits up to the last validated
    /// orbit are corrected.
    pub fn applicable(&self, orbit: Orbit, last_validated_orbit: u32) -> Option<&SwathCaveat> {
        if orbit.number() > last_validated_orbit {
            return None;
        }
        self.get(orbit)
    }

    /// Number of orbits with a correction.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no orbit has a correction.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
