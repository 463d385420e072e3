//! Detector binning helpers.

use iuvs_core::BinningTable;

use crate::stats::{diff, median};

/// Width of a bin in detector pixels: the median spacing of `edges`.
///
/// Returns 0 when fewer than two edges are given.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn bin_width(edges: &[i64]) -> i64 {
    let edges: Vec<f64> = edges.iter().map(|&e| e as f64).collect();
    median(&diff(&edges)).map_or(0, |m| m.trunc() as i64)
}

/// Spatial and spectral edges of a binning table, or empty edges when there
/// is no table.
pub fn bin_edges(binning: Option<&BinningTable>) -> (Vec<i64>, Vec<i64>) {
    binning.map_or_else(
        || (Vec::new(), Vec::new()),
        |b| (b.spatial_edges(), b.spectral_edges()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bin_width() {
        assert_eq!(bin_width(&[0, 6, 12, 18]), 6);
        assert_eq!(bin_width(&[5]), 0);
        assert_eq!(bin_width(&[]), 0);
    }

    #[test]
    fn test_bin_width_uses_median() {
        // A short last bin does not change the width.
        assert_eq!(bin_width(&[103, 109, 115, 121, 124]), 6);
    }

    #[test]
    fn test_bin_edges_without_table() {
        let (spatial, spectral) = bin_edges(None);
        assert!(spatial.is_empty());
        assert!(spectral.is_empty());
    }
}
