//! Orbit numbers and the codes used to name files and directories.

use std::fmt;
use std::path::{Path, PathBuf};

/// Number of orbits grouped into one directory block.
pub const ORBITS_PER_BLOCK: u32 = 100;

/// A MAVEN orbit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Orbit(u32);

impl Orbit {
    /// Creates an orbit from its number.
    pub fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the orbit number.
    #[inline]
    pub fn number(self) -> u32 {
        self.0
    }

    /// Returns the orbit code, e.g. `orbit03453`.
    pub fn code(self) -> String {
        format!("orbit{:05}", self.0)
    }

    /// Returns the code of the block holding this orbit, e.g. `orbit03400`.
    pub fn block(self) -> String {
        format!("orbit{:05}", self.0 / ORBITS_PER_BLOCK * ORBITS_PER_BLOCK)
    }

    /// Returns the product file path below `save_root`.
    ///
    /// `version` appends a two-digit pipeline generation suffix (`_v02`).
    pub fn product_path(self, save_root: &Path, version: Option<u32>) -> PathBuf {
        let stem = match version {
            Some(v) => format!("{}_v{v:02}", self.code()),
            None => self.code(),
        };
        save_root.join(self.block()).join(format!("{stem}.hdf5"))
    }
}

impl From<u32> for Orbit {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

impl fmt::Display for Orbit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_codes() {
        let orbit = Orbit::new(3453);
        assert_eq!(orbit.code(), "orbit03453");
        assert_eq!(orbit.block(), "orbit03400");

        let orbit = Orbit::new(99);
        assert_eq!(orbit.code(), "orbit00099");
        assert_eq!(orbit.block(), "orbit00000");
    }

    #[test]
    fn test_block_boundary() {
        assert_eq!(Orbit::new(3400).block(), "orbit03400");
        assert_eq!(Orbit::new(3499).block(), "orbit03400");
        assert_eq!(Orbit::new(12_345).code(), "orbit12345");
    }

    #[test]
    fn test_product_path() {
        let root = Path::new("/data/products");
        assert_eq!(
            Orbit::new(3453).product_path(root, None),
            PathBuf::from("/data/products/orbit03400/orbit03453.hdf5")
        );
        assert_eq!(
            Orbit::new(3453).product_path(root, Some(2)),
            PathBuf::from("/data/products/orbit03400/orbit03453_v02.hdf5")
        );
    }
}
