//! Product container abstraction.
//!
//! A product is a tree of groups holding typed arrays. Each dataset carries
//! a `version`, a `unit` and a `comment` attribute. [`ProductStore`] is
//! implemented by the HDF5 backend in `iuvs-io` and by [`MemoryStore`],
//! which keeps everything in maps and is used by tests.

use std::collections::{BTreeMap, BTreeSet};

use ndarray::{Array, ArrayD, Axis, Dimension, IxDyn};

use crate::error::{Error, Result};

/// Attribute holding the pipeline version of a dataset.
pub const VERSION_ATTR: &str = "version";
/// Attribute holding the unit of a dataset.
pub const UNIT_ATTR: &str = "unit";
/// Attribute holding the provenance comment of a dataset.
pub const COMMENT_ATTR: &str = "comment";

/// A typed array as stored in a product.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductArray {
    /// 64-bit floats.
    Float(ArrayD<f64>),
    /// 64-bit signed integers.
    Int(ArrayD<i64>),
    /// Booleans.
    Bool(ArrayD<bool>),
}

impl ProductArray {
    /// An empty float array of the given rank.
    pub fn empty_float(rank: usize) -> Self {
        Self::Float(ArrayD::zeros(IxDyn(&vec![0; rank.max(1)])))
    }

    /// An empty integer array of the given rank.
    pub fn empty_int(rank: usize) -> Self {
        Self::Int(ArrayD::zeros(IxDyn(&vec![0; rank.max(1)])))
    }

    /// An empty boolean array of the given rank.
    pub fn empty_bool(rank: usize) -> Self {
        Self::Bool(ArrayD::from_elem(IxDyn(&vec![0; rank.max(1)]), false))
    }

    /// Shape of the array.
    pub fn shape(&self) -> &[usize] {
        match self {
            Self::Float(a) => a.shape(),
            Self::Int(a) => a.shape(),
            Self::Bool(a) => a.shape(),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// True when the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the element type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Float(_) => "float",
            Self::Int(_) => "integer",
            Self::Bool(_) => "boolean",
        }
    }

    /// Mirrors the array along its spatial axis (axis 1).
    ///
    /// Arrays of rank below 2 are returned unchanged.
    #[must_use]
    pub fn flip_spatial(self) -> Self {
        fn flip<T: Clone>(mut a: ArrayD<T>) -> ArrayD<T> {
            if a.ndim() >= 2 {
                a.invert_axis(Axis(1));
                a = a.as_standard_layout().into_owned();
            }
            a
        }
        match self {
            Self::Float(a) => Self::Float(flip(a)),
            Self::Int(a) => Self::Int(flip(a)),
            Self::Bool(a) => Self::Bool(flip(a)),
        }
    }

    /// Converts into a float array. Integers are widened.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] for boolean data.
    #[allow(clippy::cast_precision_loss)]
    pub fn into_float(self, path: &str) -> Result<ArrayD<f64>> {
        match self {
            Self::Float(a) => Ok(a),
            Self::Int(a) => Ok(a.mapv(|v| v as f64)),
            Self::Bool(_) => Err(mismatch(path, "float", "boolean")),
        }
    }

    /// Converts into an integer array.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] unless the data are integers.
    pub fn into_int(self, path: &str) -> Result<ArrayD<i64>> {
        match self {
            Self::Int(a) => Ok(a),
            other => Err(mismatch(path, "integer", other.kind())),
        }
    }

    /// Converts into a boolean array.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] unless the data are booleans.
    pub fn into_bool(self, path: &str) -> Result<ArrayD<bool>> {
        match self {
            Self::Bool(a) => Ok(a),
            other => Err(mismatch(path, "boolean", other.kind())),
        }
    }
}

fn mismatch(path: &str, expected: &'static str, found: &'static str) -> Error {
    Error::TypeMismatch {
        path: path.to_string(),
        expected,
        found,
    }
}

impl<D: Dimension> From<Array<f64, D>> for ProductArray {
    fn from(a: Array<f64, D>) -> Self {
        Self::Float(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<i64, D>> for ProductArray {
    fn from(a: Array<i64, D>) -> Self {
        Self::Int(a.into_dyn())
    }
}

impl<D: Dimension> From<Array<bool, D>> for ProductArray {
    fn from(a: Array<bool, D>) -> Self {
        Self::Bool(a.into_dyn())
    }
}

/// Attributes written with every dataset.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DatasetAttributes {
    /// Registry version the data was derived under.
    pub version: u32,
    /// Physical unit.
    pub unit: String,
    /// Provenance comment.
    pub comment: String,
    /// Additional integer attributes, e.g. a bin `width`.
    pub extra: Vec<(String, i64)>,
}

impl DatasetAttributes {
    /// Attributes without extras.
    pub fn new(version: u32, unit: &str, comment: &str) -> Self {
        Self {
            version,
            unit: unit.to_string(),
            comment: comment.to_string(),
            extra: Vec::new(),
        }
    }

    /// Adds an integer attribute.
    #[must_use]
    pub fn with_extra(mut self, name: &str, value: i64) -> Self {
        self.extra.push((name.to_string(), value));
        self
    }
}

/// Splits `a/b/c` into (`a/b`, `c`).
///
/// # Errors
/// Returns [`Error::InvalidPath`] if the path has no group part or an
/// empty component.
pub fn split_path(path: &str) -> Result<(&str, &str)> {
    if path.split('/').any(str::is_empty) {
        return Err(Error::InvalidPath(path.to_string()));
    }
    path.rsplit_once('/')
        .ok_or_else(|| Error::InvalidPath(path.to_string()))
}

/// Hierarchical container holding one orbit's product.
pub trait ProductStore {
    /// Returns true if a group exists at `path`.
    fn group_exists(&self, path: &str) -> Result<bool>;

    /// Creates the group at `path` and any missing parents.
    fn require_group(&mut self, path: &str) -> Result<()>;

    /// Returns true if a dataset exists at `path`.
    fn dataset_exists(&self, path: &str) -> Result<bool>;

    /// Reads the dataset at `path`.
    fn read(&self, path: &str) -> Result<ProductArray>;

    /// Writes `data` as `name` inside `group`, replacing any existing
    /// dataset of that name. The group must already exist.
    fn write(
        &mut self,
        group: &str,
        name: &str,
        data: &ProductArray,
        attributes: &DatasetAttributes,
    ) -> Result<()>;

    /// Reads an integer attribute of a dataset.
    fn dataset_attribute(&self, path: &str, name: &str) -> Result<Option<i64>>;

    /// Reads a string attribute of a dataset.
    fn dataset_text_attribute(&self, path: &str, name: &str) -> Result<Option<String>>;

    /// Reads an integer attribute of the root group.
    fn root_attribute(&self, name: &str) -> Result<Option<i64>>;

    /// Writes an integer attribute of the root group.
    fn set_root_attribute(&mut self, name: &str, value: i64) -> Result<()>;

    /// Paths of every dataset, sorted.
    fn dataset_paths(&self) -> Result<Vec<String>>;

    /// Reads a float dataset.
    fn read_float(&self, path: &str) -> Result<ArrayD<f64>> {
        self.read(path)?.into_float(path)
    }

    /// Reads an integer dataset.
    fn read_int(&self, path: &str) -> Result<ArrayD<i64>> {
        self.read(path)?.into_int(path)
    }

    /// Reads a boolean dataset.
    fn read_bool(&self, path: &str) -> Result<ArrayD<bool>> {
        self.read(path)?.into_bool(path)
    }

    /// Stored `version` attribute of a dataset, if any.
    fn stored_version(&self, path: &str) -> Result<Option<i64>> {
        self.dataset_attribute(path, VERSION_ATTR)
    }
}

/// In-memory product store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    groups: BTreeSet<String>,
    datasets: BTreeMap<String, (ProductArray, DatasetAttributes)>,
    root: BTreeMap<String, i64>,
    writes: usize,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dataset writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Attributes of a stored dataset.
    pub fn attributes(&self, path: &str) -> Option<&DatasetAttributes> {
        self.datasets.get(path).map(|(_, attrs)| attrs)
    }

    /// Overwrites the stored version of a dataset.
    ///
    /// # Errors
    /// Returns [`Error::MissingDataset`] if nothing is stored at `path`.
    pub fn set_version(&mut self, path: &str, version: u32) -> Result<()> {
        let (_, attrs) = self
            .datasets
            .get_mut(path)
            .ok_or_else(|| Error::MissingDataset(path.to_string()))?;
        attrs.version = version;
        Ok(())
    }
}

impl ProductStore for MemoryStore {
    fn group_exists(&self, path: &str) -> Result<bool> {
        Ok(self.groups.contains(path))
    }

    fn require_group(&mut self, path: &str) -> Result<()> {
        if path.split('/').any(str::is_empty) {
            return Err(Error::InvalidPath(path.to_string()));
        }
        let mut prefix = String::new();
        for part in path.split('/') {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            self.groups.insert(prefix.clone());
        }
        Ok(())
    }

    fn dataset_exists(&self, path: &str) -> Result<bool> {
        Ok(self.datasets.contains_key(path))
    }

    fn read(&self, path: &str) -> Result<ProductArray> {
        self.datasets
            .get(path)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| Error::MissingDataset(path.to_string()))
    }

    fn write(
        &mut self,
        group: &str,
        name: &str,
        data: &ProductArray,
        attributes: &DatasetAttributes,
    ) -> Result<()> {
        if !self.groups.contains(group) {
            return Err(Error::MissingGroup(group.to_string()));
        }
        let path = format!("{group}/{name}");
        split_path(&path)?;
        self.datasets
            .insert(path, (data.clone(), attributes.clone()));
        self.writes += 1;
        Ok(())
    }

    fn dataset_attribute(&self, path: &str, name: &str) -> Result<Option<i64>> {
        let Some((_, attrs)) = self.datasets.get(path) else {
            return Err(Error::MissingDataset(path.to_string()));
        };
        if name == VERSION_ATTR {
            return Ok(Some(i64::from(attrs.version)));
        }
        Ok(attrs
            .extra
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value))
    }

    fn dataset_text_attribute(&self, path: &str, name: &str) -> Result<Option<String>> {
        let Some((_, attrs)) = self.datasets.get(path) else {
            return Err(Error::MissingDataset(path.to_string()));
        };
        Ok(match name {
            UNIT_ATTR => Some(attrs.unit.clone()),
            COMMENT_ATTR => Some(attrs.comment.clone()),
            _ => None,
        })
    }

    fn root_attribute(&self, name: &str) -> Result<Option<i64>> {
        Ok(self.root.get(name).copied())
    }

    fn set_root_attribute(&mut self, name: &str, value: i64) -> Result<()> {
        self.root.insert(name.to_string(), value);
        Ok(())
    }

    fn dataset_paths(&self) -> Result<Vec<String>> {
        Ok(self.datasets.keys().cloned().collect())
    }
}
