//! HDF5 product files.
//!
//! [`Hdf5Product`] stores one orbit's product in an HDF5 file and
//! implements [`ProductStore`] on top of it. Files are opened read-write
//! when they exist and created otherwise; nothing is ever truncated.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use hdf5::types::{H5Type, TypeDescriptor, VarLenUnicode};
use hdf5::{Dataset, File, Group, Location};
use iuvs_core::store::{split_path, COMMENT_ATTR, UNIT_ATTR, VERSION_ATTR};
use iuvs_core::{DatasetAttributes, ProductArray, ProductStore};
use ndarray::{ArrayD, IxDyn};

use crate::{Error, Result};

/// One orbit's product file.
pub struct Hdf5Product {
    file: File,
    path: PathBuf,
    deflate_level: u8,
}

impl Hdf5Product {
    /// Opens `path` read-write, creating the file and its parent
    /// directories when missing.
    ///
    /// # Errors
    /// Returns an error if the directories or the file cannot be created
    /// or the existing file is not HDF5.
    pub fn open_or_create<P: AsRef<Path>>(path: P, deflate_level: u8) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = if path.exists() {
            File::open_rw(path)?
        } else {
            File::create(path)?
        };
        log::debug!("opened product {}", path.display());
        Ok(Self {
            file,
            path: path.to_path_buf(),
            deflate_level: deflate_level.min(9),
        })
    }

    /// Opens an existing product read-only.
    ///
    /// # Errors
    /// Returns an error if the file does not exist or is not HDF5.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            file: File::open(path)?,
            path: path.to_path_buf(),
            deflate_level: 0,
        })
    }

    /// Location of the file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes pending writes to disk.
    ///
    /// # Errors
    /// Returns an error if HDF5 fails to flush.
    pub fn flush(&self) -> Result<()> {
        Ok(self.file.flush()?)
    }

    /// Walks `path` from the root, returning `None` when a component is
    /// missing or is not a group.
    fn find_group(&self, path: &str) -> Option<Group> {
        let mut group: Group = (*self.file).clone();
        for part in path.split('/') {
            if part.is_empty() || !group.link_exists(part) {
                return None;
            }
            group = group.group(part).ok()?;
        }
        Some(group)
    }

    fn find_dataset(&self, path: &str) -> Result<Option<Dataset>> {
        let (parent, name) = split_path(path)?;
        Ok(self
            .find_group(parent)
            .filter(|group| group.link_exists(name))
            .and_then(|group| group.dataset(name).ok()))
    }

    fn open_dataset(&self, path: &str) -> Result<Dataset> {
        self.find_dataset(path)?
            .ok_or_else(|| iuvs_core::Error::MissingDataset(path.to_string()).into())
    }

    fn require_group_impl(&self, path: &str) -> Result<()> {
        if path.split('/').any(str::is_empty) {
            return Err(iuvs_core::Error::InvalidPath(path.to_string()).into());
        }
        let mut group: Group = (*self.file).clone();
        for part in path.split('/') {
            group = if group.link_exists(part) {
                group.group(part)?
            } else {
                group.create_group(part)?
            };
        }
        Ok(())
    }

    fn read_impl(&self, path: &str) -> Result<ProductArray> {
        let dataset = self.open_dataset(path)?;
        let descriptor = dataset.dtype()?.to_descriptor()?;
        let array = match descriptor {
            TypeDescriptor::Float(_) => ProductArray::Float(read_array(&dataset)?),
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => {
                ProductArray::Int(read_array(&dataset)?)
            }
            TypeDescriptor::Boolean => ProductArray::Bool(read_array(&dataset)?),
            other => {
                return Err(Error::InvalidFormat(format!(
                    "dataset '{path}' has unsupported element type {other:?}"
                )))
            }
        };
        Ok(array)
    }

    fn write_impl(
        &self,
        group: &str,
        name: &str,
        data: &ProductArray,
        attributes: &DatasetAttributes,
    ) -> Result<()> {
        let target = self
            .find_group(group)
            .ok_or_else(|| iuvs_core::Error::MissingGroup(group.to_string()))?;
        if target.link_exists(name) {
            target.unlink(name)?;
        }
        // Filters need chunking, which HDF5 refuses for zero sized extents.
        let compression = (!data.is_empty() && self.deflate_level > 0).then_some(self.deflate_level);
        let dataset = match data {
            ProductArray::Float(a) => write_array(&target, name, a, compression)?,
            ProductArray::Int(a) => write_array(&target, name, a, compression)?,
            ProductArray::Bool(a) => write_array(&target, name, a, compression)?,
        };
        set_attr_int(&dataset, VERSION_ATTR, i64::from(attributes.version))?;
        set_attr_str(&dataset, UNIT_ATTR, &attributes.unit)?;
        set_attr_str(&dataset, COMMENT_ATTR, &attributes.comment)?;
        for (key, value) in &attributes.extra {
            set_attr_int(&dataset, key, *value)?;
        }
        Ok(())
    }

    fn dataset_attribute_impl(&self, path: &str, name: &str) -> Result<Option<i64>> {
        match self.find_dataset(path)? {
            Some(dataset) => read_attr_opt(&dataset, name),
            None => Ok(None),
        }
    }

    fn dataset_text_attribute_impl(&self, path: &str, name: &str) -> Result<Option<String>> {
        match self.find_dataset(path)? {
            Some(dataset) => read_attr_opt_string(&dataset, name),
            None => Ok(None),
        }
    }

    fn set_root_attribute_impl(&self, name: &str, value: i64) -> Result<()> {
        if self.file.attr_names()?.iter().any(|n| n == name) {
            self.file.delete_attr(name)?;
        }
        set_attr_int(&self.file, name, value)
    }

    fn dataset_paths_impl(&self) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        collect_datasets(&self.file, &mut paths)?;
        paths.sort();
        Ok(paths)
    }
}

impl ProductStore for Hdf5Product {
    fn group_exists(&self, path: &str) -> iuvs_core::Result<bool> {
        Ok(self.find_group(path).is_some())
    }

    fn require_group(&mut self, path: &str) -> iuvs_core::Result<()> {
        Ok(self.require_group_impl(path)?)
    }

    fn dataset_exists(&self, path: &str) -> iuvs_core::Result<bool> {
        Ok(self.find_dataset(path)?.is_some())
    }

    fn read(&self, path: &str) -> iuvs_core::Result<ProductArray> {
        Ok(self.read_impl(path)?)
    }

    fn write(
        &mut self,
        group: &str,
        name: &str,
        data: &ProductArray,
        attributes: &DatasetAttributes,
    ) -> iuvs_core::Result<()> {
        Ok(self.write_impl(group, name, data, attributes)?)
    }

    fn dataset_attribute(&self, path: &str, name: &str) -> iuvs_core::Result<Option<i64>> {
        Ok(self.dataset_attribute_impl(path, name)?)
    }

    fn dataset_text_attribute(
        &self,
        path: &str,
        name: &str,
    ) -> iuvs_core::Result<Option<String>> {
        Ok(self.dataset_text_attribute_impl(path, name)?)
    }

    fn root_attribute(&self, name: &str) -> iuvs_core::Result<Option<i64>> {
        Ok(read_attr_opt(&self.file, name)?)
    }

    fn set_root_attribute(&mut self, name: &str, value: i64) -> iuvs_core::Result<()> {
        Ok(self.set_root_attribute_impl(name, value)?)
    }

    fn dataset_paths(&self) -> iuvs_core::Result<Vec<String>> {
        Ok(self.dataset_paths_impl()?)
    }
}

fn collect_datasets(group: &Group, paths: &mut Vec<String>) -> Result<()> {
    for dataset in group.datasets()? {
        paths.push(dataset.name().trim_start_matches('/').to_string());
    }
    for child in group.groups()? {
        collect_datasets(&child, paths)?;
    }
    Ok(())
}

fn create_fixed_dataset<T: H5Type>(
    group: &Group,
    name: &str,
    shape: &[usize],
    compression: Option<u8>,
) -> Result<Dataset> {
    let mut builder = group.new_dataset::<T>().shape(shape.to_vec());
    if let Some(level) = compression {
        builder = builder.deflate(level);
    }
    Ok(builder.create(name)?)
}

fn write_array<T: H5Type + Clone>(
    group: &Group,
    name: &str,
    array: &ArrayD<T>,
    compression: Option<u8>,
) -> Result<Dataset> {
    let dataset = create_fixed_dataset::<T>(group, name, array.shape(), compression)?;
    if !array.is_empty() {
        let standard = array.as_standard_layout();
        dataset.write(standard.view())?;
    }
    Ok(dataset)
}

fn read_array<T: H5Type + Clone + Default>(dataset: &Dataset) -> Result<ArrayD<T>> {
    if dataset.size() == 0 {
        return Ok(ArrayD::default(IxDyn(&dataset.shape())));
    }
    Ok(dataset.read_dyn::<T>()?)
}

fn set_attr_int(location: &Location, name: &str, value: i64) -> Result<()> {
    location
        .new_attr::<i64>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn set_attr_str(location: &Location, name: &str, value: &str) -> Result<()> {
    let value = to_var_len_unicode(value)?;
    location
        .new_attr::<VarLenUnicode>()
        .create(name)?
        .write_scalar(&value)?;
    Ok(())
}

fn read_attr_opt(location: &Location, name: &str) -> Result<Option<i64>> {
    if !location.attr_names()?.iter().any(|n| n == name) {
        return Ok(None);
    }
    Ok(Some(location.attr(name)?.read_scalar::<i64>()?))
}

fn read_attr_opt_string(location: &Location, name: &str) -> Result<Option<String>> {
    if !location.attr_names()?.iter().any(|n| n == name) {
        return Ok(None);
    }
    let value: VarLenUnicode = location.attr(name)?.read_scalar()?;
    Ok(Some(value.to_string()))
}

fn to_var_len_unicode(value: &str) -> Result<VarLenUnicode> {
    VarLenUnicode::from_str(value)
        .map_err(|e| Error::InvalidFormat(format!("invalid utf-8 attribute: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;

    fn attrs(version: u32) -> DatasetAttributes {
        DatasetAttributes::new(version, "kR", "Computed in a test.")
    }

    #[test]
    fn test_open_or_create_makes_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orbit03400").join("orbit03453.hdf5");
        let product = Hdf5Product::open_or_create(&path, 4).unwrap();
        assert!(path.exists());
        assert_eq!(product.path(), path.as_path());
    }

    #[test]
    fn test_require_group_and_existence() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 4).unwrap();
        assert!(!product.group_exists("apoapse/muv").unwrap());
        product.require_group("apoapse/muv/dayside/detector").unwrap();
        product.require_group("apoapse/muv/dayside/detector").unwrap();
        assert!(product.group_exists("apoapse").unwrap());
        assert!(product.group_exists("apoapse/muv/dayside/detector").unwrap());
        assert!(!product.dataset_exists("apoapse/muv/dayside/detector/raw").unwrap());
        assert!(product.require_group("apoapse//muv").is_err());
    }

    #[test]
    fn test_write_read_roundtrip_with_attributes() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 4).unwrap();
        product.require_group("apoapse/integration").unwrap();

        let data = ProductArray::from(array![[1.5, 2.5], [3.5, 4.5]]);
        product
            .write("apoapse/integration", "field_of_view", &data, &attrs(2))
            .unwrap();
        let swaths = ProductArray::from(array![0_i64, 0, 1]);
        product
            .write(
                "apoapse/integration",
                "swath_number",
                &swaths,
                &attrs(1).with_extra("last_validated_orbit", 18_000),
            )
            .unwrap();
        let flags = ProductArray::from(array![true, false]);
        product
            .write("apoapse/integration", "opportunity", &flags, &attrs(1))
            .unwrap();

        assert_eq!(product.read("apoapse/integration/field_of_view").unwrap(), data);
        assert_eq!(product.read("apoapse/integration/swath_number").unwrap(), swaths);
        assert_eq!(product.read("apoapse/integration/opportunity").unwrap(), flags);
        assert_eq!(
            product.stored_version("apoapse/integration/field_of_view").unwrap(),
            Some(2)
        );
        assert_eq!(
            product
                .dataset_text_attribute("apoapse/integration/field_of_view", UNIT_ATTR)
                .unwrap()
                .as_deref(),
            Some("kR")
        );
        assert_eq!(
            product
                .dataset_attribute("apoapse/integration/swath_number", "last_validated_orbit")
                .unwrap(),
            Some(18_000)
        );
        assert_eq!(
            product
                .dataset_attribute("apoapse/integration/field_of_view", "width")
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_write_replaces_with_new_shape() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 4).unwrap();
        product.require_group("apoapse/integration").unwrap();
        product
            .write(
                "apoapse/integration",
                "ephemeris_time",
                &ProductArray::from(array![1.0, 2.0]),
                &attrs(1),
            )
            .unwrap();
        let replacement = ProductArray::from(array![1.0, 2.0, 3.0]);
        product
            .write("apoapse/integration", "ephemeris_time", &replacement, &attrs(2))
            .unwrap();
        assert_eq!(
            product.read("apoapse/integration/ephemeris_time").unwrap(),
            replacement
        );
        assert_eq!(
            product.stored_version("apoapse/integration/ephemeris_time").unwrap(),
            Some(2)
        );
    }

    #[test]
    fn test_empty_arrays_keep_rank() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 4).unwrap();
        product.require_group("apoapse/muv/nightside/detector").unwrap();
        let empty = ProductArray::empty_float(3);
        product
            .write("apoapse/muv/nightside/detector", "raw", &empty, &attrs(1))
            .unwrap();
        let read = product.read("apoapse/muv/nightside/detector/raw").unwrap();
        assert_eq!(read.shape(), &[0, 0, 0]);
        assert!(read.is_empty());
    }

    #[test]
    fn test_write_requires_group() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 4).unwrap();
        let err = product
            .write("apoapse/apsis", "sol", &ProductArray::from(array![1.0]), &attrs(1))
            .unwrap_err();
        assert!(matches!(err, iuvs_core::Error::MissingGroup(_)));
    }

    #[test]
    fn test_root_attributes_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.hdf5");
        {
            let mut product = Hdf5Product::open_or_create(&path, 4).unwrap();
            assert_eq!(product.root_attribute("orbit").unwrap(), None);
            product.set_root_attribute("orbit", 3453).unwrap();
            product.set_root_attribute("orbit", 3454).unwrap();
            product.flush().unwrap();
        }
        let product = Hdf5Product::open(&path).unwrap();
        assert_eq!(product.root_attribute("orbit").unwrap(), Some(3454));
    }

    #[test]
    fn test_dataset_paths_sorted() {
        let dir = tempdir().unwrap();
        let mut product = Hdf5Product::open_or_create(dir.path().join("p.hdf5"), 0).unwrap();
        product.require_group("periapse/integration").unwrap();
        product.require_group("apoapse/apsis").unwrap();
        let one = ProductArray::from(array![1.0]);
        product.write("periapse/integration", "ephemeris_time", &one, &attrs(1)).unwrap();
        product.write("apoapse/apsis", "sol", &one, &attrs(1)).unwrap();
        assert_eq!(
            product.dataset_paths().unwrap(),
            vec![
                "apoapse/apsis/sol".to_string(),
                "periapse/integration/ephemeris_time".to_string()
            ]
        );
    }

    #[test]
    fn test_reopen_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("p.hdf5");
        {
            let mut product = Hdf5Product::open_or_create(&path, 4).unwrap();
            product.require_group("apoapse/apsis").unwrap();
            product
                .write("apoapse/apsis", "mars_year", &ProductArray::from(array![32_i64]), &attrs(1))
                .unwrap();
        }
        let product = Hdf5Product::open_or_create(&path, 4).unwrap();
        assert_eq!(
            product.read_int("apoapse/apsis/mars_year").unwrap().into_raw_vec_and_offset().0,
            vec![32]
        );
    }
}
