#![cfg(feature = "hdf5")]
#![allow(clippy::cast_precision_loss)]
use std::fs;
use std::path::Path;

use iuvs_algorithms::SwathCaveats;
use iuvs_core::{DatasetId, InstrumentConstants, Orbit, ProductStore, Staleness, VersionRegistry};
use iuvs_io::{process_orbit, Hdf5Product, JsonRecordSource, PipelineContext, DEFAULT_PLAN};
use serde_json::json;
use tempfile::tempdir;

const ORBIT: u32 = 3453;

fn write_file(block: &Path, name: &str, first_time: f64) {
    let n: u32 = 15;
    let mirror: Vec<f64> = (0..n).map(|i| 30.0 + 2.0 * f64::from(i)).collect();
    let times: Vec<f64> = (0..n).map(|i| first_time + f64::from(i)).collect();
    let images: Vec<Vec<Vec<f64>>> = (0..n)
        .map(|i| vec![vec![f64::from(i), 1.0], vec![2.0, 3.0]])
        .collect();
    let document = json!({
        "integration": {
            "ephemeris_time": times,
            "mirror_angle": mirror,
            "mirror_data_number": vec![1.0; 15],
            "detector_temperature": vec![-20.0; 15],
            "case_temperature": vec![5.0; 15]
        },
        "observation": {"integration_time": 4.2, "mcp_voltage": 600.0, "mcp_voltage_gain": 50.9},
        "binning": {
            "spatial_pixel_low": [103, 109],
            "spatial_pixel_high": [108, 114],
            "spectral_pixel_low": [172, 206],
            "spectral_pixel_high": [205, 239]
        },
        "spacecraft_geometry": {
            "spacecraft_velocity_inertial": vec![[1.0, 0.0, 0.0]; 15],
            "instrument_x_inertial": vec![[-1.0, 0.0, 0.0]; 15]
        },
        "detector": {"raw": images, "dark_subtracted": images}
    });
    fs::write(block.join(name), document.to_string()).unwrap();
}

fn records(root: &Path) {
    let block = root.join("orbit03400");
    fs::create_dir_all(&block).unwrap();
    write_file(&block, "mvn_iuv_l1b_apoapse-orbit03453-muv_20160708T000000.json", 0.0);
    write_file(&block, "mvn_iuv_l1b_apoapse-orbit03453-muv_20160708T001000.json", 100.0);
}

#[test]
fn test_process_orbit_is_idempotent() {
    let dir = tempdir().unwrap();
    let record_root = dir.path().join("l1b");
    let save_root = dir.path().join("products");
    records(&record_root);

    let constants = InstrumentConstants::default();
    let registry = VersionRegistry::bundled().unwrap();
    let caveats = SwathCaveats::default();
    let context = PipelineContext::new(&constants, &registry, &caveats).with_product_version(2);
    let source = JsonRecordSource::new(&record_root);
    let orbit = Orbit::new(ORBIT);

    let first = process_orbit(&save_root, &source, orbit, &DEFAULT_PLAN, &context).unwrap();
    assert_eq!(first.count(Staleness::Create), first.len());

    let path = save_root.join("orbit03400").join("orbit03453_v02.hdf5");
    assert!(path.exists());

    let second = process_orbit(&save_root, &source, orbit, &DEFAULT_PLAN, &context).unwrap();
    assert!(second.is_up_to_date());
    assert_eq!(second.len(), first.len());

    let product = Hdf5Product::open(&path).unwrap();
    assert_eq!(product.root_attribute("orbit").unwrap(), Some(i64::from(ORBIT)));
    assert_eq!(product.root_attribute("version").unwrap(), Some(2));
    assert_eq!(product.dataset_paths().unwrap().len(), first.len());

    let swaths = product.read_int("apoapse/integration/swath_number").unwrap();
    assert_eq!(swaths.len(), 30);
    assert_eq!(swaths[[14]], 0);
    assert_eq!(swaths[[15]], 1);
    assert_eq!(
        product
            .dataset_text_attribute("apoapse/integration/field_of_view", "unit")
            .unwrap()
            .as_deref(),
        Some("Degrees")
    );
    let raw = product
        .read_float("apoapse/muv/dayside/detector/raw")
        .unwrap();
    assert_eq!(raw.shape(), &[30, 2, 2]);
    let failsafe = product
        .read_float("apoapse/muv/failsafe/detector/raw")
        .unwrap();
    assert_eq!(failsafe.shape(), &[0, 0, 0]);
}

#[test]
fn test_registry_bump_updates_file_in_place() {
    let dir = tempdir().unwrap();
    let record_root = dir.path().join("l1b");
    let save_root = dir.path().join("products");
    records(&record_root);

    let constants = InstrumentConstants::default();
    let caveats = SwathCaveats::default();
    let source = JsonRecordSource::new(&record_root);
    let orbit = Orbit::new(ORBIT);

    let registry = VersionRegistry::bundled().unwrap();
    let context = PipelineContext::new(&constants, &registry, &caveats);
    process_orbit(&save_root, &source, orbit, &DEFAULT_PLAN, &context).unwrap();

    let bumped = registry.latest(DatasetId::Raw).unwrap() + 1;
    let registry = registry.with_version("raw", bumped);
    let context = PipelineContext::new(&constants, &registry, &caveats);
    let report = process_orbit(&save_root, &source, orbit, &DEFAULT_PLAN, &context).unwrap();
    // One raw dataset per experiment.
    assert_eq!(report.count(Staleness::Update), 3);
    assert_eq!(report.count(Staleness::Create), 0);

    let product = Hdf5Product::open(orbit.product_path(&save_root, None)).unwrap();
    assert_eq!(
        product
            .stored_version("apoapse/muv/nightside/detector/raw")
            .unwrap(),
        Some(i64::from(bumped))
    );
    assert_eq!(
        product
            .stored_version("apoapse/muv/nightside/detector/dark_subtracted")
            .unwrap(),
        Some(1)
    );
}
