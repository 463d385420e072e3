#![allow(clippy::cast_precision_loss)]
use iuvs_algorithms::{
    classify_opportunity, compute_swath_number, number_of_swaths, SwathCaveats,
};
use iuvs_core::{InstrumentConstants, Orbit};

/// Field of view of `sweeps` mirror sweeps from 30 to 58 degrees.
fn sweeps(sweeps: usize) -> Vec<f64> {
    (0..sweeps)
        .flat_map(|_| (0..15).map(|i| 2.0 * (30.0 + 2.0 * f64::from(i))))
        .collect()
}

#[test]
fn test_repeated_sweeps_are_numbered_in_order() {
    let fov = sweeps(3);
    let swaths = compute_swath_number(&fov);
    assert_eq!(swaths.len(), 45);
    assert!(swaths[..15].iter().all(|&s| s == 0));
    assert_eq!(swaths[15], 1);
    assert_eq!(swaths[30], 2);
    assert_eq!(number_of_swaths(&swaths), 3);
}

#[test]
fn test_single_sweep_is_one_swath() {
    let swaths = compute_swath_number(&sweeps(1));
    assert!(swaths.iter().all(|&s| s == 0));
    assert_eq!(number_of_swaths(&swaths), 1);
}

#[test]
fn test_full_range_sweep_is_an_opportunity() {
    let constants = InstrumentConstants::default();
    let minimum = constants.minimum_field_of_view();
    let maximum = constants.maximum_field_of_view();
    let step = (maximum - minimum) / 10.0;

    let mut fov: Vec<f64> = (0..10).map(|i| 80.0 + 2.0 * i as f64).collect();
    fov.extend((0..=10).map(|i| minimum + step * i as f64));
    fov[10] = minimum;
    fov[20] = maximum;

    let swaths = compute_swath_number(&fov);
    assert_eq!(number_of_swaths(&swaths), 2);
    let opportunity = classify_opportunity(&fov, &swaths, &constants);
    assert_eq!(opportunity.len(), swaths.len());
    assert!(opportunity[..10].iter().all(|&o| !o));
    assert!(opportunity[10..].iter().all(|&o| o));
}

#[test]
fn test_bundled_caveats_shift_known_orbits() {
    let caveats = SwathCaveats::bundled().unwrap();
    let orbit = Orbit::new(3009);
    let caveat = caveats.applicable(orbit, 18000).unwrap();

    let mut swaths = compute_swath_number(&sweeps(2));
    caveat.apply_to_swaths(&mut swaths);
    assert_eq!(swaths[0], 1);
    assert_eq!(caveat.apply_to_count(number_of_swaths(&swaths)), 3);

    assert!(caveats.applicable(orbit, 3000).is_none());
}
