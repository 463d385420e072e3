//! `<segment>/integration`: per-integration housekeeping and swaths.

use iuvs_algorithms::{classify_opportunity, compute_swath_number, number_of_swaths};
use iuvs_core::{DatasetId, GroupPath, Orbit, ProductStore, RawRecord, Result, Segment};
use ndarray::{arr1, Array1};

use super::engine::Deriver;
use super::PipelineContext;

/// Attribute of `swath_number` holding the validated orbit threshold it
/// was computed under.
pub const LAST_VALIDATED_ORBIT_ATTR: &str = "last_validated_orbit";

fn to_vec(values: ndarray::ArrayD<f64>) -> Vec<f64> {
    values.iter().copied().collect()
}

/// Returns true when `swath_number` was computed under an older validated
/// orbit threshold and its caveats may have changed.
fn needs_revalidation<S: ProductStore + ?Sized>(
    store: &S,
    path: &str,
    last_validated_orbit: u32,
) -> Result<bool> {
    if !store.dataset_exists(path)? {
        return Ok(false);
    }
    Ok(store
        .dataset_attribute(path, LAST_VALIDATED_ORBIT_ATTR)?
        .map_or(true, |stored| stored < i64::from(last_validated_orbit)))
}

pub(super) fn derive<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    record: &RawRecord,
    orbit: Orbit,
    segment: Segment,
    context: &PipelineContext<'_>,
) -> Result<()> {
    use DatasetId as D;
    let group = GroupPath::Integration(segment);

    deriver.derive(group, D::EphemerisTime, &[], |_| {
        Ok(record.integration_column(|t| t.ephemeris_time.as_slice()).into())
    })?;
    deriver.derive(group, D::FieldOfView, &[], |_| {
        Ok(record.integration_column(|t| t.field_of_view.as_slice()).into())
    })?;
    deriver.derive(group, D::MirrorDataNumber, &[], |_| {
        Ok(record.integration_column(|t| t.mirror_data_number.as_slice()).into())
    })?;
    deriver.derive(group, D::CaseTemperature, &[], |_| {
        Ok(record.integration_column(|t| t.case_temperature.as_slice()).into())
    })?;
    deriver.derive(group, D::IntegrationTime, &[], |_| {
        Ok(record.observation_column(|o| o.integration_time).into())
    })?;
    deriver.derive(group, D::DataFile, &[], |_| Ok(record.data_file().into()))?;

    let last_validated_orbit = context.registry.last_validated_orbit();
    let caveat = context.caveats.applicable(orbit, last_validated_orbit);
    let fov_path = group.dataset(D::FieldOfView);
    let swath_path = group.dataset(D::SwathNumber);

    let stale = needs_revalidation(deriver.store(), &swath_path, last_validated_orbit)?;
    deriver.derive_annotated(group, D::SwathNumber, &[fov_path.clone()], stale, |store| {
        let fov = to_vec(store.read_float(&fov_path)?);
        let mut swaths = compute_swath_number(&fov);
        if let Some(caveat) = caveat {
            log::debug!("{}: applying swath caveat {caveat:?}", orbit.code());
            caveat.apply_to_swaths(&mut swaths);
        }
        Ok((
            Array1::from(swaths).into(),
            vec![(
                LAST_VALIDATED_ORBIT_ATTR.to_string(),
                i64::from(last_validated_orbit),
            )],
        ))
    })?;

    deriver.derive(group, D::NumberOfSwaths, &[swath_path.clone()], |store| {
        let swaths = store.read_int(&swath_path)?;
        let swaths: Vec<i64> = swaths.iter().copied().collect();
        let count = number_of_swaths(&swaths);
        let count = match caveat {
            Some(caveat) if !swaths.is_empty() => caveat.apply_to_count(count),
            _ => count,
        };
        Ok(arr1(&[count]).into())
    })?;

    let constants = context.constants;
    deriver.derive(
        group,
        D::Opportunity,
        &[fov_path.clone(), swath_path.clone()],
        |store| {
            let fov = to_vec(store.read_float(&fov_path)?);
            let swaths: Vec<i64> = store.read_int(&swath_path)?.iter().copied().collect();
            Ok(Array1::from(classify_opportunity(&fov, &swaths, constants)).into())
        },
    )?;
    Ok(())
}
