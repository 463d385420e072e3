//! `<segment>/spacecraft_geometry`.

use iuvs_algorithms::app_flip;
use iuvs_core::{
    DatasetId, GroupPath, InstrumentConstants, ProductArray, ProductStore, RawRecord, Result,
    Segment, SpacecraftGeometryTable,
};
use ndarray::{arr1, Ix2};

use super::engine::Deriver;

fn column(geometry: &SpacecraftGeometryTable, id: DatasetId) -> &[f64] {
    match id {
        DatasetId::SubsolarLatitude => &geometry.subsolar_latitude,
        DatasetId::SubsolarLongitude => &geometry.subsolar_longitude,
        DatasetId::SubspacecraftLatitude => &geometry.subspacecraft_latitude,
        DatasetId::SubspacecraftLongitude => &geometry.subspacecraft_longitude,
        DatasetId::SubspacecraftAltitude => &geometry.subspacecraft_altitude,
        _ => &geometry.instrument_sun_angle,
    }
}

pub(super) fn derive<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    record: &RawRecord,
    segment: Segment,
    constants: &InstrumentConstants,
) -> Result<()> {
    use DatasetId as D;
    let group = GroupPath::SpacecraftGeometry(segment);

    for id in [
        D::SubsolarLatitude,
        D::SubsolarLongitude,
        D::SubspacecraftLatitude,
        D::SubspacecraftLongitude,
        D::SubspacecraftAltitude,
        D::InstrumentSunAngle,
    ] {
        deriver.derive(group, id, &[], |_| {
            Ok(record.spacecraft_column(|g| column(g, id)).into())
        })?;
    }
    deriver.derive(group, D::SpacecraftVelocityInertialFrame, &[], |_| {
        Ok(record
            .spacecraft_vectors(|g| &g.spacecraft_velocity_inertial)?
            .into())
    })?;
    deriver.derive(group, D::InstrumentXFieldOfView, &[], |_| {
        Ok(record.spacecraft_vectors(|g| &g.instrument_x_inertial)?.into())
    })?;

    let x_path = group.dataset(D::InstrumentXFieldOfView);
    let v_path = group.dataset(D::SpacecraftVelocityInertialFrame);
    deriver.derive(group, D::AppFlip, &[x_path.clone(), v_path.clone()], |store| {
        let x = store.read_float(&x_path)?.into_dimensionality::<Ix2>();
        let v = store.read_float(&v_path)?.into_dimensionality::<Ix2>();
        let flip = match (x, v) {
            (Ok(x), Ok(v)) => app_flip(x.view(), v.view(), constants.app_flip_threshold),
            _ => None,
        };
        Ok(flip.map_or_else(|| ProductArray::empty_bool(1), |f| arr1(&[f]).into()))
    })?;
    Ok(())
}

/// Stored app flip of a segment. A missing or empty dataset counts as not
/// flipped.
pub(super) fn stored_app_flip<S: ProductStore + ?Sized>(store: &S, segment: Segment) -> Result<bool> {
    let path = GroupPath::SpacecraftGeometry(segment).dataset(DatasetId::AppFlip);
    if !store.dataset_exists(&path)? {
        return Ok(false);
    }
    Ok(store.read_bool(&path)?.iter().next().copied().unwrap_or(false))
}
