//! `<segment>/apsis`: quantities at the orbit's apsis.

use iuvs_algorithms::geometry::{haversine, subpoint};
use iuvs_algorithms::mars_calendar::{mars_year, sol};
use iuvs_algorithms::Body;
use iuvs_core::{DatasetId, GroupPath, Orbit, ProductArray, ProductStore, Result, Segment};
use ndarray::{arr1, ArrayD};

use super::engine::Deriver;
use crate::ephemeris::ApsisEphemeris;

/// One value computed from the apsis ephemeris time, or an empty array when
/// the orbit has no apsis entry.
fn at_apsis(
    ephemeris_time: &ArrayD<f64>,
    value: impl FnOnce(f64) -> Result<f64>,
) -> Result<ProductArray> {
    match ephemeris_time.iter().next() {
        Some(&et) => Ok(arr1(&[value(et)?]).into()),
        None => Ok(ProductArray::empty_float(1)),
    }
}

fn first(values: &ArrayD<f64>) -> f64 {
    values.iter().next().copied().unwrap_or(f64::NAN)
}

pub(super) fn derive<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    orbit: Orbit,
    segment: Segment,
    ephemeris: &dyn ApsisEphemeris,
) -> Result<()> {
    use DatasetId as D;
    let group = GroupPath::Apsis(segment);
    let et_path = group.dataset(D::ApsisEphemerisTime);
    let et = [et_path.clone()];

    deriver.derive(group, D::ApsisEphemerisTime, &[], |_| {
        Ok(match ephemeris.apsis_ephemeris_time(orbit, segment) {
            Some(time) => arr1(&[time]).into(),
            None => {
                log::warn!("{}: no {} apsis entry", orbit.code(), segment.name());
                ProductArray::empty_float(1)
            }
        })
    })?;

    deriver.derive(group, D::ApsisMarsYear, &et, |store| {
        let times = store.read_float(&et_path)?;
        Ok(match times.iter().next() {
            Some(&t) => arr1(&[mars_year(t)]).into(),
            None => ProductArray::empty_int(1),
        })
    })?;
    deriver.derive(group, D::ApsisSol, &et, |store| {
        at_apsis(&store.read_float(&et_path)?, |t| Ok(sol(t)))
    })?;
    deriver.derive(group, D::ApsisSolarLongitude, &et, |store| {
        at_apsis(&store.read_float(&et_path)?, |t| {
            Ok(ephemeris.solar_longitude(t)?.to_degrees())
        })
    })?;

    for (id, body, latitude) in [
        (D::ApsisSubsolarLatitude, Body::Sun, true),
        (D::ApsisSubsolarLongitude, Body::Sun, false),
        (D::ApsisSubspacecraftLatitude, Body::Maven, true),
        (D::ApsisSubspacecraftLongitude, Body::Maven, false),
    ] {
        deriver.derive(group, id, &et, |store| {
            at_apsis(&store.read_float(&et_path)?, |t| {
                let (lat, lon) = subpoint(ephemeris, body, t)?;
                Ok(if latitude { lat } else { lon })
            })
        })?;
    }

    deriver.derive(group, D::ApsisSubspacecraftAltitude, &et, |store| {
        at_apsis(&store.read_float(&et_path)?, |t| {
            ephemeris.surface_distance(Body::Maven, t)
        })
    })?;

    let longitude_path = group.dataset(D::ApsisSubspacecraftLongitude);
    deriver.derive(
        group,
        D::ApsisSubspacecraftLocalTime,
        &[et_path.clone(), longitude_path.clone()],
        |store| {
            let longitude = first(&store.read_float(&longitude_path)?);
            at_apsis(&store.read_float(&et_path)?, |t| {
                ephemeris.local_time(t, longitude.to_radians())
            })
        },
    )?;

    deriver.derive(group, D::ApsisMarsSunDistance, &et, |store| {
        at_apsis(&store.read_float(&et_path)?, |t| {
            ephemeris.surface_distance(Body::Sun, t)
        })
    })?;

    let points = [
        D::ApsisSubsolarLatitude,
        D::ApsisSubsolarLongitude,
        D::ApsisSubspacecraftLatitude,
        D::ApsisSubspacecraftLongitude,
    ]
    .map(|id| group.dataset(id));
    deriver.derive(group, D::ApsisSubsolarSubspacecraftAngle, &points, |store| {
        let values = points
            .iter()
            .map(|path| store.read_float(path))
            .collect::<Result<Vec<_>>>()?;
        if values.iter().any(|v| v.is_empty()) {
            return Ok(ProductArray::empty_float(1));
        }
        let [a, b, c, d] = [&values[0], &values[1], &values[2], &values[3]].map(first);
        Ok(arr1(&[haversine(a, b, c, d)]).into())
    })?;
    Ok(())
}
