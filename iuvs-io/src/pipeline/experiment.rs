//! `<segment>/<channel>/<experiment>`: binning, detector and bin geometry.
//!
//! Each experiment only sees the files whose MCP voltage classifies into
//! it. Detector images and bin geometry are stored mirrored along the
//! spatial axis when the segment's app flip is set, so every stored image
//! reads in the same orientation.

use iuvs_algorithms::{bin_edges, bin_width, files_of, BrightnessInput};
use iuvs_core::{
    Channel, DatasetId, Experiment, GroupPath, Orbit, ProductArray, ProductStore, RawRecord,
    Result, Segment,
};
use ndarray::{Array1, ArrayD, Ix3};

use super::engine::Deriver;
use super::spacecraft_geometry::stored_app_flip;
use super::PipelineContext;

const WIDTH_ATTR: &str = "width";

/// Bin geometry datasets, all sourced from the pixel geometry of the files.
const BIN_GEOMETRY: [DatasetId; 12] = [
    DatasetId::BinLatitude,
    DatasetId::BinLongitude,
    DatasetId::BinTangentAltitude,
    DatasetId::BinTangentAltitudeRate,
    DatasetId::BinLineOfSight,
    DatasetId::BinRightAscension,
    DatasetId::BinDeclination,
    DatasetId::BinSolarZenithAngle,
    DatasetId::BinEmissionAngle,
    DatasetId::BinPhaseAngle,
    DatasetId::BinZenithAngle,
    DatasetId::BinLocalTime,
];

fn mirrored(data: ProductArray, flip: bool) -> ProductArray {
    if flip {
        data.flip_spatial()
    } else {
        data
    }
}

/// Values of `values` whose mask entry is set.
fn masked(values: &ArrayD<f64>, mask: &ArrayD<bool>) -> Array1<f64> {
    values
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &keep)| keep.then_some(v))
        .collect()
}

#[allow(clippy::too_many_arguments)]
pub(super) fn derive<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    record: &RawRecord,
    orbit: Orbit,
    segment: Segment,
    channel: Channel,
    experiment: Experiment,
    context: &PipelineContext<'_>,
) -> Result<()> {
    let subset = files_of(record, experiment, orbit, context.constants);
    log::debug!(
        "{}: {} {} has {} of {} files",
        orbit.code(),
        channel.name(),
        experiment.name(),
        subset.files().len(),
        record.files().len()
    );

    derive_binning(deriver, &subset, segment, channel, experiment)?;
    derive_detector(deriver, &subset, segment, channel, experiment)?;
    if channel == Channel::Muv {
        match context.calibration {
            Some(_) => derive_brightness(deriver, segment, channel, experiment, context)?,
            None => log::warn!(
                "{}: no calibration tables, skipping {} brightness",
                orbit.code(),
                experiment.name()
            ),
        }
    }
    derive_bin_geometry(deriver, &subset, segment, channel, experiment)
}

fn derive_binning<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    subset: &RawRecord,
    segment: Segment,
    channel: Channel,
    experiment: Experiment,
) -> Result<()> {
    let group = GroupPath::Binning(segment, channel, experiment);
    let (spatial, spectral) = bin_edges(subset.binning());

    for (id, edges) in [
        (DatasetId::SpatialBinEdges, spatial),
        (DatasetId::SpectralBinEdges, spectral),
    ] {
        deriver.derive_annotated(group, id, &[], false, |_| {
            let width = bin_width(&edges);
            Ok((
                Array1::from(edges).into(),
                vec![(WIDTH_ATTR.to_string(), width)],
            ))
        })?;
    }
    Ok(())
}

fn derive_detector<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    subset: &RawRecord,
    segment: Segment,
    channel: Channel,
    experiment: Experiment,
) -> Result<()> {
    let group = GroupPath::Detector(segment, channel, experiment);
    let flip_path = GroupPath::SpacecraftGeometry(segment).dataset(DatasetId::AppFlip);
    let inputs = [flip_path];

    deriver.derive(group, DatasetId::Raw, &inputs, |store| {
        let flip = stored_app_flip(store, segment)?;
        Ok(mirrored(subset.detector(|d| &d.raw)?.into(), flip))
    })?;
    deriver.derive(group, DatasetId::DarkSubtracted, &inputs, |store| {
        let flip = stored_app_flip(store, segment)?;
        Ok(mirrored(subset.detector(|d| &d.dark_subtracted)?.into(), flip))
    })?;
    Ok(())
}

fn derive_brightness<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    segment: Segment,
    channel: Channel,
    experiment: Experiment,
    context: &PipelineContext<'_>,
) -> Result<()> {
    let Some(calibration) = context.calibration else {
        return Ok(());
    };
    let group = GroupPath::Detector(segment, channel, experiment);
    let binning = GroupPath::Binning(segment, channel, experiment);
    let channel_group = GroupPath::ChannelIntegration(segment, channel);

    let counts_path = group.dataset(DatasetId::DarkSubtracted);
    let spatial_path = binning.dataset(DatasetId::SpatialBinEdges);
    let spectral_path = binning.dataset(DatasetId::SpectralBinEdges);
    let flip_path = GroupPath::SpacecraftGeometry(segment).dataset(DatasetId::AppFlip);
    let time_path = GroupPath::Integration(segment).dataset(DatasetId::IntegrationTime);
    let voltage_path = channel_group.dataset(DatasetId::Voltage);
    let gain_path = channel_group.dataset(DatasetId::VoltageGain);
    let mask_path = channel_group.dataset(experiment.mask());
    let inputs = [
        counts_path.clone(),
        spatial_path.clone(),
        spectral_path.clone(),
        flip_path,
        time_path.clone(),
        voltage_path.clone(),
        gain_path.clone(),
        mask_path.clone(),
    ];

    deriver.derive(group, DatasetId::Brightness, &inputs, |store| {
        let counts = store.read_float(&counts_path)?.into_dimensionality::<Ix3>()?;
        let spatial: Vec<i64> = store.read_int(&spatial_path)?.iter().copied().collect();
        let spectral: Vec<i64> = store.read_int(&spectral_path)?.iter().copied().collect();
        let mask = store.read_bool(&mask_path)?;
        let integration_time = masked(&store.read_float(&time_path)?, &mask);
        let voltage = masked(&store.read_float(&voltage_path)?, &mask);
        let voltage_gain = masked(&store.read_float(&gain_path)?, &mask);

        let input = BrightnessInput {
            dark_subtracted: counts.view(),
            spatial_bin_edges: &spatial,
            spatial_bin_width: bin_width(&spatial),
            spectral_bin_edges: &spectral,
            spectral_bin_width: bin_width(&spectral),
            integration_time: integration_time.view(),
            voltage: voltage.view(),
            voltage_gain: voltage_gain.view(),
            app_flip: stored_app_flip(store, segment)?,
        };
        Ok(calibration.make_brightness(&input, context.constants)?.into())
    })?;
    Ok(())
}

fn derive_bin_geometry<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    subset: &RawRecord,
    segment: Segment,
    channel: Channel,
    experiment: Experiment,
) -> Result<()> {
    let group = GroupPath::BinGeometry(segment, channel, experiment);
    let inputs = [GroupPath::SpacecraftGeometry(segment).dataset(DatasetId::AppFlip)];

    for id in BIN_GEOMETRY {
        deriver.derive(group, id, &inputs, |store| {
            let flip = stored_app_flip(store, segment)?;
            let column = subset
                .pixel_column(id)?
                .ok_or_else(|| iuvs_core::Error::MissingDataset(group.dataset(id)))?;
            Ok(mirrored(column.into(), flip))
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_masked_keeps_selected_values() {
        let values = array![1.0, 2.0, 3.0, 4.0].into_dyn();
        let mask = array![true, false, false, true].into_dyn();
        let kept = masked(&values, &mask);
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0], 1.0);
        assert_relative_eq!(kept[1], 4.0);
    }

    #[test]
    fn test_mirrored_only_when_flipped() {
        let data: ProductArray = array![[[1.0, 2.0], [3.0, 4.0]]].into();
        let same = mirrored(data.clone(), false).into_float("x").unwrap();
        assert_relative_eq!(same[[0, 0, 0]], 1.0);
        let flipped = mirrored(data, true).into_float("x").unwrap();
        assert_relative_eq!(flipped[[0, 0, 0]], 3.0);
    }
}
