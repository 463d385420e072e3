//! `<segment>/<channel>/integration`: detector settings and experiment masks.

use iuvs_algorithms::experiment_mask;
use iuvs_core::{
    Channel, DatasetId, Experiment, GroupPath, InstrumentConstants, Orbit, ProductStore,
    RawRecord, Result, Segment,
};
use ndarray::Array1;

use super::engine::Deriver;

pub(super) fn derive<S: ProductStore + ?Sized>(
    deriver: &mut Deriver<'_, S>,
    record: &RawRecord,
    orbit: Orbit,
    segment: Segment,
    channel: Channel,
    constants: &InstrumentConstants,
) -> Result<()> {
    use DatasetId as D;
    let group = GroupPath::ChannelIntegration(segment, channel);

    deriver.derive(group, D::DetectorTemperature, &[], |_| {
        Ok(record.integration_column(|t| t.detector_temperature.as_slice()).into())
    })?;
    deriver.derive(group, D::Voltage, &[], |_| {
        Ok(record.observation_column(|o| o.mcp_voltage).into())
    })?;
    deriver.derive(group, D::VoltageGain, &[], |_| {
        Ok(record.observation_column(|o| o.mcp_voltage_gain).into())
    })?;

    let voltage_path = group.dataset(D::Voltage);
    for experiment in Experiment::ALL {
        deriver.derive(group, experiment.mask(), &[voltage_path.clone()], |store| {
            let voltage: Vec<f64> = store.read_float(&voltage_path)?.iter().copied().collect();
            Ok(Array1::from(experiment_mask(&voltage, experiment, orbit, constants)).into())
        })?;
    }
    Ok(())
}
