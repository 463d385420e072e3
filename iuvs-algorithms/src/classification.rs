//! Sorting integrations and files into experiments by MCP voltage.

use iuvs_core::{Experiment, InstrumentConstants, Orbit, RawFile, RawRecord};

use crate::stats::is_close;

/// Experiment an MCP voltage belongs to.
///
/// The failsafe voltage wins; otherwise voltages strictly below the
/// day/night boundary are dayside and everything else is nightside.
pub fn classify_voltage(voltage: f64, orbit: Orbit, constants: &InstrumentConstants) -> Experiment {
    if is_close(voltage, constants.failsafe_voltage(orbit.number())) {
        Experiment::Failsafe
    } else if voltage < constants.day_night_voltage_boundary {
        Experiment::Dayside
    } else {
        Experiment::Nightside
    }
}

/// Experiment of a file, decided by the MCP voltage of its observation.
pub fn classify_file(file: &RawFile, orbit: Orbit, constants: &InstrumentConstants) -> Experiment {
    classify_voltage(file.observation.mcp_voltage, orbit, constants)
}

/// Membership mask of `experiment` for every voltage.
pub fn experiment_mask(
    voltages: &[f64],
    experiment: Experiment,
    orbit: Orbit,
    constants: &InstrumentConstants,
) -> Vec<bool> {
    voltages
        .iter()
        .map(|&v| classify_voltage(v, orbit, constants) == experiment)
        .collect()
}

/// Files of `record` taken in `experiment`.
pub fn files_of(
    record: &RawRecord,
    experiment: Experiment,
    orbit: Orbit,
    constants: &InstrumentConstants,
) -> RawRecord {
    record.filter(|file| classify_file(file, orbit, constants) == experiment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iuvs_core::ObservationTable;

    #[test]
    fn test_classify_voltage() {
        let constants = InstrumentConstants::default();
        let early = Orbit::new(3453);
        let late = Orbit::new(8000);
        assert_eq!(classify_voltage(497.638_03, early, &constants), Experiment::Failsafe);
        assert_eq!(classify_voltage(497.638_03, late, &constants), Experiment::Dayside);
        assert_eq!(classify_voltage(515.206, late, &constants), Experiment::Failsafe);
        assert_eq!(classify_voltage(600.0, early, &constants), Experiment::Dayside);
        assert_eq!(classify_voltage(789.9, early, &constants), Experiment::Dayside);
        assert_eq!(classify_voltage(790.0, early, &constants), Experiment::Nightside);
        assert_eq!(classify_voltage(850.0, early, &constants), Experiment::Nightside);
    }

    #[test]
    fn test_masks_partition_integrations() {
        let constants = InstrumentConstants::default();
        let orbit = Orbit::new(3453);
        let voltages = [497.638_03, 600.0, 850.0, 600.0];
        let masks: Vec<Vec<bool>> = Experiment::ALL
            .iter()
            .map(|&e| experiment_mask(&voltages, e, orbit, &constants))
            .collect();
        assert_eq!(masks[0], vec![true, false, false, false]);
        assert_eq!(masks[1], vec![false, true, false, true]);
        assert_eq!(masks[2], vec![false, false, true, false]);
    }

    #[test]
    fn test_files_of() {
        let constants = InstrumentConstants::default();
        let orbit = Orbit::new(3453);
        let file = |v| RawFile {
            observation: ObservationTable {
                mcp_voltage: v,
                ..ObservationTable::default()
            },
            ..RawFile::default()
        };
        let record = RawRecord::new(vec![file(600.0), file(850.0), file(650.0)]);
        assert_eq!(files_of(&record, Experiment::Dayside, orbit, &constants).files().len(), 2);
        assert!(files_of(&record, Experiment::Failsafe, orbit, &constants).is_empty());
    }
}
