//! Dataset identifiers and the group layout of a product file.
//!
//! Every stored array is named by a [`DatasetId`]. Each identifier carries
//! its stored name, the key under which its latest version is registered,
//! its unit and a provenance comment, so there is exactly one place where
//! the registry key of a dataset is spelled out.

use std::fmt;

/// Static description of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetSpec {
    /// Name of the dataset inside its group.
    pub name: &'static str,
    /// Key of the dataset in the version registry.
    pub registry_key: &'static str,
    /// Physical unit; empty for dimensionless values.
    pub unit: &'static str,
    /// Provenance comment stored next to the data.
    pub comment: &'static str,
}

/// Product category of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupCategory {
    /// Geometry at the apsis of a segment.
    Apsis,
    /// Per-integration housekeeping shared by both channels.
    Integration,
    /// Per-integration spacecraft geometry.
    SpacecraftGeometry,
    /// Per-integration values of one channel.
    ChannelIntegration,
    /// Bin edges of one experiment.
    Binning,
    /// Detector images of one experiment.
    Detector,
    /// Per-bin geometry of one experiment.
    BinGeometry,
}

/// Orbit segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Segment {
    /// Disk imaging near apoapse.
    Apoapse,
    /// Limb scans near periapse.
    Periapse,
}

impl Segment {
    /// Name used in group paths.
    pub fn name(self) -> &'static str {
        match self {
            Self::Apoapse => "apoapse",
            Self::Periapse => "periapse",
        }
    }
}

/// Spectrograph channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    /// Mid ultraviolet.
    Muv,
    /// Far ultraviolet.
    Fuv,
}

impl Channel {
    /// Name used in group paths and file names.
    pub fn name(self) -> &'static str {
        match self {
            Self::Muv => "muv",
            Self::Fuv => "fuv",
        }
    }
}

/// Observing mode an integration was taken in, decided by its MCP voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Experiment {
    /// Failsafe voltage of the orbit.
    Failsafe,
    /// Below the day/night voltage boundary.
    Dayside,
    /// At or above the day/night voltage boundary.
    Nightside,
}

impl Experiment {
    /// All experiments in processing order.
    pub const ALL: [Experiment; 3] = [Self::Failsafe, Self::Dayside, Self::Nightside];

    /// Name used in group paths.
    pub fn name(self) -> &'static str {
        match self {
            Self::Failsafe => "failsafe",
            Self::Dayside => "dayside",
            Self::Nightside => "nightside",
        }
    }

    /// Dataset holding the per-integration membership mask of this experiment.
    pub fn mask(self) -> DatasetId {
        match self {
            Self::Failsafe => DatasetId::Failsafe,
            Self::Dayside => DatasetId::Dayside,
            Self::Nightside => DatasetId::Nightside,
        }
    }
}

/// Location of a group inside a product file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupPath {
    /// `<segment>/apsis`
    Apsis(Segment),
    /// `<segment>/integration`
    Integration(Segment),
    /// `<segment>/spacecraft_geometry`
    SpacecraftGeometry(Segment),
    /// `<segment>/<channel>/integration`
    ChannelIntegration(Segment, Channel),
    /// `<segment>/<channel>/<experiment>/binning`
    Binning(Segment, Channel, Experiment),
    /// `<segment>/<channel>/<experiment>/detector`
    Detector(Segment, Channel, Experiment),
    /// `<segment>/<channel>/<experiment>/bin_geometry`
    BinGeometry(Segment, Channel, Experiment),
}

impl GroupPath {
    /// Returns the slash separated path, e.g. `apoapse/muv/dayside/detector`.
    pub fn path(self) -> String {
        match self {
            Self::Apsis(s) => format!("{}/apsis", s.name()),
            Self::Integration(s) => format!("{}/integration", s.name()),
            Self::SpacecraftGeometry(s) => format!("{}/spacecraft_geometry", s.name()),
            Self::ChannelIntegration(s, c) => format!("{}/{}/integration", s.name(), c.name()),
            Self::Binning(s, c, e) => format!("{}/{}/{}/binning", s.name(), c.name(), e.name()),
            Self::Detector(s, c, e) => format!("{}/{}/{}/detector", s.name(), c.name(), e.name()),
            Self::BinGeometry(s, c, e) => {
                format!("{}/{}/{}/bin_geometry", s.name(), c.name(), e.name())
            }
        }
    }

    /// Product category of this group.
    pub fn category(self) -> GroupCategory {
        match self {
            Self::Apsis(_) => GroupCategory::Apsis,
            Self::Integration(_) => GroupCategory::Integration,
            Self::SpacecraftGeometry(_) => GroupCategory::SpacecraftGeometry,
            Self::ChannelIntegration(..) => GroupCategory::ChannelIntegration,
            Self::Binning(..) => GroupCategory::Binning,
            Self::Detector(..) => GroupCategory::Detector,
            Self::BinGeometry(..) => GroupCategory::BinGeometry,
        }
    }

    /// Returns the path of `id` inside this group.
    pub fn dataset(self, id: DatasetId) -> String {
        format!("{}/{}", self.path(), id.name())
    }

    /// Every group of one segment and channel, parents before children.
    pub fn layout(segment: Segment, channel: Channel) -> Vec<GroupPath> {
        let mut groups = vec![
            Self::Apsis(segment),
            Self::Integration(segment),
            Self::SpacecraftGeometry(segment),
            Self::ChannelIntegration(segment, channel),
        ];
        for experiment in Experiment::ALL {
            groups.push(Self::Binning(segment, channel, experiment));
            groups.push(Self::Detector(segment, channel, experiment));
            groups.push(Self::BinGeometry(segment, channel, experiment));
        }
        groups
    }
}

impl fmt::Display for GroupPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Identifier of every dataset the pipeline can produce.
///
/// Each variant is described by its [`DatasetSpec`], see [`DatasetId::spec`].
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetId {
    // apsis
    ApsisEphemerisTime,
    ApsisMarsYear,
    ApsisSol,
    ApsisSolarLongitude,
    ApsisSubsolarLatitude,
    ApsisSubsolarLongitude,
    ApsisSubspacecraftLatitude,
    ApsisSubspacecraftLongitude,
    ApsisSubspacecraftAltitude,
    ApsisSubspacecraftLocalTime,
    ApsisMarsSunDistance,
    ApsisSubsolarSubspacecraftAngle,
    // integration
    EphemerisTime,
    FieldOfView,
    MirrorDataNumber,
    CaseTemperature,
    IntegrationTime,
    DataFile,
    SwathNumber,
    NumberOfSwaths,
    Opportunity,
    // spacecraft geometry
    SubsolarLatitude,
    SubsolarLongitude,
    SubspacecraftLatitude,
    SubspacecraftLongitude,
    SubspacecraftAltitude,
    InstrumentSunAngle,
    SpacecraftVelocityInertialFrame,
    InstrumentXFieldOfView,
    AppFlip,
    // channel integration
    DetectorTemperature,
    Voltage,
    VoltageGain,
    Failsafe,
    Dayside,
    Nightside,
    // binning
    SpatialBinEdges,
    SpectralBinEdges,
    // detector
    Raw,
    DarkSubtracted,
    Brightness,
    // bin geometry
    BinLatitude,
    BinLongitude,
    BinTangentAltitude,
    BinTangentAltitudeRate,
    BinLineOfSight,
    BinRightAscension,
    BinDeclination,
    BinSolarZenithAngle,
    BinEmissionAngle,
    BinPhaseAngle,
    BinZenithAngle,
    BinLocalTime,
}

const FITS_INTEGRATION: &str = "Taken from the integration structure of the IUVS FITS files.";
const FITS_OBSERVATION: &str =
    "Taken from the observation structure of the IUVS FITS files, repeated per integration.";
const FITS_SPACECRAFT: &str = "Taken from the spacecraftgeometry structure of the IUVS FITS files.";
const FITS_PIXEL: &str = "Taken from the pixelgeometry structure of the IUVS FITS files.";
const FITS_BINNING: &str = "Taken from the binning structure of the IUVS FITS files.";
const APSIS_SPICE: &str = "Computed with SPICE at the ephemeris time of apoapsis.";

const fn spec(
    name: &'static str,
    registry_key: &'static str,
    unit: &'static str,
    comment: &'static str,
) -> DatasetSpec {
    DatasetSpec {
        name,
        registry_key,
        unit,
        comment,
    }
}

impl DatasetId {
    /// Every identifier, in declaration order.
    pub const ALL: [DatasetId; 53] = [
        Self::ApsisEphemerisTime,
        Self::ApsisMarsYear,
        Self::ApsisSol,
        Self::ApsisSolarLongitude,
        Self::ApsisSubsolarLatitude,
        Self::ApsisSubsolarLongitude,
        Self::ApsisSubspacecraftLatitude,
        Self::ApsisSubspacecraftLongitude,
        Self::ApsisSubspacecraftAltitude,
        Self::ApsisSubspacecraftLocalTime,
        Self::ApsisMarsSunDistance,
        Self::ApsisSubsolarSubspacecraftAngle,
        Self::EphemerisTime,
        Self::FieldOfView,
        Self::MirrorDataNumber,
        Self::CaseTemperature,
        Self::IntegrationTime,
        Self::DataFile,
        Self::SwathNumber,
        Self::NumberOfSwaths,
        Self::Opportunity,
        Self::SubsolarLatitude,
        Self::SubsolarLongitude,
        Self::SubspacecraftLatitude,
        Self::SubspacecraftLongitude,
        Self::SubspacecraftAltitude,
        Self::InstrumentSunAngle,
        Self::SpacecraftVelocityInertialFrame,
        Self::InstrumentXFieldOfView,
        Self::AppFlip,
        Self::DetectorTemperature,
        Self::Voltage,
        Self::VoltageGain,
        Self::Failsafe,
        Self::Dayside,
        Self::Nightside,
        Self::SpatialBinEdges,
        Self::SpectralBinEdges,
        Self::Raw,
        Self::DarkSubtracted,
        Self::Brightness,
        Self::BinLatitude,
        Self::BinLongitude,
        Self::BinTangentAltitude,
        Self::BinTangentAltitudeRate,
        Self::BinLineOfSight,
        Self::BinRightAscension,
        Self::BinDeclination,
        Self::BinSolarZenithAngle,
        Self::BinEmissionAngle,
        Self::BinPhaseAngle,
        Self::BinZenithAngle,
        Self::BinLocalTime,
    ];

    /// Returns the static description of this dataset.
    #[allow(clippy::too_many_lines)]
    pub const fn spec(self) -> DatasetSpec {
        match self {
            Self::ApsisEphemerisTime => spec(
                "ephemeris_time",
                "apsis_ephemeris_time",
                "Seconds after J2000",
                "Ephemeris time of apoapsis, from the precomputed apsis table.",
            ),
            Self::ApsisMarsYear => spec("mars_year", "apsis_mars_year", "", APSIS_SPICE),
            Self::ApsisSol => spec("sol", "apsis_sol", "Sols", APSIS_SPICE),
            Self::ApsisSolarLongitude => {
                spec("solar_longitude", "apsis_solar_longitude", "Degrees", APSIS_SPICE)
            }
            Self::ApsisSubsolarLatitude => spec(
                "subsolar_latitude",
                "apsis_subsolar_latitude",
                "Degrees [N]",
                APSIS_SPICE,
            ),
            Self::ApsisSubsolarLongitude => spec(
                "subsolar_longitude",
                "apsis_subsolar_longitude",
                "Degrees [E]",
                APSIS_SPICE,
            ),
            Self::ApsisSubspacecraftLatitude => spec(
                "subspacecraft_latitude",
                "apsis_subspacecraft_latitude",
                "Degrees [N]",
                APSIS_SPICE,
            ),
            Self::ApsisSubspacecraftLongitude => spec(
                "subspacecraft_longitude",
                "apsis_subspacecraft_longitude",
                "Degrees [E]",
                APSIS_SPICE,
            ),
            Self::ApsisSubspacecraftAltitude => spec(
                "subspacecraft_altitude",
                "apsis_subspacecraft_altitude",
                "km",
                APSIS_SPICE,
            ),
            Self::ApsisSubspacecraftLocalTime => spec(
                "subspacecraft_local_time",
                "apsis_subspacecraft_local_time",
                "Hours",
                APSIS_SPICE,
            ),
            Self::ApsisMarsSunDistance => {
                spec("mars_sun_distance", "apsis_mars_sun_distance", "km", APSIS_SPICE)
            }
            Self::ApsisSubsolarSubspacecraftAngle => spec(
                "subsolar_subspacecraft_angle",
                "apsis_subsolar_subspacecraft_angle",
                "Degrees",
                "Great circle angle between the subsolar and subspacecraft points.",
            ),
            Self::EphemerisTime => spec(
                "ephemeris_time",
                "ephemeris_time",
                "Seconds after J2000",
                FITS_INTEGRATION,
            ),
            Self::FieldOfView => spec("field_of_view", "field_of_view", "Degrees", FITS_INTEGRATION),
            Self::MirrorDataNumber => {
                spec("mirror_data_number", "mirror_data_number", "DN", FITS_INTEGRATION)
            }
            Self::CaseTemperature => spec(
                "case_temperature",
                "case_temperature",
                "Degrees [C]",
                FITS_INTEGRATION,
            ),
            Self::IntegrationTime => {
                spec("integration_time", "integration_time", "Seconds", FITS_OBSERVATION)
            }
            Self::DataFile => spec(
                "data_file",
                "data_file",
                "",
                "Index of the data file each integration was read from.",
            ),
            Self::SwathNumber => spec(
                "swath_number",
                "swath_number",
                "",
                "Computed from mirror angle discontinuities, with manual corrections for known bad orbits.",
            ),
            Self::NumberOfSwaths => spec(
                "number_of_swaths",
                "number_of_swaths",
                "",
                "One more than the largest swath number, unless manually overridden.",
            ),
            Self::Opportunity => spec(
                "opportunity",
                "opportunity",
                "",
                "True for each integration in a swath where the mirror swept its full mechanical range.",
            ),
            Self::SubsolarLatitude => spec(
                "subsolar_latitude",
                "subsolar_latitude",
                "Degrees [N]",
                FITS_SPACECRAFT,
            ),
            Self::SubsolarLongitude => spec(
                "subsolar_longitude",
                "subsolar_longitude",
                "Degrees [E]",
                FITS_SPACECRAFT,
            ),
            Self::SubspacecraftLatitude => spec(
                "subspacecraft_latitude",
                "subspacecraft_latitude",
                "Degrees [N]",
                FITS_SPACECRAFT,
            ),
            Self::SubspacecraftLongitude => spec(
                "subspacecraft_longitude",
                "subspacecraft_longitude",
                "Degrees [E]",
                FITS_SPACECRAFT,
            ),
            Self::SubspacecraftAltitude => spec(
                "subspacecraft_altitude",
                "subspacecraft_altitude",
                "km",
                FITS_SPACECRAFT,
            ),
            Self::InstrumentSunAngle => spec(
                "instrument_sun_angle",
                "instrument_sun_angle",
                "Degrees",
                FITS_SPACECRAFT,
            ),
            Self::SpacecraftVelocityInertialFrame => spec(
                "spacecraft_velocity_inertial_frame",
                "spacecraft_velocity_inertial_frame",
                "km/s",
                FITS_SPACECRAFT,
            ),
            Self::InstrumentXFieldOfView => spec(
                "instrument_x_field_of_view",
                "instrument_x_field_of_view",
                "",
                FITS_SPACECRAFT,
            ),
            Self::AppFlip => spec(
                "app_flip",
                "app_flip",
                "",
                "True if the instrument x axis points along the spacecraft velocity in most integrations.",
            ),
            Self::DetectorTemperature => spec(
                "detector_temperature",
                "detector_temperature",
                "Degrees [C]",
                FITS_INTEGRATION,
            ),
            Self::Voltage => spec("voltage", "voltage", "V", FITS_OBSERVATION),
            Self::VoltageGain => spec("voltage_gain", "voltage_gain", "V", FITS_OBSERVATION),
            Self::Failsafe => spec(
                "failsafe",
                "failsafe",
                "",
                "True if the MCP voltage equals the failsafe voltage.",
            ),
            Self::Dayside => spec(
                "dayside",
                "dayside",
                "",
                "True if the MCP voltage is a dayside setting and not failsafe.",
            ),
            Self::Nightside => spec(
                "nightside",
                "nightside",
                "",
                "True if the MCP voltage is above the day/night boundary.",
            ),
            Self::SpatialBinEdges => spec(
                "spatial_bin_edges",
                "spatial_bin_edges",
                "Detector pixel",
                FITS_BINNING,
            ),
            Self::SpectralBinEdges => spec(
                "spectral_bin_edges",
                "spectral_bin_edges",
                "Detector pixel",
                FITS_BINNING,
            ),
            Self::Raw => spec(
                "raw",
                "raw",
                "DN",
                "Taken from the primary structure of the IUVS FITS files.",
            ),
            Self::DarkSubtracted => spec(
                "dark_subtracted",
                "dark_subtracted",
                "DN",
                "Taken from the detector_dark_subtracted structure of the IUVS FITS files.",
            ),
            Self::Brightness => spec(
                "brightness",
                "brightness",
                "kR",
                "Dark subtracted counts corrected for sensitivity, flatfield and MCP voltage gain.",
            ),
            Self::BinLatitude => spec("latitude", "bin_latitude", "Degrees [N]", FITS_PIXEL),
            Self::BinLongitude => spec("longitude", "bin_longitude", "Degrees [E]", FITS_PIXEL),
            Self::BinTangentAltitude => {
                spec("tangent_altitude", "bin_tangent_altitude", "km", FITS_PIXEL)
            }
            Self::BinTangentAltitudeRate => spec(
                "tangent_altitude_rate",
                "bin_tangent_altitude_rate",
                "km/s",
                FITS_PIXEL,
            ),
            Self::BinLineOfSight => spec("line_of_sight", "bin_line_of_sight", "km", FITS_PIXEL),
            Self::BinRightAscension => {
                spec("right_ascension", "bin_right_ascension", "Degrees", FITS_PIXEL)
            }
            Self::BinDeclination => spec("declination", "bin_declination", "Degrees", FITS_PIXEL),
            Self::BinSolarZenithAngle => spec(
                "solar_zenith_angle",
                "bin_solar_zenith_angle",
                "Degrees",
                FITS_PIXEL,
            ),
            Self::BinEmissionAngle => {
                spec("emission_angle", "bin_emission_angle", "Degrees", FITS_PIXEL)
            }
            Self::BinPhaseAngle => spec("phase_angle", "bin_phase_angle", "Degrees", FITS_PIXEL),
            Self::BinZenithAngle => spec("zenith_angle", "bin_zenith_angle", "Degrees", FITS_PIXEL),
            Self::BinLocalTime => spec("local_time", "bin_local_time", "Hours", FITS_PIXEL),
        }
    }

    /// Name of the dataset inside its group.
    pub const fn name(self) -> &'static str {
        self.spec().name
    }

    /// Key of the dataset in the version registry.
    pub const fn registry_key(self) -> &'static str {
        self.spec().registry_key
    }

    /// Category of the group this dataset lives in.
    pub fn category(self) -> GroupCategory {
        use DatasetId as D;
        match self {
            D::ApsisEphemerisTime
            | D::ApsisMarsYear
            | D::ApsisSol
            | D::ApsisSolarLongitude
            | D::ApsisSubsolarLatitude
            | D::ApsisSubsolarLongitude
            | D::ApsisSubspacecraftLatitude
            | D::ApsisSubspacecraftLongitude
            | D::ApsisSubspacecraftAltitude
            | D::ApsisSubspacecraftLocalTime
            | D::ApsisMarsSunDistance
            | D::ApsisSubsolarSubspacecraftAngle => GroupCategory::Apsis,
            D::EphemerisTime
            | D::FieldOfView
            | D::MirrorDataNumber
            | D::CaseTemperature
            | D::IntegrationTime
            | D::DataFile
            | D::SwathNumber
            | D::NumberOfSwaths
            | D::Opportunity => GroupCategory::Integration,
            D::SubsolarLatitude
            | D::SubsolarLongitude
            | D::SubspacecraftLatitude
            | D::SubspacecraftLongitude
            | D::SubspacecraftAltitude
            | D::InstrumentSunAngle
            | D::SpacecraftVelocityInertialFrame
            | D::InstrumentXFieldOfView
            | D::AppFlip => GroupCategory::SpacecraftGeometry,
            D::DetectorTemperature
            | D::Voltage
            | D::VoltageGain
            | D::Failsafe
            | D::Dayside
            | D::Nightside => GroupCategory::ChannelIntegration,
            D::SpatialBinEdges | D::SpectralBinEdges => GroupCategory::Binning,
            D::Raw | D::DarkSubtracted | D::Brightness => GroupCategory::Detector,
            D::BinLatitude
            | D::BinLongitude
            | D::BinTangentAltitude
            | D::BinTangentAltitudeRate
            | D::BinLineOfSight
            | D::BinRightAscension
            | D::BinDeclination
            | D::BinSolarZenithAngle
            | D::BinEmissionAngle
            | D::BinPhaseAngle
            | D::BinZenithAngle
            | D::BinLocalTime => GroupCategory::BinGeometry,
        }
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.registry_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_keys_are_unique() {
        let keys: HashSet<_> = DatasetId::ALL.iter().map(|id| id.registry_key()).collect();
        assert_eq!(keys.len(), DatasetId::ALL.len());
    }

    #[test]
    fn test_prefixed_keys() {
        for id in DatasetId::ALL {
            let key = id.registry_key();
            match id.category() {
                GroupCategory::Apsis => assert_eq!(key, format!("apsis_{}", id.name())),
                GroupCategory::BinGeometry => assert_eq!(key, format!("bin_{}", id.name())),
                _ => assert_eq!(key, id.name()),
            }
        }
    }

    #[test]
    fn test_names_unique_within_category() {
        let mut seen = HashSet::new();
        for id in DatasetId::ALL {
            assert!(seen.insert((id.category(), id.name())), "{id} duplicated");
        }
    }

    #[test]
    fn test_group_paths() {
        let group = GroupPath::Detector(Segment::Apoapse, Channel::Muv, Experiment::Dayside);
        assert_eq!(group.path(), "apoapse/muv/dayside/detector");
        assert_eq!(
            group.dataset(DatasetId::Brightness),
            "apoapse/muv/dayside/detector/brightness"
        );
        assert_eq!(
            GroupPath::Apsis(Segment::Apoapse).dataset(DatasetId::ApsisEphemerisTime),
            "apoapse/apsis/ephemeris_time"
        );
    }

    #[test]
    fn test_layout_covers_every_category() {
        let layout = GroupPath::layout(Segment::Apoapse, Channel::Muv);
        assert_eq!(layout.len(), 13);
        for id in DatasetId::ALL {
            assert!(layout.iter().any(|g| g.category() == id.category()));
        }
    }
}
