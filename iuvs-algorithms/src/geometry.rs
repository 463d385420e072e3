//! Observation geometry.

use iuvs_core::Result;
use ndarray::ArrayView2;

/// Body whose subpoint on Mars is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Body {
    /// The Sun.
    Sun,
    /// The MAVEN spacecraft.
    Maven,
}

/// Provider of Mars ephemeris quantities, such as SPICE.
///
/// Implementations are shared read-only between orbit workers.
pub trait Ephemeris: Send + Sync {
    /// Intercept of the Mars to `target` line with the Mars ellipsoid, as
    /// rectangular coordinates [km] in the Mars body-fixed frame.
    ///
    /// # Errors
    /// Returns [`iuvs_core::Error::EphemerisError`] if the provider has no
    /// answer at `ephemeris_time`.
    fn subpoint(&self, target: Body, ephemeris_time: f64) -> Result<[f64; 3]>;

    /// Distance [km] from `observer` to its subpoint.
    ///
    /// # Errors
    /// See [`Ephemeris::subpoint`].
    fn surface_distance(&self, observer: Body, ephemeris_time: f64) -> Result<f64>;

    /// Local true solar time [hours] on Mars at an east longitude [radians].
    ///
    /// # Errors
    /// See [`Ephemeris::subpoint`].
    fn local_time(&self, ephemeris_time: f64, longitude: f64) -> Result<f64>;

    /// Mars solar longitude Ls [radians].
    ///
    /// # Errors
    /// See [`Ephemeris::subpoint`].
    fn solar_longitude(&self, ephemeris_time: f64) -> Result<f64>;
}

/// Converts body-fixed rectangular coordinates to (latitude, east
/// longitude) in degrees, longitude in [0, 360).
pub fn latitude_longitude(point: [f64; 3]) -> (f64, f64) {
    let [x, y, z] = point;
    let radius = (x * x + y * y + z * z).sqrt();
    let colatitude = (z / radius).acos();
    let longitude = y.atan2(x);
    (
        90.0 - colatitude.to_degrees(),
        longitude.to_degrees().rem_euclid(360.0),
    )
}

/// Latitude and east longitude [degrees] of the subpoint of `target`.
///
/// # Errors
/// Propagates ephemeris failures.
pub fn subpoint<E: Ephemeris + ?Sized>(
    ephemeris: &E,
    target: Body,
    ephemeris_time: f64,
) -> Result<(f64, f64)> {
    ephemeris
        .subpoint(target, ephemeris_time)
        .map(latitude_longitude)
}

/// Great circle angle [degrees] between two points given in degrees.
pub fn haversine(latitude1: f64, longitude1: f64, latitude2: f64, longitude2: f64) -> f64 {
    let (lat1, lon1) = (latitude1.to_radians(), longitude1.to_radians());
    let (lat2, lon2) = (latitude2.to_radians(), longitude2.to_radians());
    let a = ((lat2 - lat1) / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
    (2.0 * a.sqrt().min(1.0).asin()).to_degrees()
}

/// Decides whether the articulated payload platform was flipped.
///
/// Each integration votes for a flip when the first components of the
/// instrument x axis and the spacecraft velocity have a positive product.
/// The platform is flipped when the fraction of votes reaches `threshold`.
///
/// Returns `None` when there are no integrations or the two arrays do not
/// line up.
#[allow(clippy::cast_precision_loss)]
pub fn app_flip(
    instrument_x: ArrayView2<'_, f64>,
    spacecraft_velocity: ArrayView2<'_, f64>,
    threshold: f64,
) -> Option<bool> {
    let n = instrument_x.nrows();
    if n == 0
        || spacecraft_velocity.nrows() != n
        || instrument_x.ncols() == 0
        || spacecraft_velocity.ncols() == 0
    {
        return None;
    }
    let votes = instrument_x
        .column(0)
        .iter()
        .zip(spacecraft_velocity.column(0))
        .filter(|(x, v)| *x * *v > 0.0)
        .count();
    Some(votes as f64 / n as f64 >= threshold)
}
