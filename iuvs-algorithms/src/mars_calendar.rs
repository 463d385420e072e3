//! Mars year and sol from ephemeris time.
//!
//! Uses the Mars Sol Date of Allison and McEwen (2000) and the Clancy year
//! numbering, where Mars year 1 began on 1955-04-11.

/// Julian date of the J2000 epoch.
const J2000_JULIAN_DATE: f64 = 2_451_545.0;
/// Julian date at Mars Sol Date 0.
const MSD_EPOCH_JULIAN_DATE: f64 = 2_405_522.002_877_9;
/// Earth days per sol.
const DAYS_PER_SOL: f64 = 1.027_491_251_7;
/// Julian date of the start of Mars year 1.
const MARS_YEAR_ONE_JULIAN_DATE: f64 = 2_435_208.5;
/// Sols per Mars year.
const SOLS_PER_YEAR: f64 = 668.599_1;
const SECONDS_PER_DAY: f64 = 86_400.0;

/// Mars Sol Date at an ephemeris time [seconds after J2000].
pub fn mars_sol_date(ephemeris_time: f64) -> f64 {
    let julian_date = J2000_JULIAN_DATE + ephemeris_time / SECONDS_PER_DAY;
    (julian_date - MSD_EPOCH_JULIAN_DATE) / DAYS_PER_SOL
}

fn sols_since_year_one(ephemeris_time: f64) -> f64 {
    let year_one = (MARS_YEAR_ONE_JULIAN_DATE - MSD_EPOCH_JULIAN_DATE) / DAYS_PER_SOL;
    mars_sol_date(ephemeris_time) - year_one
}

/// Mars year at an ephemeris time.
#[allow(clippy::cast_possible_truncation)]
pub fn mars_year(ephemeris_time: f64) -> i64 {
    (sols_since_year_one(ephemeris_time) / SOLS_PER_YEAR).floor() as i64 + 1
}

/// Sols elapsed since the start of the Mars year.
pub fn sol(ephemeris_time: f64) -> f64 {
    sols_since_year_one(ephemeris_time).rem_euclid(SOLS_PER_YEAR)
}
