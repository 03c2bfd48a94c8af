//! Solar gate — is it dark at a given place and instant?
//!
//! Sunrise and sunset are computed for the calendar day of `now` in the
//! location's timezone, using the almanac sunrise algorithm (official zenith
//! of 90°50'). The result is accurate to a couple of minutes, which is plenty
//! for deciding whether a floodlight is useful.
//!
//! Nothing here is cached: a long-running process straddles sunrise and
//! sunset, so callers re-evaluate on every admission check.

use chrono::{Datelike, NaiveDate, NaiveTime, Offset, TimeDelta, TimeZone};

use crate::location::Location;
use crate::time::Timestamp;

/// Official zenith for sunrise/sunset, in degrees (includes refraction and
/// the solar disc radius).
const ZENITH_OFFICIAL: f64 = 90.833;

/// Sun events for one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SunTimes {
    /// The sun rises and sets on this day.
    Regular {
        sunrise: Timestamp,
        sunset: Timestamp,
    },
    /// The sun never sets (midnight sun).
    PolarDay,
    /// The sun never rises.
    PolarNight,
}

/// Whether it is dark at `location` at instant `now`.
///
/// True iff `now` is before sunrise or after sunset of the local calendar
/// day. Polar nights are dark all day, polar days never are.
#[must_use]
pub fn is_dark(location: &Location, now: Timestamp) -> bool {
    let date = now.with_timezone(&location.timezone()).date_naive();
    match sun_times(location, date) {
        SunTimes::Regular { sunrise, sunset } => now < sunrise || now > sunset,
        SunTimes::PolarDay => false,
        SunTimes::PolarNight => true,
    }
}

/// Sunrise and sunset for the local calendar `date` at `location`.
#[must_use]
pub fn sun_times(location: &Location, date: NaiveDate) -> SunTimes {
    let local_noon = date.and_time(NaiveTime::MIN) + TimeDelta::hours(12);
    let offset_secs = location
        .timezone()
        .offset_from_utc_datetime(&local_noon)
        .fix()
        .local_minus_utc();
    let offset_hours = f64::from(offset_secs) / 3600.0;

    let rise = match solve(location, date, Event::Rise, offset_hours) {
        Solution::At(hours) => hours,
        Solution::NeverRises => return SunTimes::PolarNight,
        Solution::NeverSets => return SunTimes::PolarDay,
    };
    let set = match solve(location, date, Event::Set, offset_hours) {
        Solution::At(hours) => hours,
        Solution::NeverRises => return SunTimes::PolarNight,
        Solution::NeverSets => return SunTimes::PolarDay,
    };

    SunTimes::Regular {
        sunrise: local_hours_to_instant(date, rise, offset_hours),
        sunset: local_hours_to_instant(date, set, offset_hours),
    }
}

#[derive(Clone, Copy)]
enum Event {
    Rise,
    Set,
}

enum Solution {
    /// Local clock time of the event, in hours since local midnight.
    At(f64),
    NeverRises,
    NeverSets,
}

fn solve(location: &Location, date: NaiveDate, event: Event, offset_hours: f64) -> Solution {
    let day_of_year = f64::from(date.ordinal());
    let lng_hour = location.longitude() / 15.0;

    let approx = match event {
        Event::Rise => day_of_year + (6.0 - lng_hour) / 24.0,
        Event::Set => day_of_year + (18.0 - lng_hour) / 24.0,
    };

    let mean_anomaly = 0.9856 * approx - 3.289;
    let true_longitude = normalize_degrees(
        mean_anomaly
            + 1.916 * sin_deg(mean_anomaly)
            + 0.020 * sin_deg(2.0 * mean_anomaly)
            + 282.634,
    );

    let mut right_ascension = normalize_degrees(atan_deg(0.91764 * tan_deg(true_longitude)));
    let l_quadrant = (true_longitude / 90.0).floor() * 90.0;
    let ra_quadrant = (right_ascension / 90.0).floor() * 90.0;
    right_ascension = (right_ascension + (l_quadrant - ra_quadrant)) / 15.0;

    let sin_dec = 0.39782 * sin_deg(true_longitude);
    let cos_dec = sin_dec.asin().cos();

    let latitude = location.latitude();
    let cos_hour_angle =
        (cos_deg(ZENITH_OFFICIAL) - sin_dec * sin_deg(latitude)) / (cos_dec * cos_deg(latitude));
    if cos_hour_angle > 1.0 {
        return Solution::NeverRises;
    }
    if cos_hour_angle < -1.0 {
        return Solution::NeverSets;
    }

    let hour_angle = match event {
        Event::Rise => 360.0 - cos_hour_angle.acos().to_degrees(),
        Event::Set => cos_hour_angle.acos().to_degrees(),
    } / 15.0;

    let local_mean_time = hour_angle + right_ascension - 0.06571 * approx - 6.622;
    let universal = local_mean_time - lng_hour;
    Solution::At((universal + offset_hours).rem_euclid(24.0))
}

#[allow(clippy::cast_possible_truncation)]
fn local_hours_to_instant(date: NaiveDate, local_hours: f64, offset_hours: f64) -> Timestamp {
    let millis = ((local_hours - offset_hours) * 3_600_000.0).round() as i64;
    date.and_time(NaiveTime::MIN).and_utc() + TimeDelta::milliseconds(millis)
}

fn normalize_degrees(value: f64) -> f64 {
    value.rem_euclid(360.0)
}

fn sin_deg(deg: f64) -> f64 {
    deg.to_radians().sin()
}

fn cos_deg(deg: f64) -> f64 {
    deg.to_radians().cos()
}

fn tan_deg(deg: f64) -> f64 {
    deg.to_radians().tan()
}

fn atan_deg(value: f64) -> f64 {
    value.atan().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;

    fn stockholm() -> Location {
        Location::new(59.33, 18.07, chrono_tz::Europe::Stockholm).unwrap()
    }

    fn tromso() -> Location {
        Location::new(69.65, 18.96, chrono_tz::Europe::Oslo).unwrap()
    }

    fn at(tz: Tz, y: i32, m: u32, d: u32, h: u32, min: u32) -> Timestamp {
        tz.with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn within_minutes(actual: Timestamp, expected: Timestamp, minutes: i64) -> bool {
        (actual - expected).num_minutes().abs() <= minutes
    }

    #[test]
    fn should_compute_equinox_sunrise_and_sunset_in_london() {
        let london = Location::new(51.5074, -0.1278, chrono_tz::Europe::London).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 20).unwrap();
        let SunTimes::Regular { sunrise, sunset } = sun_times(&london, date) else {
            panic!("expected a regular day");
        };
        let expected_rise = Utc.with_ymd_and_hms(2025, 3, 20, 6, 3, 0).unwrap();
        let expected_set = Utc.with_ymd_and_hms(2025, 3, 20, 18, 13, 0).unwrap();
        assert!(within_minutes(sunrise, expected_rise, 10), "{sunrise}");
        assert!(within_minutes(sunset, expected_set, 10), "{sunset}");
    }

    #[test]
    fn should_be_light_at_local_noon() {
        let now = at(chrono_tz::Europe::Stockholm, 2025, 6, 21, 12, 0);
        assert!(!is_dark(&stockholm(), now));
    }

    #[test]
    fn should_be_dark_late_on_a_summer_evening() {
        let now = at(chrono_tz::Europe::Stockholm, 2025, 6, 21, 23, 30);
        assert!(is_dark(&stockholm(), now));
    }

    #[test]
    fn should_be_dark_before_sunrise() {
        let now = at(chrono_tz::Europe::Stockholm, 2025, 12, 10, 6, 0);
        assert!(is_dark(&stockholm(), now));
    }

    #[test]
    fn should_use_the_local_calendar_day() {
        // 23:30 UTC on Jan 1 is already Jan 2 in Auckland, mid-morning.
        let auckland = Location::new(-36.85, 174.76, chrono_tz::Pacific::Auckland).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 23, 30, 0).unwrap();
        assert!(!is_dark(&auckland, now));
    }

    #[test]
    fn should_report_polar_day_under_midnight_sun() {
        let date = NaiveDate::from_ymd_opt(2025, 6, 21).unwrap();
        assert_eq!(sun_times(&tromso(), date), SunTimes::PolarDay);
        let midnight = at(chrono_tz::Europe::Oslo, 2025, 6, 21, 0, 30);
        assert!(!is_dark(&tromso(), midnight));
    }

    #[test]
    fn should_report_polar_night_in_midwinter() {
        let date = NaiveDate::from_ymd_opt(2025, 12, 21).unwrap();
        assert_eq!(sun_times(&tromso(), date), SunTimes::PolarNight);
        let noon = at(chrono_tz::Europe::Oslo, 2025, 12, 21, 12, 0);
        assert!(is_dark(&tromso(), noon));
    }

    #[test]
    fn should_be_deterministic_for_identical_inputs() {
        let location = stockholm();
        for hour in 0..24 {
            let now = at(chrono_tz::Europe::Stockholm, 2025, 9, 1, hour, 15);
            assert_eq!(is_dark(&location, now), is_dark(&location, now));
        }
    }
}
