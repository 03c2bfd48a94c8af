//! Location — where the floodlight is, and which calendar it lives by.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::device::Device;
use crate::error::{MotionLightError, ValidationError};

/// Observer position plus the timezone whose calendar day the solar gate uses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    latitude: f64,
    longitude: f64,
    timezone: Tz,
}

impl Location {
    /// Build a validated location.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] when a coordinate is out of
    /// range or not finite.
    pub fn new(latitude: f64, longitude: f64, timezone: Tz) -> Result<Self, MotionLightError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude).into());
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude).into());
        }
        Ok(Self {
            latitude,
            longitude,
            timezone,
        })
    }

    /// Build a location from a device's coordinates and an IANA timezone name.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] when the timezone is unknown
    /// or the device coordinates are out of range.
    pub fn for_device(device: &Device, timezone: &str) -> Result<Self, MotionLightError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| ValidationError::UnknownTimezone(timezone.to_string()))?;
        Self::new(device.latitude, device.longitude, tz)
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}
