//! Admission gates — preconditions an actuation request must satisfy before
//! the light may be commanded on.

use crate::location::Location;
use crate::solar;
use crate::time::Timestamp;

/// Decides whether a turn-on request may take effect at `now`.
pub trait AdmissionGate: Send + Sync {
    /// `true` when the light may be turned on.
    fn admits(&self, now: Timestamp) -> bool;

    /// Short human-readable name for logs.
    fn describe(&self) -> String;
}

/// Admits requests only while it is dark at a location.
#[derive(Debug, Clone, Copy)]
pub struct SolarGate {
    location: Location,
}

impl SolarGate {
    #[must_use]
    pub fn new(location: Location) -> Self {
        Self { location }
    }

    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }
}

impl AdmissionGate for SolarGate {
    fn admits(&self, now: Timestamp) -> bool {
        solar::is_dark(&self.location, now)
    }

    fn describe(&self) -> String {
        format!(
            "dark at ({:.4}, {:.4}) {}",
            self.location.latitude(),
            self.location.longitude(),
            self.location.timezone()
        )
    }
}

/// Admits every request; used when the light should react around the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOpen;

impl AdmissionGate for AlwaysOpen {
    fn admits(&self, _now: Timestamp) -> bool {
        true
    }

    fn describe(&self) -> String {
        "always open".to_string()
    }
}

impl<T: AdmissionGate + ?Sized> AdmissionGate for Box<T> {
    fn admits(&self, now: Timestamp) -> bool {
        (**self).admits(now)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
