//! Device — the remote camera/floodlight the automation is bound to.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{MotionLightError, ValidationError};
use crate::id::DeviceId;

/// Something a device can do, as advertised by the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Light,
    Siren,
    Motion,
    Video,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Light => f.write_str("light"),
            Self::Siren => f.write_str("siren"),
            Self::Motion => f.write_str("motion"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Static description of a remote device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    /// Device kind as reported by the remote API (e.g. `cocoa_floodlight`).
    pub kind: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub capabilities: BTreeSet<Capability>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Whether the device advertises `capability`.
    #[must_use]
    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] when `name` is empty.
    pub fn validate(&self) -> Result<(), MotionLightError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    name: Option<String>,
    kind: Option<String>,
    latitude: f64,
    longitude: f64,
    capabilities: BTreeSet<Capability>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    #[must_use]
    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = latitude;
        self.longitude = longitude;
        self
    }

    #[must_use]
    pub fn capability(mut self, capability: Capability) -> Self {
        self.capabilities.insert(capability);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] if the id or name is missing.
    pub fn build(self) -> Result<Device, MotionLightError> {
        let device = Device {
            id: self.id.ok_or(ValidationError::EmptyId)?,
            name: self.name.unwrap_or_default(),
            kind: self.kind,
            latitude: self.latitude,
            longitude: self.longitude,
            capabilities: self.capabilities,
        };
        device.validate()?;
        Ok(device)
    }
}
