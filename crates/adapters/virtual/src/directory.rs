//! In-memory device directory.

use std::sync::Arc;

use motionlight_app::ports::{DeviceDirectory, LightDevice};
use motionlight_domain::error::MotionLightError;

use crate::floodlight::VirtualFloodlight;

/// Looks virtual floodlights up by name.
#[derive(Debug, Clone, Default)]
pub struct VirtualDirectory {
    devices: Vec<Arc<VirtualFloodlight>>,
}

impl VirtualDirectory {
    #[must_use]
    pub fn with_device(mut self, device: Arc<VirtualFloodlight>) -> Self {
        self.devices.push(device);
        self
    }
}

impl DeviceDirectory for VirtualDirectory {
    type Device = Arc<VirtualFloodlight>;

    async fn find_device_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Self::Device>, MotionLightError> {
        Ok(self
            .devices
            .iter()
            .find(|device| device.name() == name)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use motionlight_domain::error::NotFoundError;

    use super::*;

    fn directory() -> VirtualDirectory {
        VirtualDirectory::default()
            .with_device(Arc::new(VirtualFloodlight::drive(59.33, 18.07).unwrap()))
    }

    #[tokio::test]
    async fn should_find_device_by_exact_name() {
        let found = directory().find_device_by_name("Drive").await.unwrap();
        assert_eq!(found.unwrap().name(), "Drive");
    }

    #[tokio::test]
    async fn should_return_none_for_unknown_name() {
        assert!(directory().find_device_by_name("drive").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_report_unknown_device_as_not_found() {
        let err = directory().require_device("Porch").await.unwrap_err();
        assert!(matches!(
            err,
            MotionLightError::NotFound(NotFoundError { entity: "Device", .. })
        ));
    }
}
