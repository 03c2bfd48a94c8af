//! Device ports — lookup and light control for remote floodlights.

use std::future::Future;
use std::sync::Arc;

use motionlight_domain::device::{Capability, Device};
use motionlight_domain::error::{MotionLightError, NotFoundError};

/// Handle to one remote device that may carry a light.
///
/// Calls may be slow (they go through the remote API) and are always awaited.
pub trait LightDevice: Send + Sync + 'static {
    /// Static description: id, name, coordinates, capabilities.
    fn descriptor(&self) -> &Device;

    fn name(&self) -> &str {
        &self.descriptor().name
    }

    fn has_capability(&self, capability: Capability) -> bool {
        self.descriptor().has_capability(capability)
    }

    /// Command the light on or off.
    fn set_light(&self, on: bool) -> impl Future<Output = Result<(), MotionLightError>> + Send;

    /// Sync with the remote service and return the last known light state.
    ///
    /// The remote state lags commands; a read straight after
    /// [`set_light`](Self::set_light) may still report the old value.
    fn light_state(&self) -> impl Future<Output = Result<bool, MotionLightError>> + Send;
}

impl<T: LightDevice> LightDevice for Arc<T> {
    fn descriptor(&self) -> &Device {
        (**self).descriptor()
    }

    fn set_light(&self, on: bool) -> impl Future<Output = Result<(), MotionLightError>> + Send {
        (**self).set_light(on)
    }

    fn light_state(&self) -> impl Future<Output = Result<bool, MotionLightError>> + Send {
        (**self).light_state()
    }
}

/// Looks devices up by their user-facing name.
pub trait DeviceDirectory: Send + Sync {
    type Device: LightDevice;

    /// Return the device called `name`, or `None`.
    fn find_device_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Self::Device>, MotionLightError>> + Send;

    /// Like [`find_device_by_name`](Self::find_device_by_name) but a missing
    /// device is an error.
    fn require_device(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Self::Device, MotionLightError>> + Send {
        async move {
            self.find_device_by_name(name).await?.ok_or_else(|| {
                NotFoundError {
                    entity: "Device",
                    id: name.to_string(),
                }
                .into()
            })
        }
    }
}
