//! Errors raised by the virtual devices and transport.

use motionlight_domain::error::MotionLightError;

#[derive(Debug, thiserror::Error)]
pub enum VirtualDeviceError {
    #[error("device {device} is offline")]
    Offline { device: String },

    #[error("injected failure on device {device}")]
    InjectedFailure { device: String },

    #[error("event transport is not running")]
    TransportClosed,

    #[error("event transport worker panicked")]
    WorkerPanicked,

    #[error("failed to spawn event transport worker")]
    Spawn(#[source] std::io::Error),
}

impl From<VirtualDeviceError> for MotionLightError {
    fn from(err: VirtualDeviceError) -> Self {
        match err {
            VirtualDeviceError::Offline { .. } | VirtualDeviceError::InjectedFailure { .. } => {
                Self::Hardware(Box::new(err))
            }
            VirtualDeviceError::TransportClosed
            | VirtualDeviceError::WorkerPanicked
            | VirtualDeviceError::Spawn(_) => Self::Transport(Box::new(err)),
        }
    }
}
