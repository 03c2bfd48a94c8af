//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`MotionLightError`] via `#[from]`.

use crate::device::Capability;

/// Top-level error for every port boundary in motionlight.
#[derive(Debug, thiserror::Error)]
pub enum MotionLightError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A lookup returned nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// The device exists but cannot do what the caller needs.
    #[error("device {device} is missing the {capability} capability")]
    MissingCapability {
        device: String,
        capability: Capability,
    },

    /// The device rejected or failed a command, or its state could not be read.
    #[error("hardware error")]
    Hardware(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The event transport failed to start or stop.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The light controller task is gone (shut down or crashed).
    #[error("light controller is not running")]
    ControllerUnavailable,

    /// The light controller mailbox is full; the request was dropped.
    #[error("light controller mailbox is full")]
    MailboxFull,
}

/// Reasons a domain value is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("identifier must not be empty")]
    EmptyId,

    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },
}

/// A named thing could not be found.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id:?} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
