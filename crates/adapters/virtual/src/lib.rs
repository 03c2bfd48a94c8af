//! # motionlight-adapter-virtual
//!
//! Virtual/demo adapter that stands in for the remote camera service during
//! development, demonstrations and end-to-end tests.
//!
//! ## Provided pieces
//!
//! | Piece | Port | Behaviour |
//! |-------|------|-----------|
//! | [`VirtualFloodlight`] | `LightDevice` | Switchable light with read-back lag and failure injection |
//! | [`VirtualDirectory`] | `DeviceDirectory` | Finds floodlights by name |
//! | [`VirtualTransport`] | `EventTransport` | Delivers injected events from its own thread |
//! | [`spawn_motion_simulator`] | — | Periodically injects motion and its update |
//!
//! ## Dependency rule
//!
//! Depends on `motionlight-app` (port traits) and `motionlight-domain` only.

mod directory;
mod error;
mod floodlight;
mod simulator;
mod transport;

pub use directory::VirtualDirectory;
pub use error::VirtualDeviceError;
pub use floodlight::{DRIVE_DEVICE_ID, VirtualFloodlight};
pub use simulator::spawn_motion_simulator;
pub use transport::{EventInjector, VirtualTransport};
