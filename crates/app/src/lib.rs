//! # motionlight-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `LightDevice` — switch a floodlight and read its light state back
//!   - `DeviceDirectory` — look a device up by name
//!   - `EventTransport` — deliver push notifications to a callback
//! - Provide the **light controller**: the single owner of one light's
//!   state, its auto-off timer and its hardware calls
//! - Provide the **event router**: filters and de-duplicates notifications
//!   and hands requests to the controller
//!
//! ## Dependency rule
//! Depends on `motionlight-domain` only (plus `tokio` for tasks, channels
//! and timers). Never imports adapter crates.

pub mod event_router;
pub mod light_controller;
pub mod ports;
