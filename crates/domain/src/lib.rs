//! # motionlight-domain
//!
//! Pure domain model for the motionlight floodlight automation.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Devices** (the remote camera/floodlight and its capabilities)
//! - Define **Motion events** (push notifications delivered by the transport)
//! - Define **Locations** and the **solar gate** (is it dark right now?)
//! - Define the **event de-duplication window**
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod dedup;
pub mod device;
pub mod event;
pub mod gate;
pub mod location;
pub mod solar;
