//! # motionlightd — motion-light daemon
//!
//! Composition root that wires the adapters, the light controller and the
//! event router together and runs until interrupted.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the tracing subscriber
//! - Look the floodlight up and build its admission gate
//! - Spawn the light controller and bind an event router to it
//! - Start the event transport (and the demo motion simulator, if enabled)
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod logging;

use std::sync::Arc;

use motionlight_adapter_virtual::{
    VirtualDirectory, VirtualFloodlight, VirtualTransport, spawn_motion_simulator,
};
use motionlight_app::event_router::EventRouter;
use motionlight_app::light_controller::LightController;
use motionlight_app::ports::{DeviceDirectory, EventTransport, LightDevice};
use motionlight_domain::gate::{AdmissionGate, AlwaysOpen, SolarGate};
use motionlight_domain::location::Location;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let _log_guard = logging::init(&config.logging)?;

    if let Err(err) = run(config).await {
        tracing::error!(error = %err, "motionlightd failed");
        return Err(err);
    }
    Ok(())
}

async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Devices
    let floodlight =
        VirtualFloodlight::drive(config.simulation.latitude, config.simulation.longitude)?
            .with_state_lag(config.simulation.state_lag_reads);
    let directory = VirtualDirectory::default().with_device(Arc::new(floodlight));
    let device = directory.require_device(&config.device.name).await?;

    // Gate
    let gate: Box<dyn AdmissionGate> = if config.gate.enabled {
        let location = Location::for_device(device.descriptor(), &config.gate.timezone)?;
        Box::new(SolarGate::new(location))
    } else {
        Box::new(AlwaysOpen)
    };
    tracing::info!(device = %device.name(), gate = %gate.describe(), "admission gate ready");

    // Controller and router
    let controller = LightController::spawn(Arc::clone(&device), gate, config.controller()).await?;
    let router = Arc::new(EventRouter::new(
        device.descriptor(),
        controller.handle(),
        config.light_duration(),
        config.dedup.capacity,
    ));

    // Transport
    let mut transport = VirtualTransport::default();
    transport.add_notification_callback(router.into_callback());
    transport.start().await?;
    tracing::info!(
        started = transport.is_started(),
        subscribed = transport.is_subscribed(),
        "event transport running"
    );

    let simulator = config.motion_interval().map(|interval| {
        tracing::info!(interval_secs = interval.as_secs(), "motion simulator enabled");
        spawn_motion_simulator(transport.injector(), device.descriptor(), interval)
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    if let Some(simulator) = simulator {
        simulator.abort();
    }
    transport.stop().await?;
    controller.shutdown().await;
    tracing::info!("motionlightd stopped");
    Ok(())
}
