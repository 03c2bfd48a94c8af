//! Virtual floodlight — a simulated camera with a switchable light.
//!
//! The remote state of a real floodlight lags the command that changed it.
//! The simulation reproduces that with a configurable number of stale reads
//! after each write.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use motionlight_app::ports::LightDevice;
use motionlight_domain::device::{Capability, Device};
use motionlight_domain::error::MotionLightError;
use motionlight_domain::id::DeviceId;

use crate::error::VirtualDeviceError;

/// Id of the default virtual floodlight.
pub const DRIVE_DEVICE_ID: u64 = 707_916_814;

#[derive(Debug, Default)]
struct FloodlightState {
    on: bool,
    reported_on: bool,
    state_lag_reads: u32,
    stale_reads_left: u32,
    fail_next_writes: u32,
    offline: bool,
    history: Vec<bool>,
}

/// A simulated floodlight that can be switched on and off.
#[derive(Debug)]
pub struct VirtualFloodlight {
    descriptor: Device,
    write_latency: Duration,
    state: Mutex<FloodlightState>,
    active_writes: AtomicUsize,
    peak_writes: AtomicUsize,
}

impl VirtualFloodlight {
    #[must_use]
    pub fn new(descriptor: Device) -> Self {
        Self {
            descriptor,
            write_latency: Duration::ZERO,
            state: Mutex::new(FloodlightState::default()),
            active_writes: AtomicUsize::new(0),
            peak_writes: AtomicUsize::new(0),
        }
    }

    /// The default floodlight: "Drive", with light, motion and video.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the coordinates are rejected.
    pub fn drive(latitude: f64, longitude: f64) -> Result<Self, MotionLightError> {
        let descriptor = Device::builder()
            .id(DeviceId::from(DRIVE_DEVICE_ID))
            .name("Drive")
            .kind("cocoa_floodlight")
            .coordinates(latitude, longitude)
            .capability(Capability::Light)
            .capability(Capability::Motion)
            .capability(Capability::Video)
            .build()?;
        Ok(Self::new(descriptor))
    }

    /// Reads after a write that still report the previous state.
    #[must_use]
    pub fn with_state_lag(self, reads: u32) -> Self {
        self.lock_state().state_lag_reads = reads;
        self
    }

    #[must_use]
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = latency;
        self
    }

    #[must_use]
    pub fn with_light_on(self, on: bool) -> Self {
        {
            let mut state = self.lock_state();
            state.on = on;
            state.reported_on = on;
        }
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.lock_state().offline = offline;
    }

    /// Make the next `count` writes fail.
    pub fn fail_next_writes(&self, count: u32) {
        self.lock_state().fail_next_writes = count;
    }

    /// Physical light state, regardless of lag.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.lock_state().on
    }

    /// Every successful write, oldest first.
    #[must_use]
    pub fn write_history(&self) -> Vec<bool> {
        self.lock_state().history.clone()
    }

    /// Highest number of writes ever observed running at the same time.
    #[must_use]
    pub fn peak_concurrent_writes(&self) -> usize {
        self.peak_writes.load(Ordering::SeqCst)
    }

    fn lock_state(&self) -> MutexGuard<'_, FloodlightState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct ActiveWrite<'a>(&'a AtomicUsize);

impl Drop for ActiveWrite<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LightDevice for VirtualFloodlight {
    fn descriptor(&self) -> &Device {
        &self.descriptor
    }

    async fn set_light(&self, on: bool) -> Result<(), MotionLightError> {
        let active = self.active_writes.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveWrite(&self.active_writes);
        self.peak_writes.fetch_max(active, Ordering::SeqCst);
        tokio::time::sleep(self.write_latency).await;

        let mut state = self.lock_state();
        if state.offline {
            return Err(VirtualDeviceError::Offline {
                device: self.descriptor.name.clone(),
            }
            .into());
        }
        if state.fail_next_writes > 0 {
            state.fail_next_writes -= 1;
            return Err(VirtualDeviceError::InjectedFailure {
                device: self.descriptor.name.clone(),
            }
            .into());
        }
        state.on = on;
        state.stale_reads_left = state.state_lag_reads;
        state.history.push(on);
        tracing::debug!(device = %self.descriptor.name, on, "virtual floodlight switched");
        Ok(())
    }

    async fn light_state(&self) -> Result<bool, MotionLightError> {
        let mut state = self.lock_state();
        if state.offline {
            return Err(VirtualDeviceError::Offline {
                device: self.descriptor.name.clone(),
            }
            .into());
        }
        if state.stale_reads_left > 0 {
            state.stale_reads_left -= 1;
            return Ok(state.reported_on);
        }
        state.reported_on = state.on;
        Ok(state.on)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive() -> VirtualFloodlight {
        VirtualFloodlight::drive(59.33, 18.07).unwrap()
    }

    #[tokio::test]
    async fn should_default_to_off() {
        let light = drive();
        assert!(!light.light_state().await.unwrap());
        assert!(light.has_capability(Capability::Light));
    }

    #[tokio::test]
    async fn should_report_new_state_after_write() {
        let light = drive();
        light.set_light(true).await.unwrap();
        assert!(light.light_state().await.unwrap());
        assert_eq!(light.write_history(), vec![true]);
    }

    #[tokio::test]
    async fn should_report_stale_state_while_lagging() {
        let light = drive().with_light_on(true).with_state_lag(2);
        light.set_light(false).await.unwrap();
        assert!(!light.is_on());
        assert!(light.light_state().await.unwrap());
        assert!(light.light_state().await.unwrap());
        assert!(!light.light_state().await.unwrap());
    }

    #[tokio::test]
    async fn should_fail_injected_writes_then_recover() {
        let light = drive();
        light.fail_next_writes(1);
        let err = light.set_light(true).await.unwrap_err();
        assert!(matches!(err, MotionLightError::Hardware(_)));
        light.set_light(true).await.unwrap();
        assert_eq!(light.write_history(), vec![true]);
    }

    #[tokio::test]
    async fn should_fail_every_call_while_offline() {
        let light = drive();
        light.set_offline(true);
        assert!(light.set_light(true).await.is_err());
        assert!(light.light_state().await.is_err());
        light.set_offline(false);
        assert!(light.set_light(true).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn should_track_overlapping_writes() {
        let light = std::sync::Arc::new(drive().with_write_latency(Duration::from_secs(1)));
        let first = tokio::spawn({
            let light = std::sync::Arc::clone(&light);
            async move { light.set_light(true).await }
        });
        let second = tokio::spawn({
            let light = std::sync::Arc::clone(&light);
            async move { light.set_light(false).await }
        });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(light.peak_concurrent_writes(), 2);
    }
}
