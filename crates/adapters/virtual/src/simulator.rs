//! Demo motion generator.

use std::time::Duration;

use motionlight_domain::device::Device;
use motionlight_domain::event::MotionEvent;
use motionlight_domain::id::EventId;
use tokio::task::JoinHandle;

use crate::transport::EventInjector;

const FIRST_EVENT_ID: u64 = 7_581_554_843_738_829_838;
const STATES: [&str; 3] = ["person", "vehicle", "animal"];

/// Spawn a task that reports a new motion on `device` every `interval`,
/// followed by one update of that motion halfway through the interval.
///
/// The task ends when the transport behind `injector` is dropped. Intervals
/// shorter than a second are raised to one second.
#[must_use]
pub fn spawn_motion_simulator(
    injector: EventInjector,
    device: &Device,
    interval: Duration,
) -> JoinHandle<()> {
    let interval = interval.max(Duration::from_secs(1));
    let device_id = device.id.clone();
    let device_name = device.name.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        for (n, state) in (0_u64..).zip(STATES.iter().cycle()) {
            ticker.tick().await;
            let event_id = EventId::from(FIRST_EVENT_ID.wrapping_add(n));
            let motion = MotionEvent::builder(event_id, device_id.clone())
                .device_name(device_name.clone())
                .state(*state)
                .build();
            let update = MotionEvent {
                is_update: true,
                ..motion.clone()
            };

            tracing::debug!(event_id = %motion.id, state = %state, "simulating motion");
            if injector.inject(motion).is_err() {
                break;
            }
            tokio::time::sleep(interval / 2).await;
            if injector.inject(update).is_err() {
                break;
            }
        }
        tracing::debug!("motion simulator stopped");
    })
}
