//! Event router — turns push notifications into light requests.
//!
//! The router runs on whatever thread the transport delivers from. It only
//! filters, de-duplicates and enqueues; all light work happens inside the
//! controller task. Nothing raised while handling one event escapes
//! [`EventRouter::on_event`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use motionlight_domain::dedup::{Classification, EventDeduplicator};
use motionlight_domain::device::Device;
use motionlight_domain::error::MotionLightError;
use motionlight_domain::event::MotionEvent;
use motionlight_domain::id::DeviceId;
use motionlight_domain::time;

use crate::ports::EventCallback;

/// Where the router submits light requests.
pub trait LightRequests: Send + Sync {
    /// Enqueue a request without waiting for it to be handled.
    ///
    /// # Errors
    ///
    /// Returns an error when the request could not be enqueued.
    fn request_on(&self, enable: bool, duration: Option<Duration>) -> Result<(), MotionLightError>;
}

/// What the router did with one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event belongs to another device.
    ForeignDevice,
    /// The event is not a motion event.
    IgnoredKind,
    /// The payload could not be decoded.
    Malformed,
    /// First sighting of this motion; the light was requested on.
    NewMotion,
    /// Update to a motion already seen; the request was re-submitted.
    RepeatMotion,
    /// The controller did not accept the request.
    SubmitFailed,
}

pub struct EventRouter<R> {
    device_id: DeviceId,
    device_name: String,
    light_duration: Duration,
    dedup: Mutex<EventDeduplicator>,
    controller: R,
}

impl<R: LightRequests> EventRouter<R> {
    /// Bind a router to `device`, submitting requests to `controller`.
    #[must_use]
    pub fn new(
        device: &Device,
        controller: R,
        light_duration: Duration,
        dedup_capacity: usize,
    ) -> Self {
        Self {
            device_id: device.id.clone(),
            device_name: device.name.clone(),
            light_duration,
            dedup: Mutex::new(EventDeduplicator::new(dedup_capacity)),
            controller,
        }
    }

    /// Number of motion identities currently remembered.
    #[must_use]
    pub fn active_events(&self) -> usize {
        self.dedup.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Route one decoded notification.
    pub fn on_event(&self, event: &MotionEvent) -> RouteOutcome {
        let _span = tracing::info_span!(
            "motion_event",
            event_id = %event.id,
            device = %event.device_name
        )
        .entered();

        if event.device_id != self.device_id {
            tracing::info!(
                device_id = %event.device_id,
                bound_device = %self.device_name,
                "ignoring event for another device"
            );
            return RouteOutcome::ForeignDevice;
        }
        if !event.is_motion() {
            tracing::info!(kind = %event.kind, "ignoring non-motion event");
            return RouteOutcome::IgnoredKind;
        }

        let classification = {
            let mut dedup = self.dedup.lock().unwrap_or_else(PoisonError::into_inner);
            let classification = dedup.classify(&event.id, event.ttl(), time::now());
            if classification == Classification::Repeat && dedup.is_full() {
                dedup.evict(&event.id);
                tracing::debug!(
                    active = dedup.len(),
                    "dedup window full, evicted repeated event"
                );
            }
            classification
        };

        let outcome = match classification {
            Classification::New => {
                tracing::info!(state = %event.state, "new motion detected");
                RouteOutcome::NewMotion
            }
            Classification::Repeat => {
                tracing::info!(
                    state = %event.state,
                    is_update = event.is_update,
                    "update to existing motion"
                );
                RouteOutcome::RepeatMotion
            }
        };

        match self.controller.request_on(true, Some(self.light_duration)) {
            Ok(()) => outcome,
            Err(err) => {
                tracing::error!(error = %err, "failed to submit light request");
                RouteOutcome::SubmitFailed
            }
        }
    }

    /// Decode a JSON notification and route it.
    pub fn on_payload(&self, payload: &[u8]) -> RouteOutcome {
        match serde_json::from_slice::<MotionEvent>(payload) {
            Ok(event) => self.on_event(&event),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    payload = %String::from_utf8_lossy(payload),
                    "dropping malformed notification"
                );
                RouteOutcome::Malformed
            }
        }
    }
}

impl<R: LightRequests + 'static> EventRouter<R> {
    /// Wrap the router into a transport callback.
    #[must_use]
    pub fn into_callback(self: Arc<Self>) -> EventCallback {
        Arc::new(move |event: MotionEvent| {
            self.on_event(&event);
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use motionlight_domain::device::Capability;
    use motionlight_domain::event::EventKind;
    use motionlight_domain::id::EventId;

    use super::*;

    const LIGHT: Duration = Duration::from_secs(30);

    #[derive(Default)]
    struct SpyController {
        requests: Mutex<Vec<(bool, Option<Duration>)>>,
        full: AtomicBool,
    }

    impl LightRequests for Arc<SpyController> {
        fn request_on(
            &self,
            enable: bool,
            duration: Option<Duration>,
        ) -> Result<(), MotionLightError> {
            if self.full.load(Ordering::SeqCst) {
                return Err(MotionLightError::MailboxFull);
            }
            self.requests.lock().unwrap().push((enable, duration));
            Ok(())
        }
    }

    fn drive() -> Device {
        Device::builder()
            .id(DeviceId::from(707_916_814_u64))
            .name("Drive")
            .capability(Capability::Light)
            .build()
            .unwrap()
    }

    fn router(capacity: usize) -> (EventRouter<Arc<SpyController>>, Arc<SpyController>) {
        let spy = Arc::new(SpyController::default());
        (EventRouter::new(&drive(), Arc::clone(&spy), LIGHT, capacity), spy)
    }

    fn motion(id: u64) -> MotionEvent {
        MotionEvent::builder(EventId::from(id), DeviceId::from(707_916_814_u64))
            .device_name("Drive")
            .state("person")
            .build()
    }

    #[test]
    fn should_request_light_on_for_new_motion() {
        let (router, spy) = router(20);
        assert_eq!(router.on_event(&motion(1001)), RouteOutcome::NewMotion);
        assert_eq!(*spy.requests.lock().unwrap(), vec![(true, Some(LIGHT))]);
        assert_eq!(router.active_events(), 1);
    }

    #[test]
    fn should_resubmit_for_update_without_duplicating_entry() {
        let (router, spy) = router(20);
        router.on_event(&motion(1001));
        let update = MotionEvent {
            is_update: true,
            ..motion(1001)
        };
        assert_eq!(router.on_event(&update), RouteOutcome::RepeatMotion);
        assert_eq!(spy.requests.lock().unwrap().len(), 2);
        assert_eq!(router.active_events(), 1);
    }

    #[test]
    fn should_ignore_events_for_other_devices() {
        let (router, spy) = router(20);
        let foreign = MotionEvent::builder(EventId::from(1_u64), DeviceId::from(42_u64))
            .device_name("Porch")
            .build();
        assert_eq!(router.on_event(&foreign), RouteOutcome::ForeignDevice);
        assert!(spy.requests.lock().unwrap().is_empty());
        assert_eq!(router.active_events(), 0);
    }

    #[test]
    fn should_ignore_non_motion_events() {
        let (router, spy) = router(20);
        let ding = MotionEvent {
            kind: EventKind::Ding,
            ..motion(5)
        };
        assert_eq!(router.on_event(&ding), RouteOutcome::IgnoredKind);
        assert!(spy.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn should_keep_routing_after_malformed_payload() {
        let (router, spy) = router(20);
        assert_eq!(router.on_payload(b"{\"id\": "), RouteOutcome::Malformed);
        assert_eq!(
            router.on_payload(br#"{"id": "", "doorbot_id": 707916814, "kind": "motion"}"#),
            RouteOutcome::Malformed
        );

        let payload = br#"{
            "id": 7581554843738829838,
            "doorbot_id": 707916814,
            "device_name": "Drive",
            "expires_in": 180,
            "kind": "motion",
            "state": "vehicle",
            "is_update": false
        }"#;
        assert_eq!(router.on_payload(payload), RouteOutcome::NewMotion);
        assert_eq!(spy.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_route_payload_with_id_wider_than_64_bits() {
        let (router, spy) = router(20);
        let payload =
            br#"{"id": 18446744073709551616, "doorbot_id": 707916814, "kind": "motion"}"#;
        assert_eq!(router.on_payload(payload), RouteOutcome::NewMotion);
        assert_eq!(router.on_payload(payload), RouteOutcome::RepeatMotion);
        assert_eq!(spy.requests.lock().unwrap().len(), 2);
        assert_eq!(router.active_events(), 1);
    }

    #[test]
    fn should_contain_submission_failures() {
        let (router, spy) = router(20);
        spy.full.store(true, Ordering::SeqCst);
        assert_eq!(router.on_event(&motion(1)), RouteOutcome::SubmitFailed);

        spy.full.store(false, Ordering::SeqCst);
        assert_eq!(router.on_event(&motion(1)), RouteOutcome::RepeatMotion);
        assert_eq!(spy.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn should_evict_repeated_event_when_window_is_full() {
        let (router, spy) = router(2);
        router.on_event(&motion(1));
        router.on_event(&motion(2));
        assert_eq!(router.on_event(&motion(2)), RouteOutcome::RepeatMotion);
        assert_eq!(router.active_events(), 1);

        assert_eq!(router.on_event(&motion(2)), RouteOutcome::NewMotion);
        assert_eq!(spy.requests.lock().unwrap().len(), 4);
    }

    #[test]
    fn should_route_from_transport_callback_on_another_thread() {
        let (router, spy) = router(20);
        let callback = Arc::new(router).into_callback();
        std::thread::spawn(move || callback(motion(1001)))
            .join()
            .unwrap();
        assert_eq!(spy.requests.lock().unwrap().len(), 1);
    }
}
