//! End-to-end tests for the full motionlightd stack.
//!
//! Each test wires the virtual floodlight, a real light controller, a real
//! event router and the virtual transport, then injects notifications the
//! way the remote service would push them. Time is paused; the transport
//! still delivers from its own OS thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use motionlight_adapter_virtual::{
    DRIVE_DEVICE_ID, EventInjector, VirtualDirectory, VirtualFloodlight, VirtualTransport,
};
use motionlight_app::event_router::EventRouter;
use motionlight_app::light_controller::{
    ControllerConfig, LightController, LightControllerHandle, LightPhase, TimerKind,
};
use motionlight_app::ports::{DeviceDirectory, EventCallback, EventTransport, LightDevice};
use motionlight_domain::event::{EventKind, MotionEvent};
use motionlight_domain::gate::{AdmissionGate, AlwaysOpen};
use motionlight_domain::id::{DeviceId, EventId};
use motionlight_domain::time::Timestamp;

const LIGHT: Duration = Duration::from_secs(30);
const SETTLE: Duration = Duration::from_secs(3);

struct Daylight;

impl AdmissionGate for Daylight {
    fn admits(&self, _now: Timestamp) -> bool {
        false
    }

    fn describe(&self) -> String {
        "daylight".to_string()
    }
}

struct Stack {
    floodlight: Arc<VirtualFloodlight>,
    controller: LightController,
    handle: LightControllerHandle,
    transport: VirtualTransport,
    injector: EventInjector,
    delivered: Arc<AtomicUsize>,
}

impl Stack {
    async fn start<G: AdmissionGate + 'static>(floodlight: VirtualFloodlight, gate: G) -> Self {
        let directory = VirtualDirectory::default().with_device(Arc::new(floodlight));
        let floodlight = directory.require_device("Drive").await.unwrap();

        let controller =
            LightController::spawn(Arc::clone(&floodlight), gate, ControllerConfig::default())
                .await
                .unwrap();
        let handle = controller.handle();
        let router = Arc::new(EventRouter::new(
            floodlight.descriptor(),
            controller.handle(),
            LIGHT,
            20,
        ));

        // registered after the router, so it counts events the router has finished
        let delivered = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&delivered);
        let count: EventCallback = Arc::new(move |_: MotionEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut transport = VirtualTransport::default();
        transport.add_notification_callback(router.into_callback());
        transport.add_notification_callback(count);
        transport.start().await.unwrap();
        let injector = transport.injector();

        Self {
            floodlight,
            controller,
            handle,
            transport,
            injector,
            delivered,
        }
    }

    /// Push `event` and wait until the router has handled it.
    async fn push(&self, event: MotionEvent) {
        let target = self.delivered.load(Ordering::SeqCst) + 1;
        self.injector.inject(event).unwrap();
        for _ in 0..5_000 {
            if self.delivered.load(Ordering::SeqCst) >= target {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
            tokio::task::yield_now().await;
        }
        panic!("event was not delivered");
    }

    async fn stop(mut self) {
        self.transport.stop().await.unwrap();
        self.controller.shutdown().await;
    }
}

fn drive() -> VirtualFloodlight {
    VirtualFloodlight::drive(59.33, 18.07).unwrap()
}

fn motion(id: u64) -> MotionEvent {
    MotionEvent::builder(EventId::from(id), DeviceId::from(DRIVE_DEVICE_ID))
        .device_name("Drive")
        .state("person")
        .build()
}

#[tokio::test(start_paused = true)]
async fn should_light_up_on_motion_extend_on_update_and_turn_off_afterwards() {
    let stack = Stack::start(drive(), AlwaysOpen).await;

    stack.push(motion(1001)).await;
    let snapshot = stack.handle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase(), LightPhase::TurningOn);

    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    let snapshot = stack.handle.snapshot().await.unwrap();
    assert!(snapshot.observed_on);
    assert_eq!(snapshot.pending_timer.unwrap().kind, TimerKind::AutoOff);
    assert!(stack.floodlight.is_on());

    tokio::time::sleep(Duration::from_secs(5)).await;
    let update = MotionEvent {
        is_update: true,
        ..motion(1001)
    };
    let pushed_at = tokio::time::Instant::now();
    stack.push(update).await;
    let snapshot = stack.handle.snapshot().await.unwrap();
    assert!(snapshot.pending_timer.unwrap().deadline >= pushed_at + LIGHT);
    assert_eq!(snapshot.writes_issued, 1);

    tokio::time::sleep(LIGHT - Duration::from_secs(1)).await;
    assert!(stack.floodlight.is_on());

    tokio::time::sleep(SETTLE + Duration::from_secs(2)).await;
    assert!(!stack.floodlight.is_on());
    assert_eq!(stack.floodlight.write_history(), vec![true, false]);
    assert_eq!(stack.handle.snapshot().await.unwrap().phase(), LightPhase::Idle);
    assert_eq!(stack.floodlight.peak_concurrent_writes(), 1);

    stack.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_ignore_foreign_devices_and_non_motion_events() {
    let stack = Stack::start(drive(), AlwaysOpen).await;

    let porch = MotionEvent::builder(EventId::from(1_u64), DeviceId::from(42_u64))
        .device_name("Porch")
        .build();
    stack.push(porch).await;
    let ding = MotionEvent {
        kind: EventKind::Ding,
        ..motion(2)
    };
    stack.push(ding).await;

    tokio::time::sleep(SETTLE * 2).await;
    assert_eq!(stack.handle.snapshot().await.unwrap().writes_issued, 0);
    assert!(stack.floodlight.write_history().is_empty());

    stack.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_keep_light_off_during_daytime() {
    let stack = Stack::start(drive(), Daylight).await;

    stack.push(motion(1001)).await;
    tokio::time::sleep(SETTLE * 2).await;

    let snapshot = stack.handle.snapshot().await.unwrap();
    assert!(!snapshot.observed_on);
    assert_eq!(snapshot.writes_issued, 0);
    assert!(!stack.floodlight.is_on());

    stack.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_turn_off_even_when_device_state_lags() {
    let stack = Stack::start(drive().with_state_lag(1), AlwaysOpen).await;

    stack.push(motion(1001)).await;
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert!(stack.floodlight.is_on());
    assert!(!stack.handle.snapshot().await.unwrap().observed_on);

    tokio::time::sleep(LIGHT + SETTLE).await;
    assert!(!stack.floodlight.is_on());
    assert_eq!(stack.floodlight.write_history(), vec![true, false]);

    stack.stop().await;
}

#[tokio::test(start_paused = true)]
async fn should_recover_after_a_failed_write() {
    let stack = Stack::start(drive(), AlwaysOpen).await;
    stack.floodlight.fail_next_writes(1);

    stack.push(motion(1)).await;
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    let snapshot = stack.handle.snapshot().await.unwrap();
    assert!(!snapshot.in_flight);
    assert!(!snapshot.observed_on);

    stack.push(motion(2)).await;
    tokio::time::sleep(SETTLE + Duration::from_secs(1)).await;
    assert!(stack.floodlight.is_on());
    assert!(stack.handle.snapshot().await.unwrap().observed_on);

    stack.stop().await;
}
