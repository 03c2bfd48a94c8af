//! Light controller — the only writer of one floodlight's light.
//!
//! Every request funnels through a bounded mailbox into a single task that
//! owns the actuator state, the armed timer and the in-flight hardware call.
//! The task keeps reading its mailbox while a hardware call is suspended, so
//! a request arriving mid-write sees `in_flight` and is dropped instead of
//! overlapping the write.
//!
//! ```text
//!            request_on(true)              settle + read-back
//!   Idle ───────────────────────▶ TurningOn ──────────────────▶ On ──┐
//!    ▲                                                           │   │ request_on(true)
//!    │ read-back off                       auto-off elapsed      │   │ re-arms auto-off
//!    └──────────────── TurningOff ◀──────────────────────────────┘ ◀─┘
//!                        │    ▲
//!        read-back on    ▼    │ recheck elapsed
//!                  OffPendingRecheck
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use motionlight_domain::device::Capability;
use motionlight_domain::error::{MotionLightError, ValidationError};
use motionlight_domain::gate::AdmissionGate;
use motionlight_domain::time;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Sleep};
use tracing::Instrument;

use crate::event_router::LightRequests;
use crate::ports::LightDevice;

pub const DEFAULT_LIGHT_DURATION: Duration = Duration::from_secs(30);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_RECHECK_DELAY: Duration = Duration::from_secs(10);
pub const DEFAULT_MAILBOX_CAPACITY: usize = 64;

/// Timing and sizing knobs of a [`LightController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerConfig {
    /// How long the light stays on after the last motion.
    pub light_duration: Duration,
    /// Wait between a write and its read-back; the remote state lags commands.
    pub settle_delay: Duration,
    /// Delay before re-issuing a turn-off whose read-back still showed on.
    pub recheck_delay: Duration,
    pub mailbox_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            light_duration: DEFAULT_LIGHT_DURATION,
            settle_delay: DEFAULT_SETTLE_DELAY,
            recheck_delay: DEFAULT_RECHECK_DELAY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl ControllerConfig {
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] when the light duration, the
    /// recheck delay or the mailbox capacity is zero.
    pub fn validate(&self) -> Result<(), MotionLightError> {
        if self.light_duration.is_zero() {
            return Err(ValidationError::NotPositive {
                field: "light_duration",
            }
            .into());
        }
        if self.recheck_delay.is_zero() {
            return Err(ValidationError::NotPositive {
                field: "recheck_delay",
            }
            .into());
        }
        if self.mailbox_capacity == 0 {
            return Err(ValidationError::NotPositive {
                field: "mailbox_capacity",
            }
            .into());
        }
        Ok(())
    }
}

/// What the controller did with one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestDisposition {
    /// Turn-on refused by the admission gate.
    Refused,
    /// A timer was pending; it was replaced by a fresh auto-off timer.
    Extended,
    /// A hardware call was in flight; the request was dropped.
    Dropped,
    /// The light already is in the requested state.
    AlreadyInState,
    /// A hardware write was started.
    Issued,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Turns the light off once the light duration has elapsed.
    AutoOff,
    /// Re-issues a turn-off whose read-back still showed the light on.
    Recheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub kind: TimerKind,
    pub deadline: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightPhase {
    Idle,
    TurningOn,
    On,
    TurningOff,
    OffPendingRecheck,
}

/// Point-in-time copy of a controller's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorSnapshot {
    pub desired_on: bool,
    /// Last read-back; stale between a write and its read-back.
    pub observed_on: bool,
    pub in_flight: bool,
    pub pending_timer: Option<PendingTimer>,
    /// Hardware writes started since the controller was spawned.
    pub writes_issued: u64,
}

impl ActuatorSnapshot {
    #[must_use]
    pub fn phase(&self) -> LightPhase {
        if self.in_flight {
            return if self.desired_on {
                LightPhase::TurningOn
            } else {
                LightPhase::TurningOff
            };
        }
        match self.pending_timer {
            Some(PendingTimer {
                kind: TimerKind::Recheck,
                ..
            }) => LightPhase::OffPendingRecheck,
            _ if self.observed_on => LightPhase::On,
            _ => LightPhase::Idle,
        }
    }
}

#[derive(Debug)]
enum Command {
    Request {
        enable: bool,
        duration: Option<Duration>,
        reply: Option<oneshot::Sender<RequestDisposition>>,
    },
    Snapshot(oneshot::Sender<ActuatorSnapshot>),
    Shutdown,
}

/// Cloneable, thread-safe handle to a running [`LightController`].
#[derive(Debug, Clone)]
pub struct LightControllerHandle {
    sender: mpsc::Sender<Command>,
    device_name: Arc<str>,
}

impl LightControllerHandle {
    /// Enqueue a request without waiting. Callable from any thread, inside or
    /// outside the runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::MailboxFull`] when the mailbox is full and
    /// [`MotionLightError::ControllerUnavailable`] when the controller is gone.
    pub fn request_on(
        &self,
        enable: bool,
        duration: Option<Duration>,
    ) -> Result<(), MotionLightError> {
        self.sender
            .try_send(Command::Request {
                enable,
                duration,
                reply: None,
            })
            .map_err(|err| match err {
                TrySendError::Full(_) => MotionLightError::MailboxFull,
                TrySendError::Closed(_) => MotionLightError::ControllerUnavailable,
            })
    }

    /// Submit a request and wait until the controller has decided on it.
    ///
    /// Returns as soon as the decision is made; an issued write is still in
    /// flight when this resolves.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::ControllerUnavailable`] when the controller
    /// is gone.
    pub async fn request_on_confirmed(
        &self,
        enable: bool,
        duration: Option<Duration>,
    ) -> Result<RequestDisposition, MotionLightError> {
        let (reply, disposition) = oneshot::channel();
        self.sender
            .send(Command::Request {
                enable,
                duration,
                reply: Some(reply),
            })
            .await
            .map_err(|_| MotionLightError::ControllerUnavailable)?;
        disposition
            .await
            .map_err(|_| MotionLightError::ControllerUnavailable)
    }

    /// # Errors
    ///
    /// Returns [`MotionLightError::ControllerUnavailable`] when the controller
    /// is gone.
    pub async fn snapshot(&self) -> Result<ActuatorSnapshot, MotionLightError> {
        let (reply, snapshot) = oneshot::channel();
        self.sender
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| MotionLightError::ControllerUnavailable)?;
        snapshot
            .await
            .map_err(|_| MotionLightError::ControllerUnavailable)
    }
}

impl LightRequests for LightControllerHandle {
    fn request_on(&self, enable: bool, duration: Option<Duration>) -> Result<(), MotionLightError> {
        LightControllerHandle::request_on(self, enable, duration)
    }
}

/// A running controller bound to one device.
#[derive(Debug)]
pub struct LightController {
    handle: LightControllerHandle,
    task: JoinHandle<()>,
}

impl LightController {
    /// Read the device's current light state and spawn the owning task.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Validation`] for an invalid `config`,
    /// [`MotionLightError::MissingCapability`] when the device has no light,
    /// or the hardware error raised by the initial state read.
    pub async fn spawn<D, G>(
        device: D,
        gate: G,
        config: ControllerConfig,
    ) -> Result<Self, MotionLightError>
    where
        D: LightDevice,
        G: AdmissionGate + 'static,
    {
        config.validate()?;
        if !device.has_capability(Capability::Light) {
            return Err(MotionLightError::MissingCapability {
                device: device.name().to_string(),
                capability: Capability::Light,
            });
        }
        let observed_on = device.light_state().await?;
        let device_name: Arc<str> = Arc::from(device.name());

        let (sender, inbox) = mpsc::channel(config.mailbox_capacity);
        let span = tracing::info_span!("light_controller", device = %device_name);
        let task = ControllerTask {
            device: Arc::new(device),
            gate,
            config,
            inbox,
            desired_on: observed_on,
            observed_on,
            timer: None,
            write: None,
            writes_issued: 0,
        };
        let task = tokio::spawn(task.run().instrument(span));

        Ok(Self {
            handle: LightControllerHandle {
                sender,
                device_name,
            },
            task,
        })
    }

    #[must_use]
    pub fn handle(&self) -> LightControllerHandle {
        self.handle.clone()
    }

    /// Stop the owning task. Pending timers are cancelled; a hardware call
    /// still in flight is abandoned.
    pub async fn shutdown(self) {
        if self.handle.sender.send(Command::Shutdown).await.is_err() {
            tracing::debug!(device = %self.handle.device_name, "light controller already stopped");
        }
        if let Err(err) = self.task.await {
            tracing::error!(device = %self.handle.device_name, error = %err, "light controller task failed");
        }
    }
}

type WriteFuture = Pin<Box<dyn Future<Output = Result<bool, MotionLightError>> + Send>>;

struct ArmedTimer {
    kind: TimerKind,
    deadline: Instant,
    sleep: Pin<Box<Sleep>>,
}

struct PendingWrite {
    enable: bool,
    duration: Duration,
    future: WriteFuture,
}

enum Wake {
    Command(Option<Command>),
    Settled {
        enable: bool,
        duration: Duration,
        outcome: Result<bool, MotionLightError>,
    },
    Elapsed(TimerKind),
}

struct ControllerTask<D, G> {
    device: Arc<D>,
    gate: G,
    config: ControllerConfig,
    inbox: mpsc::Receiver<Command>,
    desired_on: bool,
    observed_on: bool,
    timer: Option<ArmedTimer>,
    write: Option<PendingWrite>,
    writes_issued: u64,
}

impl<D: LightDevice, G: AdmissionGate> ControllerTask<D, G> {
    async fn run(mut self) {
        tracing::info!(observed_on = self.observed_on, "light controller started");
        loop {
            let wake = tokio::select! {
                biased;
                command = self.inbox.recv() => Wake::Command(command),
                (enable, duration, outcome) = settled(&mut self.write) => Wake::Settled {
                    enable,
                    duration,
                    outcome,
                },
                kind = elapsed(&mut self.timer) => Wake::Elapsed(kind),
            };
            match wake {
                Wake::Command(Some(Command::Request {
                    enable,
                    duration,
                    reply,
                })) => {
                    let disposition = self.request(enable, duration);
                    if let Some(reply) = reply {
                        let _ = reply.send(disposition);
                    }
                }
                Wake::Command(Some(Command::Snapshot(reply))) => {
                    let _ = reply.send(self.snapshot());
                }
                Wake::Command(Some(Command::Shutdown) | None) => break,
                Wake::Settled {
                    enable,
                    duration,
                    outcome,
                } => {
                    self.write = None;
                    self.on_write_settled(enable, duration, outcome);
                }
                Wake::Elapsed(kind) => {
                    self.timer = None;
                    self.on_timer_elapsed(kind);
                }
            }
        }
        if let Some(write) = self.write.take() {
            tracing::warn!(
                desired_on = write.enable,
                "light controller stopped with a hardware call in flight"
            );
        }
        if let Some(timer) = self.timer.take() {
            tracing::debug!(kind = ?timer.kind, "pending timer cancelled on shutdown");
        }
        tracing::info!(observed_on = self.observed_on, "light controller stopped");
    }

    fn request(&mut self, enable: bool, duration: Option<Duration>) -> RequestDisposition {
        let duration = duration.unwrap_or(self.config.light_duration);

        if enable && !self.gate.admits(time::now()) {
            tracing::info!(gate = %self.gate.describe(), "turn-on refused by admission gate");
            return RequestDisposition::Refused;
        }
        if enable && self.timer.is_some() {
            tracing::debug!(
                duration_secs = duration.as_secs(),
                "cancelling pending timer and re-arming auto-off"
            );
            self.arm(TimerKind::AutoOff, duration);
            return RequestDisposition::Extended;
        }
        if let Some(write) = &self.write {
            tracing::debug!(
                requested_on = enable,
                in_flight_on = write.enable,
                "hardware call in flight, dropping request"
            );
            return RequestDisposition::Dropped;
        }
        if enable && self.observed_on && !self.desired_on {
            // the last turn-off failed; the light is on with nothing to end it
            tracing::info!(
                duration_secs = duration.as_secs(),
                "light left on by a failed turn-off, re-arming auto-off"
            );
            self.desired_on = true;
            self.arm(TimerKind::AutoOff, duration);
            return RequestDisposition::AlreadyInState;
        }
        if enable == self.observed_on {
            tracing::warn!(
                requested_on = enable,
                observed_on = self.observed_on,
                "light is already in that state"
            );
            return RequestDisposition::AlreadyInState;
        }

        if let Some(timer) = self.timer.take() {
            tracing::debug!(kind = ?timer.kind, "turn-off cancels pending timer");
        }
        self.begin_write(enable, duration);
        RequestDisposition::Issued
    }

    fn on_timer_elapsed(&mut self, kind: TimerKind) {
        tracing::info!(?kind, "timer elapsed, turning light off");
        // A stale read-back after turning on leaves observed_on false while
        // the light may well be on; the auto-off must not be skipped then.
        if kind == TimerKind::AutoOff
            && self.desired_on
            && !self.observed_on
            && self.write.is_none()
        {
            tracing::warn!(
                desired_on = self.desired_on,
                observed_on = self.observed_on,
                "turn-on was never confirmed, forcing turn-off"
            );
            self.begin_write(false, self.config.light_duration);
            return;
        }
        self.request(false, None);
    }

    fn begin_write(&mut self, enable: bool, duration: Duration) {
        self.desired_on = enable;
        self.writes_issued += 1;
        self.write = Some(PendingWrite {
            enable,
            duration,
            future: Box::pin(write_and_read_back(
                Arc::clone(&self.device),
                enable,
                self.config.settle_delay,
            )),
        });
    }

    fn on_write_settled(
        &mut self,
        enable: bool,
        duration: Duration,
        outcome: Result<bool, MotionLightError>,
    ) {
        let observed_on = match outcome {
            Ok(observed_on) => observed_on,
            Err(err) => {
                tracing::error!(
                    desired_on = enable,
                    observed_on = self.observed_on,
                    error = %err,
                    "light write failed"
                );
                return;
            }
        };
        self.observed_on = observed_on;
        tracing::info!(requested_on = enable, observed_on, "light write settled");

        if !enable && observed_on {
            tracing::warn!(
                recheck_secs = self.config.recheck_delay.as_secs(),
                "light still on after turn-off, scheduling corrective recheck"
            );
            self.arm(TimerKind::Recheck, self.config.recheck_delay);
        }
        if enable {
            self.arm(TimerKind::AutoOff, duration);
        }
    }

    fn arm(&mut self, kind: TimerKind, after: Duration) {
        if let Some(previous) = self.timer.take() {
            tracing::debug!(kind = ?previous.kind, "cancelled pending timer");
        }
        let deadline = Instant::now() + after;
        tracing::info!(?kind, after_secs = after.as_secs(), "timer armed");
        self.timer = Some(ArmedTimer {
            kind,
            deadline,
            sleep: Box::pin(tokio::time::sleep_until(deadline)),
        });
    }

    fn snapshot(&self) -> ActuatorSnapshot {
        ActuatorSnapshot {
            desired_on: self.desired_on,
            observed_on: self.observed_on,
            in_flight: self.write.is_some(),
            pending_timer: self.timer.as_ref().map(|timer| PendingTimer {
                kind: timer.kind,
                deadline: timer.deadline,
            }),
            writes_issued: self.writes_issued,
        }
    }
}

async fn settled(
    write: &mut Option<PendingWrite>,
) -> (bool, Duration, Result<bool, MotionLightError>) {
    match write {
        Some(pending) => {
            let outcome = pending.future.as_mut().await;
            (pending.enable, pending.duration, outcome)
        }
        None => std::future::pending().await,
    }
}

async fn elapsed(timer: &mut Option<ArmedTimer>) -> TimerKind {
    match timer {
        Some(armed) => {
            armed.sleep.as_mut().await;
            armed.kind
        }
        None => std::future::pending().await,
    }
}

/// Command the light, wait for the remote state to settle, then read it back.
///
/// A failed read-back after a successful write assumes the commanded state.
async fn write_and_read_back<D: LightDevice>(
    device: Arc<D>,
    enable: bool,
    settle_delay: Duration,
) -> Result<bool, MotionLightError> {
    device.set_light(enable).await?;
    tokio::time::sleep(settle_delay).await;
    match device.light_state().await {
        Ok(observed_on) => Ok(observed_on),
        Err(err) => {
            tracing::warn!(
                error = %err,
                assumed_on = enable,
                "light read-back failed, assuming commanded state"
            );
            Ok(enable)
        }
    }
}
