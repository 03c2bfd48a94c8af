//! In-process event transport.
//!
//! Events pushed through an [`EventInjector`] are delivered to the registered
//! callbacks from a dedicated OS thread, like a real push client delivering
//! from its own listener thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use motionlight_app::ports::{EventCallback, EventTransport};
use motionlight_domain::error::MotionLightError;
use motionlight_domain::event::MotionEvent;
use tokio::sync::mpsc;

use crate::error::VirtualDeviceError;

enum Delivery {
    Event(Box<MotionEvent>),
    Stop,
}

/// Feeds events into a [`VirtualTransport`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventInjector {
    sender: mpsc::UnboundedSender<Delivery>,
}

impl EventInjector {
    /// Queue `event` for delivery. Events queued before the transport starts
    /// are delivered once it does.
    ///
    /// # Errors
    ///
    /// Returns [`MotionLightError::Transport`] once the transport is dropped.
    pub fn inject(&self, event: MotionEvent) -> Result<(), MotionLightError> {
        self.sender
            .send(Delivery::Event(Box::new(event)))
            .map_err(|_| VirtualDeviceError::TransportClosed.into())
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(event) => f.debug_tuple("Event").field(&event.id).finish(),
            Self::Stop => f.write_str("Stop"),
        }
    }
}

type Receiver = mpsc::UnboundedReceiver<Delivery>;

pub struct VirtualTransport {
    callbacks: Vec<EventCallback>,
    sender: mpsc::UnboundedSender<Delivery>,
    receiver: Option<Receiver>,
    worker: Option<JoinHandle<Receiver>>,
    subscribed: Arc<AtomicBool>,
}

impl Default for VirtualTransport {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            callbacks: Vec::new(),
            sender,
            receiver: Some(receiver),
            worker: None,
            subscribed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl VirtualTransport {
    #[must_use]
    pub fn injector(&self) -> EventInjector {
        EventInjector {
            sender: self.sender.clone(),
        }
    }
}

impl EventTransport for VirtualTransport {
    /// Callbacks registered while the transport runs take effect on the next
    /// start.
    fn add_notification_callback(&mut self, callback: EventCallback) {
        self.callbacks.push(callback);
    }

    async fn start(&mut self) -> Result<(), MotionLightError> {
        if self.worker.is_some() {
            return Ok(());
        }
        let mut receiver = self
            .receiver
            .take()
            .ok_or(VirtualDeviceError::TransportClosed)?;
        let callbacks = self.callbacks.clone();
        let subscribed = Arc::clone(&self.subscribed);

        subscribed.store(true, Ordering::SeqCst);
        let worker = std::thread::Builder::new()
            .name("virtual-transport".to_string())
            .spawn(move || {
                while let Some(delivery) = receiver.blocking_recv() {
                    match delivery {
                        Delivery::Event(event) => {
                            for callback in &callbacks {
                                callback(MotionEvent::clone(&event));
                            }
                        }
                        Delivery::Stop => break,
                    }
                }
                subscribed.store(false, Ordering::SeqCst);
                receiver
            });
        match worker {
            Ok(worker) => {
                self.worker = Some(worker);
                tracing::info!(callbacks = self.callbacks.len(), "virtual transport started");
                Ok(())
            }
            Err(err) => {
                self.subscribed.store(false, Ordering::SeqCst);
                Err(VirtualDeviceError::Spawn(err).into())
            }
        }
    }

    async fn stop(&mut self) -> Result<(), MotionLightError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        self.sender
            .send(Delivery::Stop)
            .map_err(|_| VirtualDeviceError::TransportClosed)?;
        let receiver = tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|_| VirtualDeviceError::WorkerPanicked)?
            .map_err(|_| VirtualDeviceError::WorkerPanicked)?;
        self.receiver = Some(receiver);
        tracing::info!("virtual transport stopped");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.worker.is_some()
    }

    fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }
}

impl Drop for VirtualTransport {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.sender.send(Delivery::Stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::thread::ThreadId;

    use motionlight_domain::id::{DeviceId, EventId};

    use super::*;

    fn motion(id: u64) -> MotionEvent {
        MotionEvent::builder(EventId::from(id), DeviceId::from(1_u64)).build()
    }

    fn recorder() -> (EventCallback, Arc<Mutex<Vec<(EventId, ThreadId)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: EventCallback = Arc::new(move |event: MotionEvent| {
            sink.lock()
                .unwrap()
                .push((event.id, std::thread::current().id()));
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn should_deliver_events_from_its_own_thread_after_start() {
        let mut transport = VirtualTransport::default();
        let (callback, seen) = recorder();
        transport.add_notification_callback(callback);
        let injector = transport.injector();

        injector.inject(motion(1)).unwrap();
        transport.start().await.unwrap();
        injector.inject(motion(2)).unwrap();
        transport.stop().await.unwrap();

        let seen = seen.lock().unwrap();
        let ids: Vec<_> = seen.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec![EventId::from(1_u64), EventId::from(2_u64)]);
        assert!(seen.iter().all(|(_, thread)| *thread != std::thread::current().id()));
    }

    #[tokio::test]
    async fn should_report_status_across_start_and_stop() {
        let mut transport = VirtualTransport::default();
        assert!(!transport.is_started());
        assert!(!transport.is_subscribed());

        transport.start().await.unwrap();
        assert!(transport.is_started());
        assert!(transport.is_subscribed());

        transport.stop().await.unwrap();
        assert!(!transport.is_started());
        assert!(!transport.is_subscribed());
    }

    #[tokio::test]
    async fn should_restart_after_stop() {
        let mut transport = VirtualTransport::default();
        let (callback, seen) = recorder();
        transport.add_notification_callback(callback);

        transport.start().await.unwrap();
        transport.stop().await.unwrap();
        transport.start().await.unwrap();
        transport.injector().inject(motion(3)).unwrap();
        transport.stop().await.unwrap();

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_treat_repeated_start_and_stop_as_no_ops() {
        let mut transport = VirtualTransport::default();
        transport.stop().await.unwrap();
        transport.start().await.unwrap();
        transport.start().await.unwrap();
        transport.stop().await.unwrap();
        transport.stop().await.unwrap();
    }

    #[test]
    fn should_fail_to_inject_once_transport_is_dropped() {
        let transport = VirtualTransport::default();
        let injector = transport.injector();
        drop(transport);
        assert!(matches!(
            injector.inject(motion(1)),
            Err(MotionLightError::Transport(_))
        ));
    }
}
