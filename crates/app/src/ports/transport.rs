//! Push-notification transport port.

use std::future::Future;
use std::sync::Arc;

use motionlight_domain::error::MotionLightError;
use motionlight_domain::event::MotionEvent;

/// Invoked once per delivered notification, on whatever thread the
/// transport delivers from.
pub type EventCallback = Arc<dyn Fn(MotionEvent) + Send + Sync>;

/// Source of push notifications from the remote service.
pub trait EventTransport: Send {
    /// Register a callback. Every registered callback sees every event.
    fn add_notification_callback(&mut self, callback: EventCallback);

    /// Connect and subscribe.
    fn start(&mut self) -> impl Future<Output = Result<(), MotionLightError>> + Send;

    /// Unsubscribe and disconnect. Stopping a stopped transport is a no-op.
    fn stop(&mut self) -> impl Future<Output = Result<(), MotionLightError>> + Send;

    fn is_started(&self) -> bool;

    fn is_subscribed(&self) -> bool;
}
