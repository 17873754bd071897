use tokio_util::sync::CancellationToken;

use super::event::ServiceEvent;
use super::queue::EventQueue;

/// A service whose body runs independently and reports through an event queue.
///
/// Network links, protocol clients and sensor drivers implement this; a
/// [`Watchdog`](crate::Watchdog) starts the body and consumes its events.
pub trait WatchedService: Send + Sync + 'static {
    /// Event type of the body.
    type Event: ServiceEvent;

    /// Starts the body. The body stops when `ctx` is cancelled.
    ///
    /// Calling it while the body is running should log a warning and do nothing.
    fn start(&self, ctx: CancellationToken);

    /// Event queue of the running body, once it exists.
    fn event_queue(&self) -> Option<EventQueue<Self::Event>>;

    /// Service-specific health predicate; `None` if the service has none.
    fn is_healthy(&self) -> Option<bool> {
        None
    }

    /// Monotonic count of payload messages (readings, received messages), if tracked.
    fn message_count(&self) -> Option<u32> {
        None
    }
}
