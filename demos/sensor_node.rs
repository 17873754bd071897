//! # Example: sensor node
//!
//! Three services under one supervisor, mirroring a small networked sensor:
//!
//! - `ethernet`: simulated link with a watchdog; essential, always restarted.
//!   Every few minutes it reports a hardware error, which ends its watchdog and
//!   exercises the restart path.
//! - `temp`: simulated temperature driver with a watchdog, a health predicate and
//!   stale-data detection; readings are forwarded to `mqtt`.
//! - `mqtt`: plain closure service that "publishes" forwarded readings.
//!
//! Run with:
//! ```bash
//! RUST_LOG=info cargo run --example sensor_node
//! ```
//! Stop with Ctrl-C; the supervisor cancels every service and waits for them.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use initvisor::{
    Deadman, EventClass, EventQueue, LogWriter, RestartPolicy, ServiceDescriptor, ServiceError,
    ServiceEvent, Subscribe, Supervisor, SupervisorConfig, Watchdog, WatchedService,
};

#[derive(Debug)]
enum LinkEvent {
    Started,
    Connected,
    GotIp([u8; 4]),
    HardwareError,
}

impl ServiceEvent for LinkEvent {
    fn class(&self) -> EventClass {
        match self {
            LinkEvent::Started => EventClass::Started,
            LinkEvent::Connected | LinkEvent::GotIp(_) => EventClass::Connected,
            LinkEvent::HardwareError => EventClass::Fatal,
        }
    }

    fn summary(&self) -> String {
        match self {
            LinkEvent::GotIp([a, b, c, d]) => format!("got ip {a}.{b}.{c}.{d}"),
            other => format!("{other:?}"),
        }
    }
}

/// Simulated Ethernet link.
#[derive(Default)]
struct EthernetLink {
    queue: Mutex<Option<EventQueue<LinkEvent>>>,
    running: Arc<AtomicBool>,
    link_up: Arc<AtomicBool>,
}

impl WatchedService for EthernetLink {
    type Event = LinkEvent;

    fn start(&self, ctx: CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("ethernet already running");
            return;
        }
        let (tx, queue) = EventQueue::bounded(10);
        if let Ok(mut slot) = self.queue.lock() {
            *slot = Some(queue);
        }

        let running = Arc::clone(&self.running);
        let link_up = Arc::clone(&self.link_up);
        tokio::spawn(async move {
            let _ = tx.send(LinkEvent::Started).await;
            tokio::time::sleep(Duration::from_millis(300)).await;
            link_up.store(true, Ordering::SeqCst);
            let _ = tx.send(LinkEvent::Connected).await;
            let _ = tx.send(LinkEvent::GotIp([192, 168, 1, 42])).await;

            tokio::select! {
                _ = ctx.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(180)) => {
                    let _ = tx.send(LinkEvent::HardwareError).await;
                    ctx.cancelled().await;
                }
            }
            link_up.store(false, Ordering::SeqCst);
            running.store(false, Ordering::SeqCst);
        });
    }

    fn event_queue(&self) -> Option<EventQueue<LinkEvent>> {
        self.queue.lock().ok()?.clone()
    }

    fn is_healthy(&self) -> Option<bool> {
        Some(self.link_up.load(Ordering::SeqCst))
    }
}

#[derive(Debug)]
struct Reading(f32);

impl ServiceEvent for Reading {
    fn class(&self) -> EventClass {
        EventClass::Data
    }

    fn summary(&self) -> String {
        format!("temperature {:.2}°C", self.0)
    }
}

/// Simulated temperature driver producing one reading every 5 seconds.
#[derive(Default)]
struct TemperatureSensor {
    queue: Mutex<Option<EventQueue<Reading>>>,
    running: Arc<AtomicBool>,
    readings: Arc<AtomicU32>,
}

impl WatchedService for TemperatureSensor {
    type Event = Reading;

    fn start(&self, ctx: CancellationToken) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("temperature sensor already running");
            return;
        }
        let (tx, queue) = EventQueue::bounded(10);
        if let Ok(mut slot) = self.queue.lock() {
            *slot = Some(queue);
        }

        let running = Arc::clone(&self.running);
        let readings = Arc::clone(&self.readings);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_secs(5));
            loop {
                tokio::select! {
                    _ = ctx.cancelled() => break,
                    _ = tick.tick() => {}
                }
                let n = readings.fetch_add(1, Ordering::SeqCst);
                let variation = ((n * 37) % 200) as f32 / 100.0 - 1.0;
                tx.try_send(Reading(25.0 + variation));
            }
            running.store(false, Ordering::SeqCst);
        });
    }

    fn event_queue(&self) -> Option<EventQueue<Reading>> {
        self.queue.lock().ok()?.clone()
    }

    fn message_count(&self) -> Option<u32> {
        Some(self.readings.load(Ordering::SeqCst))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let deadman = Deadman::new(Duration::from_secs(10));
    let (readings_tx, readings_rx) = mpsc::channel::<Reading>(16);
    let readings_rx = Arc::new(tokio::sync::Mutex::new(readings_rx));

    let ethernet = Watchdog::new("ethernet", Arc::new(EthernetLink::default()))
        .with_deadman(deadman.clone());
    let temp = Watchdog::new("temp", Arc::new(TemperatureSensor::default()))
        .with_deadman(deadman.clone())
        .forward_to(readings_tx);

    let descriptors = vec![
        ServiceDescriptor::builder("ethernet")
            .stack_size(12 * 1024)
            .priority(23)
            .restart(RestartPolicy::Always)
            .essential(true)
            .build_from_service(Arc::new(ethernet)),
        ServiceDescriptor::builder("mqtt")
            .stack_size(8 * 1024)
            .priority(20)
            .restart(RestartPolicy::Always)
            .build(move |ctx: CancellationToken| {
                let rx = Arc::clone(&readings_rx);
                async move {
                    let mut rx = rx.lock().await;
                    loop {
                        tokio::select! {
                            _ = ctx.cancelled() => return Ok(()),
                            msg = rx.recv() => match msg {
                                Some(Reading(t)) => tracing::info!(topic = "/sensor/temperature", payload = %format!("{t:.2}"), "published"),
                                None => return Err(ServiceError::Fail { error: "reading channel closed".into() }),
                            },
                        }
                    }
                }
            }),
        ServiceDescriptor::builder("temp")
            .stack_size(4 * 1024)
            .priority(10)
            .restart(RestartPolicy::Always)
            .build_from_service(Arc::new(temp)),
    ];

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
    let sup = Supervisor::builder(SupervisorConfig::default())
        .with_subscribers(subs)
        .with_deadman(deadman)
        .build();

    sup.run(descriptors).await?;
    Ok(())
}
