//! # Tracing subscriber for supervisor events.
//!
//! [`LogWriter`] renders each [`Event`] as one `tracing` record under the
//! `initvisor::events` target, with the event's metadata as structured fields:
//!
//! ```text
//! INFO  initvisor::events: service started service="eth" slot=0 crash_count=0
//! WARN  initvisor::events: service died service="temp" slot=2 crash_count=1 state=DELETED
//! INFO  initvisor::events: restart scheduled service="temp" delay_ms=1000
//! ERROR initvisor::events: essential service failed service="eth" crash_count=4
//! ```

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "initvisor::events";

/// Renders supervisor events through `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    fn message(kind: EventKind) -> &'static str {
        match kind {
            EventKind::SupervisorStarting => "supervisor starting",
            EventKind::BootstrapComplete => "bootstrap complete",
            EventKind::ServiceStarted => "service started",
            EventKind::ServiceRefused => "service refused",
            EventKind::ServiceStartFailed => "service start failed",
            EventKind::ServiceTerminated => "previous task terminated",
            EventKind::ServiceDied => "service died",
            EventKind::BackoffScheduled => "restart scheduled",
            EventKind::ServiceRemoved => "service removed",
            EventKind::EssentialFailure => "essential service failed",
            EventKind::DeadmanExpired => "deadman expired",
            EventKind::ShutdownRequested => "shutdown requested",
            EventKind::AllStoppedWithin => "all services stopped within grace",
            EventKind::GraceExceeded => "shutdown grace exceeded",
            EventKind::SubscriberPanicked => "subscriber panicked",
            EventKind::SubscriberOverflow => "subscriber overflow",
        }
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let msg = Self::message(e.kind);
        let service = e.service.as_deref();
        let state = e.state.map(|s| s.as_str());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::ServiceRefused
            | EventKind::ServiceStartFailed
            | EventKind::EssentialFailure
            | EventKind::SubscriberPanicked => {
                error!(target: TARGET, seq = e.seq, service, slot = e.slot, crash_count = e.crash_count, reason, "{msg}");
            }
            EventKind::ServiceDied
            | EventKind::ServiceTerminated
            | EventKind::DeadmanExpired
            | EventKind::GraceExceeded
            | EventKind::SubscriberOverflow => {
                warn!(target: TARGET, seq = e.seq, service, slot = e.slot, crash_count = e.crash_count, state, reason, "{msg}");
            }
            _ => {
                info!(target: TARGET, seq = e.seq, service, slot = e.slot, crash_count = e.crash_count, delay_ms = e.delay_ms, reason, "{msg}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }

    fn queue_capacity(&self) -> usize {
        1024
    }
}
