//! Test helpers: capture `tracing` records emitted by the crate.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::{Dispatch, Level};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;

/// One captured record.
#[derive(Clone, Debug)]
pub(crate) struct Record {
    pub level: Level,
    pub target: String,
    pub message: String,
}

/// Layer that keeps every record it sees.
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    records: Arc<Mutex<Vec<Record>>>,
}

impl LogCapture {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Dispatcher that feeds this capture; use with `WithSubscriber::with_subscriber`.
    pub(crate) fn dispatch(&self) -> Dispatch {
        Dispatch::new(tracing_subscriber::registry().with(self.clone()))
    }

    /// Number of records at `level` whose message contains `needle`.
    pub(crate) fn count(&self, level: Level, needle: &str) -> usize {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.level == level && r.message.contains(needle))
            .count()
    }

    pub(crate) fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl<S: tracing::Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.records.lock().unwrap().push(Record {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            message: visitor.0,
        });
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}
