use std::fmt;

/// Coarse classification of a service event, used to pick a log level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// Link or session established.
    Connected,
    /// Link or session lost.
    Disconnected,
    /// Driver or client started.
    Started,
    /// Driver or client stopped.
    Stopped,
    /// Payload traffic (readings, messages).
    Data,
    /// Recoverable error reported by the service.
    Error,
    /// Unrecoverable error; the watchdog exits and the restart policy takes over.
    Fatal,
    /// Anything else.
    Other,
}

impl EventClass {
    /// Lower-case name for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            EventClass::Connected => "connected",
            EventClass::Disconnected => "disconnected",
            EventClass::Started => "started",
            EventClass::Stopped => "stopped",
            EventClass::Data => "data",
            EventClass::Error => "error",
            EventClass::Fatal => "fatal",
            EventClass::Other => "other",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted by a watched service body.
pub trait ServiceEvent: fmt::Debug + Send + 'static {
    /// Classification of this event.
    fn class(&self) -> EventClass;

    /// One-line description for logs.
    fn summary(&self) -> String {
        format!("{self:?}")
    }
}
