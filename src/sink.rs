//! Logging sinks. Stand in for the two logger parameters of
//! [`crate::scheduler::Scheduler::new`] — one for job/dispatch errors, one
//! for informational start/stop chatter.

/// A destination for a single log line. Implementations must be safe for
/// concurrent use: job workers and the dispatcher may log at the same time.
pub trait Sink: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards to `tracing`. Use [`TracingSink::info`] for the informational
/// role and [`TracingSink::error`] for the error role.
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    pub fn info() -> Self {
        TracingSink {
            level: tracing::Level::INFO,
        }
    }

    pub fn error() -> Self {
        TracingSink {
            level: tracing::Level::ERROR,
        }
    }
}

impl Sink for TracingSink {
    fn log(&self, message: &str) {
        match self.level {
            tracing::Level::ERROR => tracing::error!(target: "schedulus", "{message}"),
            _ => tracing::info!(target: "schedulus", "{message}"),
        }
    }
}

/// Discards everything. Useful for tests and callers with no interest in
/// scheduler chatter.
pub struct NullSink;

impl Sink for NullSink {
    fn log(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_anything() {
        let sink = NullSink;
        sink.log("this goes nowhere");
    }
}
