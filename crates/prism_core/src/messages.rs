//! Structured Message Channel
//!
//! Warnings and diagnostics produced while translating a scene are delivered
//! as [`Message`]s carrying a severity, the originating subsystem and the
//! text. A [`MessageHandler`] always forwards to the `log` facade and may
//! additionally forward every message over a `flume` channel so the host can
//! display (or test) them.

use std::fmt;

/// Message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub fn level(self) -> log::Level {
        match self {
            Self::Debug => log::Level::Debug,
            Self::Info => log::Level::Info,
            Self::Warning => log::Level::Warn,
            Self::Error => log::Level::Error,
        }
    }
}

/// A single diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    /// Originating subsystem, e.g. `prism::AttributesBundle`.
    pub context: String,
    pub text: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} : {} : {}", self.severity, self.context, self.text)
    }
}

/// Delivers [`Message`]s to `log` and, optionally, to a channel.
///
/// Cheap to clone; clones share the same channel.
#[derive(Debug, Clone, Default)]
pub struct MessageHandler {
    sender: Option<flume::Sender<Message>>,
}

impl MessageHandler {
    /// A handler that only logs.
    #[must_use]
    pub fn new() -> Self {
        Self { sender: None }
    }

    /// A handler that logs and forwards to the returned receiver.
    #[must_use]
    pub fn with_channel() -> (Self, flume::Receiver<Message>) {
        let (tx, rx) = flume::unbounded();
        (Self { sender: Some(tx) }, rx)
    }

    #[must_use]
    pub fn from_sender(sender: flume::Sender<Message>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn emit(&self, severity: Severity, context: &str, text: impl Into<String>) {
        let text = text.into();
        log::log!(target: "prism", severity.level(), "{context} : {text}");

        if let Some(sender) = &self.sender {
            // A disconnected receiver still leaves the log record above.
            let _ = sender.send(Message {
                severity,
                context: context.to_string(),
                text,
            });
        }
    }

    #[inline]
    pub fn debug(&self, context: &str, text: impl Into<String>) {
        self.emit(Severity::Debug, context, text);
    }

    #[inline]
    pub fn info(&self, context: &str, text: impl Into<String>) {
        self.emit(Severity::Info, context, text);
    }

    #[inline]
    pub fn warning(&self, context: &str, text: impl Into<String>) {
        self.emit(Severity::Warning, context, text);
    }

    #[inline]
    pub fn error(&self, context: &str, text: impl Into<String>) {
        self.emit(Severity::Error, context, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_receives_messages() {
        let (handler, rx) = MessageHandler::with_channel();
        handler.warning("prism::Test", "something odd");
        let msg = rx.try_recv().unwrap();
        assert_eq!(msg.severity, Severity::Warning);
        assert_eq!(msg.context, "prism::Test");
        assert_eq!(msg.text, "something odd");
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (handler, rx) = MessageHandler::with_channel();
        drop(rx);
        handler.error("prism::Test", "still logged");
    }
}
