use std::fmt;

/// Severity of a transient user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

/// Notice
///
/// A short message shown to the user and then forgotten. Every recoverable
/// failure in the client degrades to one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message.into())
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        tracing::warn!(notice = %message, "User-facing error");
        Self::new(Level::Error, message)
    }

    fn new(level: Level, message: String) -> Self {
        Self { level, message }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            Level::Info => "info",
            Level::Success => "ok",
            Level::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}
