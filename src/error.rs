//! Error types for exceptional futures.
//!
//! Every failure in this crate is reified into a single [`Error`] value
//! carried inside an exceptional future; there is no separate error channel.
//! Error handling follows these principles:
//!
//! - Errors are explicit and typed (no stringly-typed errors)
//! - A captured panic becomes an [`ErrorKind::Panicked`] error rather than
//!   unwinding through the reactor
//! - User errors can carry an arbitrary source, recoverable through
//!   [`Error::downcast_ref`]

use core::fmt;
use std::any::Any;
use std::sync::Arc;

/// The kind of error carried by an exceptional future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A deadline passed before the awaited operation completed.
    TimedOut,
    /// The write end of a future was dropped without being fulfilled.
    BrokenPromise,
    /// A user callable panicked; the payload is preserved in the context.
    Panicked,
    /// User-provided error.
    User,
}

impl ErrorKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::TimedOut => "operation timed out",
            Self::BrokenPromise => "broken promise",
            Self::Panicked => "callable panicked",
            Self::User => "error",
        }
    }
}

/// The error value held by an exceptional future.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    context: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
            source: None,
        }
    }

    /// Creates a user error with a context message.
    #[must_use]
    pub fn user(ctx: impl Into<String>) -> Self {
        Self::new(ErrorKind::User).with_context(ctx)
    }

    /// Creates an error from a caught panic payload.
    ///
    /// String payloads (the common case for `panic!("...")`) are preserved
    /// as context; anything else is reported as an opaque payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let msg = payload.downcast::<&'static str>().map_or_else(
            |payload| {
                payload
                    .downcast::<String>()
                    .map_or_else(|_| String::from("opaque panic payload"), |s| *s)
            },
            |s| String::from(*s),
        );
        Self::new(ErrorKind::Panicked).with_context(msg)
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns true if this error is a timeout.
    #[must_use]
    pub const fn is_timed_out(&self) -> bool {
        matches!(self.kind, ErrorKind::TimedOut)
    }

    /// Returns the context message, if any.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Adds context text to the error.
    #[must_use]
    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context = Some(ctx.into());
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Attempts to view the source error as a concrete type.
    #[must_use]
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source
            .as_deref()
            .and_then(|s| (s as &dyn std::error::Error).downcast_ref::<E>())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind.as_str())?;
        if let Some(ctx) = &self.context {
            write!(f, ": {ctx}")?;
        }
        if let Some(source) = &self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|s| s as &(dyn std::error::Error + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
    #[error("payload {0}")]
    struct Payload(i32);

    #[test]
    fn kind_is_preserved() {
        let err = Error::new(ErrorKind::TimedOut);
        assert_eq!(err.kind(), ErrorKind::TimedOut);
        assert!(err.is_timed_out());
    }

    #[test]
    fn user_error_carries_context() {
        let err = Error::user("something went sideways");
        assert_eq!(err.kind(), ErrorKind::User);
        assert_eq!(err.context(), Some("something went sideways"));
        assert!(err.to_string().contains("something went sideways"));
    }

    #[test]
    fn downcast_reaches_the_source() {
        let err = Error::new(ErrorKind::User).with_source(Payload(42));
        assert_eq!(err.downcast_ref::<Payload>(), Some(&Payload(42)));
        assert!(err.downcast_ref::<std::fmt::Error>().is_none());
    }

    #[test]
    fn from_panic_preserves_str_payload() {
        let err = Error::from_panic(Box::new("boom"));
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(err.context(), Some("boom"));
    }

    #[test]
    fn from_panic_preserves_string_payload() {
        let err = Error::from_panic(Box::new(String::from("formatted boom")));
        assert_eq!(err.context(), Some("formatted boom"));
    }

    #[test]
    fn from_panic_handles_opaque_payload() {
        let err = Error::from_panic(Box::new(17_u64));
        assert_eq!(err.kind(), ErrorKind::Panicked);
        assert_eq!(err.context(), Some("opaque panic payload"));
    }

    #[test]
    fn display_includes_source() {
        let err = Error::user("fold failed").with_source(Payload(7));
        let rendered = err.to_string();
        assert!(rendered.contains("fold failed"));
        assert!(rendered.contains("payload 7"));
    }

    #[test]
    fn clone_shares_source() {
        let err = Error::new(ErrorKind::User).with_source(Payload(1));
        let clone = err.clone();
        assert_eq!(clone.downcast_ref::<Payload>(), Some(&Payload(1)));
    }
}
