//! Guest exception taxonomy and the error types threaded through the VM.
//!
//! All guest-level failures flow through [`RunError`] and are recoverable by
//! any ancestor frame with a registered handler. Only a true top-level absence
//! of a handler escalates to the host-visible [`UnhandledException`].

use std::fmt::{self, Write};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::value::Value;

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Built-in exception types raised by the interpreter core.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>`
/// implementations. The string representation matches the variant name exactly
/// (e.g. `TypeError` -> "TypeError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum ExcType {
    /// Base exception class - matches any guest exception.
    Exception,
    /// Invocation supplied with fewer (or more) arguments than the signature allows.
    ArgumentError,
    /// Operator or protocol call on an operand of the wrong kind.
    TypeError,
    /// Attribute absent from both the own table and the base chain.
    AttributeError,
    /// Unresolved local or global name.
    NameError,
    /// Out-of-bounds sequence index.
    IndexError,
    /// Missing mapping key.
    KeyError,
    /// Default fallback for any protocol method without an override.
    NotSupportedError,
    /// Integer division or modulo by zero.
    ZeroDivisionError,
    /// Integer arithmetic overflowed the native word.
    OverflowError,
    /// Module path could not be resolved.
    ImportError,
    /// Host-runtime fault surfaced through the native bridge, or an engine
    /// limit (e.g. the call-depth guard) was hit.
    InternalError,
}

impl ExcType {
    /// Checks whether an exception of this type would be caught by a handler
    /// declared for `handler_type`.
    ///
    /// The hierarchy is flat: `Exception` catches everything, all other types
    /// only match exactly.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        self == handler_type || handler_type == Self::Exception
    }

    /// Shorthand for a `TypeError` with a static message.
    pub(crate) fn type_error(msg: impl Into<String>) -> RunError {
        RunError::new(Self::TypeError, msg)
    }

    /// Shorthand for an `AttributeError` naming the missing attribute.
    pub(crate) fn attribute_error(type_name: &str, attr: &str) -> RunError {
        RunError::new(
            Self::AttributeError,
            format!("'{type_name}' value has no attribute '{attr}'"),
        )
    }

    /// Shorthand for a `NotSupportedError` naming the unsupported protocol method.
    pub(crate) fn not_supported(type_name: &str, operation: &str) -> RunError {
        RunError::new(
            Self::NotSupportedError,
            format!("'{type_name}' value does not support {operation}"),
        )
    }
}

/// One frame of a guest stack trace, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// Name of the module the frame was executing in.
    pub module: String,
    /// Function name, or `<module>` for module-level code.
    pub function: String,
    /// Source line of the instruction that was executing.
    pub line: u32,
}

impl fmt::Display for TraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module '{}', line {}, in {}", self.module, self.line, self.function)
    }
}

/// A raised guest exception in flight.
///
/// Carries the exception type and message, the original guest value when the
/// raise supplied an exception instance (so identity survives re-raising),
/// and the trace frames accumulated while unwinding (innermost first).
#[derive(Debug, Clone)]
pub struct ExceptionRaise {
    /// Builtin exception type, used for handler matching and reporting.
    pub exc_type: ExcType,
    /// Human-readable message, also exposed as the `message` attribute.
    pub message: String,
    /// Original guest exception value, if the raise supplied one.
    pub value: Option<Value>,
    /// Declared type name of the raised value (differs from `exc_type` for
    /// user-defined exception classes).
    pub type_name: String,
    /// Stack frames collected during unwinding, innermost first.
    pub trace: Vec<TraceFrame>,
}

/// Error type produced by VM execution.
#[derive(Debug, Clone)]
pub enum RunError {
    /// A guest-level exception, catchable by guest handlers.
    Exc(Box<ExceptionRaise>),
    /// An internal invariant violation. Never catchable; indicates a bug in
    /// the engine or a malformed code unit.
    Internal(String),
}

impl RunError {
    /// Creates a catchable guest exception with no original value.
    pub fn new(exc_type: ExcType, message: impl Into<String>) -> Self {
        Self::Exc(Box::new(ExceptionRaise {
            exc_type,
            message: message.into(),
            value: None,
            type_name: <&'static str>::from(exc_type).to_owned(),
            trace: Vec::new(),
        }))
    }

    /// Creates an uncatchable internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Appends a caller frame to the trace while unwinding.
    pub(crate) fn push_trace_frame(&mut self, frame: TraceFrame) {
        if let Self::Exc(exc) = self {
            exc.trace.push(frame);
        }
    }

    /// Returns the guest exception type, treating internal errors as `InternalError`.
    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        match self {
            Self::Exc(exc) => exc.exc_type,
            Self::Internal(_) => ExcType::InternalError,
        }
    }
}

/// The single point where the core surfaces failure to its embedding host.
///
/// Produced when no guest handler exists anywhere on the call chain. Carries
/// the exception's declared type name, its message, and the full top-to-root
/// stack trace.
#[derive(Debug, Clone)]
pub struct UnhandledException {
    /// Declared type name of the exception value.
    pub type_name: String,
    /// The exception's `message` attribute.
    pub message: String,
    /// Builtin exception type the value maps onto.
    pub exc_type: ExcType,
    /// Stack frames, innermost first.
    pub trace: Vec<TraceFrame>,
}

impl UnhandledException {
    pub(crate) fn from_run_error(error: RunError) -> Self {
        match error {
            RunError::Exc(exc) => Self {
                type_name: exc.type_name,
                message: exc.message,
                exc_type: exc.exc_type,
                trace: exc.trace,
            },
            RunError::Internal(message) => Self {
                type_name: "InternalError".to_owned(),
                message,
                exc_type: ExcType::InternalError,
                trace: Vec::new(),
            },
        }
    }
}

impl fmt::Display for UnhandledException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::from("Traceback (most recent call first):\n");
        for frame in &self.trace {
            let _ = writeln!(out, "  {frame}");
        }
        if self.message.is_empty() {
            write!(f, "{out}{}", self.type_name)
        } else {
            write!(f, "{out}{}: {}", self.type_name, self.message)
        }
    }
}

impl std::error::Error for UnhandledException {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exception_catches_all_subtypes() {
        assert!(ExcType::TypeError.is_subclass_of(ExcType::Exception));
        assert!(ExcType::KeyError.is_subclass_of(ExcType::KeyError));
        assert!(!ExcType::KeyError.is_subclass_of(ExcType::IndexError));
    }

    #[test]
    fn display_matches_variant_name() {
        assert_eq!(ExcType::ZeroDivisionError.to_string(), "ZeroDivisionError");
        let s: &'static str = ExcType::ArgumentError.into();
        assert_eq!(s, "ArgumentError");
    }
}
