//! Error types for the media session core.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while constructing, preparing or seeking media.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Factory**: [`GraphBuild`](Self::GraphBuild): the launch description
///   could not be turned into a processing graph.
/// - **State machine**: [`InvalidState`](Self::InvalidState): operation not
///   allowed in the current media state.
/// - **Engine**: [`Timeout`](Self::Timeout),
///   [`TransitionFailed`](Self::TransitionFailed): the graph did not reach
///   the requested state.
/// - **Streams**: [`IndexOutOfRange`](Self::IndexOutOfRange).
/// - **Ranges**: [`MalformedRange`](Self::MalformedRange).
///
/// None of these are fatal to the process. A failed `construct` leaves the
/// factory usable, and a failed transition leaves the media in a defined state.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// The launch description could not be materialized into a graph.
    #[error("failed to build graph: {kind}")]
    GraphBuild { kind: GraphBuildErrorKind },

    /// The operation is not permitted in the media's current state.
    #[error("{operation} not allowed while {state}")]
    InvalidState {
        operation: Operation,
        state: &'static str,
    },

    /// Stream index past the number of discovered streams.
    #[error("stream index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// Range text could not be parsed.
    #[error("malformed range: {kind}")]
    MalformedRange { kind: RangeErrorKind },

    /// The graph did not confirm the operation within the transition timeout.
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: Operation,
        timeout: Duration,
    },

    /// The graph reported that the operation failed.
    #[error("{operation} failed in the processing graph")]
    TransitionFailed { operation: Operation },
}

/// Operation named in state and engine errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    SetLaunch,
    Prepare,
    Unprepare,
    Seek,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetLaunch => write!(f, "set_launch"),
            Self::Prepare => write!(f, "prepare"),
            Self::Unprepare => write!(f, "unprepare"),
            Self::Seek => write!(f, "seek"),
        }
    }
}

/// Specific kind of graph build failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphBuildErrorKind {
    /// No launch description was set on the factory.
    NoLaunch,
    /// The description contained no elements.
    Empty,
    /// Structural error: unbalanced parentheses, dangling `!`, stray property.
    Syntax(String),
    /// An element name is not known to the graph builder.
    UnknownElement(String),
    /// A property value could not be interpreted.
    InvalidProperty { element: String, property: String },
    /// An element named `payN` is not a payloader.
    NotAPayloader(String),
    /// No payloader named `pay0`, so the graph would produce no streams.
    NoStreams,
}

impl fmt::Display for GraphBuildErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoLaunch => write!(f, "no launch description set"),
            Self::Empty => write!(f, "empty description"),
            Self::Syntax(detail) => write!(f, "syntax error: {detail}"),
            Self::UnknownElement(name) => write!(f, "no element \"{name}\""),
            Self::InvalidProperty { element, property } => {
                write!(f, "invalid value for property \"{property}\" on {element}")
            }
            Self::NotAPayloader(name) => write!(f, "element \"{name}\" is not a payloader"),
            Self::NoStreams => write!(f, "no payloader named pay0"),
        }
    }
}

/// Specific kind of range parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangeErrorKind {
    /// Input did not have the `unit=` prefix.
    MissingUnit,
    /// The unit name is not supported.
    UnknownUnit(String),
    /// No `-` separating start and stop.
    MissingSeparator,
    /// A time value could not be parsed.
    InvalidTime(String),
    /// Stop lies before start.
    Inverted,
}

impl fmt::Display for RangeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingUnit => write!(f, "missing unit"),
            Self::UnknownUnit(unit) => write!(f, "unknown unit \"{unit}\""),
            Self::MissingSeparator => write!(f, "missing range separator"),
            Self::InvalidTime(time) => write!(f, "invalid time \"{time}\""),
            Self::Inverted => write!(f, "stop before start"),
        }
    }
}

impl MediaError {
    pub(crate) fn graph(kind: GraphBuildErrorKind) -> Self {
        Self::GraphBuild { kind }
    }

    pub(crate) fn range(kind: RangeErrorKind) -> Self {
        Self::MalformedRange { kind }
    }
}

/// Convenience alias for `Result<T, MediaError>`.
pub type Result<T> = std::result::Result<T, MediaError>;
