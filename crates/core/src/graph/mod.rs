//! Capability interface to the media-processing graph engine.
//!
//! The media state machine never looks inside a graph. It only needs a
//! handful of operations, all of which may complete asynchronously:
//!
//! | Operation | Returns | Used by |
//! |-----------|---------|---------|
//! | [`activate`](MediaGraph::activate) | [`Completion`] | `Media::prepare` |
//! | [`deactivate`](MediaGraph::deactivate) | [`Completion`] | `Media::unprepare`, prepare rollback |
//! | [`output_ports`](MediaGraph::output_ports) | ordered ports | stream discovery |
//! | [`seek_to`](MediaGraph::seek_to) | [`Completion`] | `Media::seek` |
//! | [`intrinsic_extent`](MediaGraph::intrinsic_extent) | [`TimeRange`] | initial range |
//!
//! A [`GraphBuilder`] turns a launch description into a graph. The crate
//! ships [`LaunchBuilder`], a simulated engine for gst-launch-style
//! descriptions; production engines plug in through the same traits.

pub mod completion;
pub mod elements;
pub mod launch;
pub mod pipeline;

use std::fmt;
use std::time::Duration;

use crate::error::Result;
use crate::range::TimeRange;

pub use completion::{Completer, Completion};
pub use pipeline::{LaunchBuilder, Pipeline};

/// Kind of elementary signal carried by an output port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Application,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Application => write!(f, "application"),
        }
    }
}

/// An output of an activated graph, as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortDescriptor {
    /// Engine-side name of the port (e.g. `pay0`).
    pub name: String,
    pub kind: MediaKind,
    /// RTP payload type (RFC 3551). Dynamic types use 96–127.
    pub payload_type: u8,
    /// Encoding name for `a=rtpmap` (e.g. `H264`, `RAW`, `L16`).
    pub encoding_name: String,
    /// RTP clock rate in Hz.
    pub clock_rate: u32,
    /// Audio channel count, when relevant.
    pub channels: Option<u32>,
}

/// A media-processing graph owned by a single media unit.
///
/// Methods returning [`Completion`] must not block; they start the work and
/// resolve the completion when the graph reaches a terminal outcome.
pub trait MediaGraph: Send {
    /// Bring the graph to its running state.
    fn activate(&mut self) -> Completion;

    /// Tear the graph back down to its idle state.
    fn deactivate(&mut self) -> Completion;

    /// Output ports in a stable, deterministic order.
    fn output_ports(&self) -> Vec<PortDescriptor>;

    /// Reposition playback to `position`, optionally stopping at `stop`.
    fn seek_to(&mut self, position: Duration, stop: Option<Duration>) -> Completion;

    /// Playable extent of the source. Sources without a known duration
    /// report `npt=0-`.
    fn intrinsic_extent(&self) -> TimeRange {
        TimeRange::default()
    }
}

/// Materializes launch descriptions into graphs.
pub trait GraphBuilder: Send + Sync {
    /// Build a graph, failing with [`MediaError::GraphBuild`](crate::MediaError::GraphBuild)
    /// if the description is malformed or names unknown elements.
    fn build(&self, description: &str) -> Result<Box<dyn MediaGraph>>;
}
