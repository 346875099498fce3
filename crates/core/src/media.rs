//! The media unit and its prepare/unprepare state machine.
//!
//! ## Lifecycle
//!
//! ```text
//! construct   -> Unprepared
//! prepare     -> Prepared               (graph activated, streams discovered)
//! seek        -> Prepared               (range updated)
//! unprepare   -> Unprepared             (reusable media)
//! unprepare   -> Unprepared, exhausted  (single-use media; prepare fails from now on)
//! ```
//!
//! Every transition holds the media's lock from start to finish and blocks
//! until the graph confirms, fails, or the transition timeout elapses.
//! Concurrent callers wait their turn; nobody observes a half-activated
//! graph. A prepare that fails or times out rolls the graph back and leaves
//! the media unprepared with no streams.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::DEFAULT_TRANSITION_TIMEOUT;
use crate::error::{MediaError, Operation, Result};
use crate::graph::{Completion, MediaGraph};
use crate::range::{RangeStart, RangeUnit, TimeRange};
use crate::stream::Stream;

/// Externally visible media state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaState {
    Unprepared,
    Prepared,
}

struct Inner {
    state: MediaState,
    /// Set when single-use media completes its prepare/unprepare cycle.
    exhausted: bool,
    reusable: bool,
    graph: Box<dyn MediaGraph>,
    /// Rebuilt on each prepare; empty iff unprepared.
    streams: Vec<Stream>,
    /// Current playable range; `Some` iff prepared.
    range: Option<TimeRange>,
    /// Start of the graph's intrinsic extent, the origin of relative ranges.
    origin: Duration,
    timeout: Duration,
}

impl Inner {
    fn state_name(&self) -> &'static str {
        match (self.state, self.exhausted) {
            (MediaState::Prepared, _) => "prepared",
            (MediaState::Unprepared, true) => "exhausted",
            (MediaState::Unprepared, false) => "unprepared",
        }
    }

    fn invalid(&self, operation: Operation) -> MediaError {
        MediaError::InvalidState {
            operation,
            state: self.state_name(),
        }
    }

    /// Wait for a graph operation and map its outcome.
    fn await_graph(&self, completion: Completion, operation: Operation) -> Result<()> {
        match completion.wait(self.timeout) {
            Some(true) => Ok(()),
            Some(false) => Err(MediaError::TransitionFailed { operation }),
            None => Err(MediaError::Timeout {
                operation,
                timeout: self.timeout,
            }),
        }
    }

    fn clear(&mut self) {
        self.streams.clear();
        self.range = None;
        self.origin = Duration::ZERO;
        self.state = MediaState::Unprepared;
    }

    /// Best-effort return to idle after a failed prepare.
    fn rollback(&mut self) {
        let completion = self.graph.deactivate();
        if let Err(e) = self.await_graph(completion, Operation::Unprepare) {
            tracing::warn!(error = %e, "rollback deactivation not confirmed");
        }
        self.clear();
    }
}

/// A controllable, seekable, multi-stream playback unit.
///
/// Created by [`MediaFactory::construct`](crate::MediaFactory::construct)
/// (or [`Media::new`] around an existing graph) in the
/// [`Unprepared`](MediaState::Unprepared) state with no streams. The media
/// exclusively owns its graph.
///
/// All methods take `&self`; shared media are handed out as `Arc<Media>` and
/// the internal lock serializes transitions between sharers.
pub struct Media {
    resource_key: String,
    shared: bool,
    inner: Mutex<Inner>,
}

impl Media {
    /// Wrap a graph in a new, unshared, single-use media.
    pub fn new(graph: Box<dyn MediaGraph>) -> Self {
        Self::with_policy(graph, String::new(), false, false, DEFAULT_TRANSITION_TIMEOUT)
    }

    pub(crate) fn with_policy(
        graph: Box<dyn MediaGraph>,
        resource_key: String,
        shared: bool,
        reusable: bool,
        timeout: Duration,
    ) -> Self {
        Self {
            resource_key,
            shared,
            inner: Mutex::new(Inner {
                state: MediaState::Unprepared,
                exhausted: false,
                reusable,
                graph,
                streams: Vec::new(),
                range: None,
                origin: Duration::ZERO,
                timeout,
            }),
        }
    }

    /// Cache key of the resource this media was constructed for.
    pub fn resource_key(&self) -> &str {
        &self.resource_key
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn state(&self) -> MediaState {
        self.inner.lock().state
    }

    pub fn is_prepared(&self) -> bool {
        self.state() == MediaState::Prepared
    }

    /// Whether this single-use media has been consumed and can no longer be prepared.
    pub fn is_exhausted(&self) -> bool {
        self.inner.lock().exhausted
    }

    pub fn is_reusable(&self) -> bool {
        self.inner.lock().reusable
    }

    /// Allow or forbid preparing again after unprepare.
    ///
    /// Takes effect at the next unprepare; it does not revive media that is
    /// already exhausted.
    pub fn set_reusable(&self, reusable: bool) {
        self.inner.lock().reusable = reusable;
    }

    pub fn transition_timeout(&self) -> Duration {
        self.inner.lock().timeout
    }

    pub fn set_transition_timeout(&self, timeout: Duration) {
        self.inner.lock().timeout = timeout;
    }

    /// Activate the graph and discover its streams.
    ///
    /// Preparing already-prepared media succeeds without touching the graph,
    /// so independent sharers may each call it.
    ///
    /// # Errors
    /// - [`MediaError::InvalidState`]: single-use media already consumed.
    /// - [`MediaError::TransitionFailed`]: the graph refused to activate or
    ///   exposed no output ports.
    /// - [`MediaError::Timeout`]: activation did not complete in time.
    pub fn prepare(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        match inner.state {
            MediaState::Prepared => {
                tracing::debug!(resource = %self.resource_key, "already prepared");
                return Ok(());
            }
            MediaState::Unprepared if inner.exhausted => {
                tracing::warn!(resource = %self.resource_key, "prepare on exhausted media");
                return Err(inner.invalid(Operation::Prepare));
            }
            MediaState::Unprepared => {}
        }

        tracing::debug!(resource = %self.resource_key, "preparing");
        let completion = inner.graph.activate();
        if let Err(e) = inner.await_graph(completion, Operation::Prepare) {
            tracing::warn!(resource = %self.resource_key, error = %e, "prepare failed");
            inner.rollback();
            return Err(e);
        }

        let streams: Vec<Stream> = inner
            .graph
            .output_ports()
            .into_iter()
            .enumerate()
            .map(|(index, port)| Stream::new(index, port))
            .collect();
        if streams.is_empty() {
            tracing::warn!(resource = %self.resource_key, "graph activated without output ports");
            inner.rollback();
            return Err(MediaError::TransitionFailed {
                operation: Operation::Prepare,
            });
        }
        let extent = inner.graph.intrinsic_extent();

        inner.streams = streams;
        inner.origin = extent.start_position().unwrap_or(Duration::ZERO);
        inner.range = Some(extent);
        inner.state = MediaState::Prepared;

        tracing::info!(
            resource = %self.resource_key,
            n_streams = inner.streams.len(),
            range = %extent,
            "media prepared"
        );
        Ok(())
    }

    /// Deactivate the graph and drop the discovered streams.
    ///
    /// The media ends up unprepared (and exhausted, if single-use) whatever
    /// the outcome. Unpreparing unprepared media is a no-op.
    ///
    /// # Errors
    /// [`MediaError::TransitionFailed`] or [`MediaError::Timeout`] when
    /// deactivation could not be confirmed. Callers should treat the media
    /// as no longer usable in that case.
    pub fn unprepare(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.state == MediaState::Unprepared {
            tracing::trace!(resource = %self.resource_key, "unprepare on unprepared media");
            return Ok(());
        }

        tracing::debug!(resource = %self.resource_key, "unpreparing");
        let completion = inner.graph.deactivate();
        let outcome = inner.await_graph(completion, Operation::Unprepare);

        inner.clear();
        if !inner.reusable {
            inner.exhausted = true;
        }

        match &outcome {
            Ok(()) => tracing::info!(
                resource = %self.resource_key,
                exhausted = inner.exhausted,
                "media unprepared"
            ),
            Err(e) => tracing::warn!(
                resource = %self.resource_key,
                error = %e,
                "unprepare not confirmed"
            ),
        }
        outcome
    }

    /// Number of discovered streams; 0 while unprepared.
    pub fn n_streams(&self) -> usize {
        self.inner.lock().streams.len()
    }

    /// The stream at `index`.
    ///
    /// # Errors
    /// [`MediaError::IndexOutOfRange`] if `index >= n_streams()`.
    pub fn get_stream(&self, index: usize) -> Result<Stream> {
        let inner = self.inner.lock();
        inner
            .streams
            .get(index)
            .cloned()
            .ok_or(MediaError::IndexOutOfRange {
                index,
                len: inner.streams.len(),
            })
    }

    /// Snapshot of all discovered streams.
    pub fn streams(&self) -> Vec<Stream> {
        self.inner.lock().streams.clone()
    }

    /// Current playable range, `None` while unprepared.
    pub fn range(&self) -> Option<TimeRange> {
        self.inner.lock().range
    }

    /// Reposition playback to the start of `range`.
    ///
    /// A `now` or open start keeps the current position; a bounded stop is
    /// scheduled. On success the current range becomes `range` with its
    /// start resolved.
    ///
    /// # Errors
    /// - [`MediaError::InvalidState`]: media not prepared (no side effects).
    /// - [`MediaError::MalformedRange`]: stop lies before the resolved start.
    /// - [`MediaError::TransitionFailed`] / [`MediaError::Timeout`]: the
    ///   graph did not confirm; the current range is unchanged.
    pub fn seek(&self, range: &TimeRange) -> Result<()> {
        let mut inner = self.inner.lock();

        let Some(current) = inner.range else {
            tracing::debug!(resource = %self.resource_key, %range, "seek on unprepared media");
            return Err(inner.invalid(Operation::Seek));
        };

        let position = range
            .start_position()
            .or(current.start_position())
            .unwrap_or(Duration::ZERO);
        let target = TimeRange::new(RangeStart::At(position), range.stop())?;

        tracing::debug!(resource = %self.resource_key, %target, "seeking");
        let completion = inner.graph.seek_to(position, target.stop());
        if let Err(e) = inner.await_graph(completion, Operation::Seek) {
            tracing::warn!(resource = %self.resource_key, error = %e, "seek failed");
            return Err(e);
        }

        inner.range = Some(target);
        Ok(())
    }

    /// Format the current range, `None` while unprepared.
    ///
    /// With `relative` the range is expressed from the start of the graph's
    /// intrinsic extent; otherwise as reported by the graph. Sources whose
    /// extent starts at zero produce identical strings for both.
    pub fn get_range_string(&self, relative: bool, unit: RangeUnit) -> Option<String> {
        let inner = self.inner.lock();
        let range = inner.range?;

        if !relative || inner.origin.is_zero() {
            return Some(range.format(unit));
        }

        let shift = |t: Duration| t.saturating_sub(inner.origin);
        let start = match range.start() {
            RangeStart::At(t) => RangeStart::At(shift(t)),
            other => other,
        };
        let shifted = TimeRange::new(start, range.stop().map(shift)).unwrap_or(range);
        Some(shifted.format(unit))
    }
}

impl Drop for Media {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == MediaState::Prepared {
            tracing::debug!(resource = %self.resource_key, "dropping prepared media");
            // Fire and forget; nobody is left to observe the outcome.
            let _ = inner.graph.deactivate();
        }
    }
}

impl fmt::Debug for Media {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Media")
            .field("resource_key", &self.resource_key)
            .field("shared", &self.shared)
            .field("state", &inner.state)
            .field("exhausted", &inner.exhausted)
            .field("reusable", &inner.reusable)
            .field("n_streams", &inner.streams.len())
            .field("range", &inner.range)
            .finish()
    }
}
