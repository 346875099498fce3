//! Simulated processing graph built from a launch description.
//!
//! A [`Pipeline`] resolves every element of a [`LaunchDescription`] against
//! the [element registry](super::elements), exposes payloaders named
//! `pay0`, `pay1`, ... as output ports, and walks the usual element states
//! on a worker thread:
//!
//! ```text
//! activate:   Null -> Ready -> Paused
//! deactivate: Paused -> Ready -> Null
//! seek:       Paused (flush) -> Paused at new position
//! ```
//!
//! Each step waits `step_delay`, so callers of the blocking media API see
//! real asynchronous completion. Starting a transition supersedes any still
//! in flight: the older worker stops before its next step and reports
//! failure, so an abandoned activation cannot land after a deactivation.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use super::elements::{self, ElementClass};
use super::launch::{self, ElementSpec, LaunchDescription};
use super::{Completion, GraphBuilder, MediaGraph, MediaKind, PortDescriptor};
use crate::error::{GraphBuildErrorKind, MediaError, Result};
use crate::range::TimeRange;

/// Frame rate assumed for `videotestsrc` when computing durations.
const VIDEO_FRAMES_PER_SEC: u32 = 30;
/// Samples per buffer and sample rate assumed for `audiotestsrc`.
const AUDIO_SAMPLES_PER_BUFFER: u64 = 1024;
const AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Default delay between intermediate state changes.
pub const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(2);

/// Element state, mirroring the usual Null/Ready/Paused progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Null,
    Ready,
    Paused,
}

#[derive(Debug)]
struct Shared {
    state: PipelineState,
    position: Duration,
    stop: Option<Duration>,
    /// Bumped by every transition; workers holding an older value stop.
    generation: u64,
}

impl Shared {
    fn supersede(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Builds [`Pipeline`]s from launch descriptions.
#[derive(Debug, Clone)]
pub struct LaunchBuilder {
    step_delay: Duration,
}

impl LaunchBuilder {
    pub fn new() -> Self {
        Self {
            step_delay: DEFAULT_STEP_DELAY,
        }
    }

    /// Delay between intermediate state changes of built pipelines.
    pub fn with_step_delay(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Default for LaunchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder for LaunchBuilder {
    fn build(&self, description: &str) -> Result<Box<dyn MediaGraph>> {
        let pipeline = Pipeline::from_description(description, self.step_delay)?;
        Ok(Box::new(pipeline))
    }
}

/// A simulated graph with its ports and extent resolved at build time.
#[derive(Debug)]
pub struct Pipeline {
    ports: Vec<PortDescriptor>,
    extent: TimeRange,
    step_delay: Duration,
    shared: Arc<Mutex<Shared>>,
}

impl Pipeline {
    /// Parse and resolve a description.
    pub fn from_description(description: &str, step_delay: Duration) -> Result<Self> {
        let launch = launch::parse(description)?;

        for element in launch.elements() {
            if elements::lookup(&element.factory).is_none() {
                return Err(MediaError::graph(GraphBuildErrorKind::UnknownElement(
                    element.factory.clone(),
                )));
            }
        }

        let ports = collect_ports(&launch)?;
        let extent = compute_extent(&launch)?;

        tracing::debug!(
            n_ports = ports.len(),
            extent = %extent,
            "pipeline built"
        );

        Ok(Self {
            ports,
            extent,
            step_delay,
            shared: Arc::new(Mutex::new(Shared {
                state: PipelineState::Null,
                position: Duration::ZERO,
                stop: None,
                generation: 0,
            })),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.shared.lock().state
    }

    /// Current playback position.
    pub fn position(&self) -> Duration {
        self.shared.lock().position
    }

    /// Scheduled stop position from the last seek, if any.
    pub fn stop_position(&self) -> Option<Duration> {
        self.shared.lock().stop
    }

    /// Run `steps` on a worker thread, one state per `step_delay`, for as
    /// long as `generation` is current.
    fn transition(&self, generation: u64, steps: &'static [PipelineState]) -> Completion {
        let (completer, completion) = Completion::pair();
        let shared = self.shared.clone();
        let delay = self.step_delay;

        thread::spawn(move || {
            for &next in steps {
                thread::sleep(delay);
                let mut shared = shared.lock();
                if shared.generation != generation {
                    tracing::trace!(to = ?next, "pipeline transition superseded");
                    completer.complete(false);
                    return;
                }
                tracing::trace!(from = ?shared.state, to = ?next, "pipeline state change");
                shared.state = next;
            }
            completer.complete(true);
        });

        completion
    }
}

impl MediaGraph for Pipeline {
    fn activate(&mut self) -> Completion {
        let generation = {
            let mut shared = self.shared.lock();
            let generation = shared.supersede();
            if shared.state == PipelineState::Paused {
                return Completion::ready(true);
            }
            generation
        };
        self.transition(generation, &[PipelineState::Ready, PipelineState::Paused])
    }

    fn deactivate(&mut self) -> Completion {
        let generation = {
            let mut shared = self.shared.lock();
            let generation = shared.supersede();
            shared.position = Duration::ZERO;
            shared.stop = None;
            if shared.state == PipelineState::Null {
                return Completion::ready(true);
            }
            generation
        };
        self.transition(generation, &[PipelineState::Ready, PipelineState::Null])
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        self.ports.clone()
    }

    fn seek_to(&mut self, position: Duration, stop: Option<Duration>) -> Completion {
        if self.state() != PipelineState::Paused {
            tracing::debug!("seek on inactive pipeline");
            return Completion::ready(false);
        }
        if let Some(end) = self.extent.stop()
            && (position > end || stop.is_some_and(|stop| stop > end))
        {
            tracing::debug!(?position, ?end, "seek past end of media");
            return Completion::ready(false);
        }

        let generation = self.shared.lock().supersede();
        let (completer, completion) = Completion::pair();
        let shared = self.shared.clone();
        let delay = self.step_delay;

        thread::spawn(move || {
            tracing::trace!(?position, "flushing for seek");
            thread::sleep(delay);
            let mut shared = shared.lock();
            if shared.generation != generation {
                tracing::trace!(?position, "seek superseded");
                completer.complete(false);
                return;
            }
            shared.position = position;
            shared.stop = stop;
            completer.complete(true);
        });

        completion
    }

    fn intrinsic_extent(&self) -> TimeRange {
        self.extent
    }
}

/// Collect `pay0`, `pay1`, ... until the first missing index.
fn collect_ports(launch: &LaunchDescription) -> Result<Vec<PortDescriptor>> {
    let mut ports = Vec::new();

    loop {
        let name = format!("pay{}", ports.len());
        let Some(element) = launch.elements().find(|e| e.name() == Some(name.as_str())) else {
            break;
        };

        let Some(ElementClass::Payloader(info)) = elements::lookup(&element.factory) else {
            return Err(MediaError::graph(GraphBuildErrorKind::NotAPayloader(name)));
        };

        let payload_type = match element.property("pt") {
            Some(pt) => pt
                .parse::<u8>()
                .ok()
                .filter(|pt| *pt <= 127)
                .ok_or_else(|| invalid_property(element, "pt"))?,
            None => info.default_payload_type,
        };

        ports.push(PortDescriptor {
            name,
            kind: info.kind,
            payload_type,
            encoding_name: info.encoding_name.to_string(),
            clock_rate: info.clock_rate,
            channels: info.channels,
        });
    }

    if ports.is_empty() {
        return Err(MediaError::graph(GraphBuildErrorKind::NoStreams));
    }
    Ok(ports)
}

/// Bounded only when every source has a positive `num-buffers`.
fn compute_extent(launch: &LaunchDescription) -> Result<TimeRange> {
    let mut longest: Option<Duration> = None;

    for element in launch.elements() {
        let Some(ElementClass::Source(kind)) = elements::lookup(&element.factory) else {
            continue;
        };

        let buffers = match element.property("num-buffers") {
            Some(n) => n
                .parse::<i64>()
                .map_err(|_| invalid_property(element, "num-buffers"))?,
            None => -1,
        };
        let Ok(buffers) = u64::try_from(buffers) else {
            return Ok(TimeRange::default());
        };
        if buffers == 0 {
            return Ok(TimeRange::default());
        }

        let duration = match kind {
            MediaKind::Audio => {
                Duration::from_secs(buffers.saturating_mul(AUDIO_SAMPLES_PER_BUFFER)) / AUDIO_SAMPLE_RATE
            }
            MediaKind::Video | MediaKind::Application => {
                Duration::from_secs(buffers) / VIDEO_FRAMES_PER_SEC
            }
        };
        longest = Some(longest.map_or(duration, |l| l.max(duration)));
    }

    match longest {
        Some(stop) => TimeRange::between(Duration::ZERO, stop),
        None => Ok(TimeRange::default()),
    }
}

fn invalid_property(element: &ElementSpec, property: &str) -> MediaError {
    MediaError::graph(GraphBuildErrorKind::InvalidProperty {
        element: element.factory.clone(),
        property: property.to_string(),
    })
}
