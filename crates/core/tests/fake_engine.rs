//! State-machine behavior against a scripted engine: failures, timeouts and
//! rollback, which the simulated launch engine never produces.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use rtsp_media::error::{GraphBuildErrorKind, Operation};
use rtsp_media::graph::{
    Completer, Completion, GraphBuilder, MediaGraph, MediaKind, PortDescriptor,
};
use rtsp_media::{
    Media, MediaConfig, MediaError, MediaFactory, MediaState, RangeUnit, Result, TimeRange,
};

const SHORT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeed,
    Fail,
    /// Never resolves; the completer is parked until the graph is dropped.
    Hang,
}

#[derive(Default)]
struct Calls {
    activate: AtomicUsize,
    deactivate: AtomicUsize,
    seek: AtomicUsize,
}

struct Script {
    activate: Outcome,
    deactivate: Outcome,
    seek: Outcome,
    extent: TimeRange,
    portless: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            activate: Outcome::Succeed,
            deactivate: Outcome::Succeed,
            seek: Outcome::Succeed,
            extent: TimeRange::default(),
            portless: false,
        }
    }
}

struct FakeGraph {
    script: Script,
    calls: Arc<Calls>,
    parked: Mutex<Vec<Completer>>,
}

impl FakeGraph {
    fn new(script: Script) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let graph = Self {
            script,
            calls: calls.clone(),
            parked: Mutex::new(Vec::new()),
        };
        (graph, calls)
    }

    fn resolve(&self, outcome: Outcome) -> Completion {
        match outcome {
            Outcome::Succeed => Completion::ready(true),
            Outcome::Fail => Completion::ready(false),
            Outcome::Hang => {
                let (completer, completion) = Completion::pair();
                self.parked.lock().push(completer);
                completion
            }
        }
    }
}

impl MediaGraph for FakeGraph {
    fn activate(&mut self) -> Completion {
        self.calls.activate.fetch_add(1, Ordering::SeqCst);
        self.resolve(self.script.activate)
    }

    fn deactivate(&mut self) -> Completion {
        self.calls.deactivate.fetch_add(1, Ordering::SeqCst);
        self.resolve(self.script.deactivate)
    }

    fn output_ports(&self) -> Vec<PortDescriptor> {
        if self.script.portless {
            return Vec::new();
        }
        vec![
            PortDescriptor {
                name: "video".to_string(),
                kind: MediaKind::Video,
                payload_type: 96,
                encoding_name: "H264".to_string(),
                clock_rate: 90_000,
                channels: None,
            },
            PortDescriptor {
                name: "audio".to_string(),
                kind: MediaKind::Audio,
                payload_type: 97,
                encoding_name: "OPUS".to_string(),
                clock_rate: 48_000,
                channels: Some(2),
            },
        ]
    }

    fn seek_to(&mut self, _position: Duration, _stop: Option<Duration>) -> Completion {
        self.calls.seek.fetch_add(1, Ordering::SeqCst);
        self.resolve(self.script.seek)
    }

    fn intrinsic_extent(&self) -> TimeRange {
        self.script.extent
    }
}

fn media(script: Script) -> (Media, Arc<Calls>) {
    let (graph, calls) = FakeGraph::new(script);
    let media = Media::new(Box::new(graph));
    media.set_transition_timeout(SHORT);
    (media, calls)
}

#[test]
fn engine_agnostic_stream_discovery() {
    let (media, calls) = media(Script::default());
    media.prepare().unwrap();

    assert_eq!(calls.activate.load(Ordering::SeqCst), 1);
    assert_eq!(media.n_streams(), 2);
    let audio = media.get_stream(1).unwrap();
    assert_eq!(audio.descriptor().name, "audio");
    assert_eq!(audio.sdp_attributes()[0], "a=rtpmap:97 OPUS/48000/2");
}

#[test]
fn activation_failure_rolls_back() {
    let (media, calls) = media(Script {
        activate: Outcome::Fail,
        ..Script::default()
    });

    assert!(matches!(
        media.prepare(),
        Err(MediaError::TransitionFailed {
            operation: Operation::Prepare
        })
    ));
    assert_eq!(media.state(), MediaState::Unprepared);
    assert_eq!(media.n_streams(), 0);
    assert!(!media.is_exhausted());
    assert_eq!(calls.deactivate.load(Ordering::SeqCst), 1);

    // Caller may retry; the media was not consumed.
    assert!(media.prepare().is_err());
    assert_eq!(calls.activate.load(Ordering::SeqCst), 2);
}

#[test]
fn activation_timeout_rolls_back() {
    let (media, calls) = media(Script {
        activate: Outcome::Hang,
        ..Script::default()
    });

    match media.prepare() {
        Err(MediaError::Timeout { operation, timeout }) => {
            assert_eq!(operation, Operation::Prepare);
            assert_eq!(timeout, SHORT);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert_eq!(media.state(), MediaState::Unprepared);
    assert_eq!(media.get_range_string(false, RangeUnit::Npt), None);
    assert_eq!(calls.deactivate.load(Ordering::SeqCst), 1);
}

#[test]
fn activation_without_ports_rolls_back() {
    let (media, calls) = media(Script {
        portless: true,
        ..Script::default()
    });

    assert!(matches!(
        media.prepare(),
        Err(MediaError::TransitionFailed {
            operation: Operation::Prepare
        })
    ));
    assert_eq!(media.state(), MediaState::Unprepared);
    assert_eq!(media.n_streams(), 0);
    assert_eq!(media.range(), None);
    assert_eq!(calls.deactivate.load(Ordering::SeqCst), 1);
}

#[test]
fn unconfirmed_unprepare_still_tears_down() {
    let (media, _calls) = media(Script {
        deactivate: Outcome::Hang,
        ..Script::default()
    });
    media.set_reusable(true);
    media.prepare().unwrap();

    assert!(matches!(
        media.unprepare(),
        Err(MediaError::Timeout {
            operation: Operation::Unprepare,
            ..
        })
    ));
    assert_eq!(media.state(), MediaState::Unprepared);
    assert_eq!(media.n_streams(), 0);
}

#[test]
fn single_use_exhausted_even_when_unprepare_fails() {
    let (media, _calls) = media(Script {
        deactivate: Outcome::Fail,
        ..Script::default()
    });
    media.prepare().unwrap();
    assert!(media.unprepare().is_err());
    assert!(media.is_exhausted());
    assert!(matches!(
        media.prepare(),
        Err(MediaError::InvalidState { .. })
    ));
}

#[test]
fn failed_seek_keeps_range() {
    let (media, calls) = media(Script {
        seek: Outcome::Fail,
        extent: TimeRange::between(Duration::ZERO, Duration::from_secs(60)).unwrap(),
        ..Script::default()
    });
    media.prepare().unwrap();

    assert!(media.seek(&TimeRange::parse("npt=10-").unwrap()).is_err());
    assert_eq!(calls.seek.load(Ordering::SeqCst), 1);
    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some("npt=0-60")
    );
}

#[test]
fn seek_timeout_keeps_range() {
    let (media, _calls) = media(Script {
        seek: Outcome::Hang,
        ..Script::default()
    });
    media.prepare().unwrap();

    assert!(matches!(
        media.seek(&TimeRange::parse("npt=10-").unwrap()),
        Err(MediaError::Timeout {
            operation: Operation::Seek,
            ..
        })
    ));
    assert_eq!(media.range(), Some(TimeRange::default()));
}

#[test]
fn seek_unprepared_never_reaches_engine() {
    let (media, calls) = media(Script::default());
    assert!(media.seek(&TimeRange::parse("npt=5-").unwrap()).is_err());
    assert_eq!(calls.seek.load(Ordering::SeqCst), 0);
}

#[test]
fn relative_range_measured_from_extent_start() {
    let (media, _calls) = media(Script {
        extent: TimeRange::between(Duration::from_secs(100), Duration::from_secs(160)).unwrap(),
        ..Script::default()
    });
    media.prepare().unwrap();

    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some("npt=100-160")
    );
    assert_eq!(
        media.get_range_string(true, RangeUnit::Npt).as_deref(),
        Some("npt=0-60")
    );
}

#[test]
fn dropping_prepared_media_deactivates() {
    let (media, calls) = media(Script::default());
    media.prepare().unwrap();
    drop(media);
    assert_eq!(calls.deactivate.load(Ordering::SeqCst), 1);
}

struct FakeBuilder;

impl GraphBuilder for FakeBuilder {
    fn build(&self, description: &str) -> Result<Box<dyn MediaGraph>> {
        if description == "broken" {
            return Err(MediaError::GraphBuild {
                kind: GraphBuildErrorKind::Syntax("broken".to_string()),
            });
        }
        let (graph, _calls) = FakeGraph::new(Script::default());
        Ok(Box::new(graph))
    }
}

#[test]
fn factory_uses_custom_builder() {
    let factory = MediaFactory::with_builder_and_config(
        Arc::new(FakeBuilder),
        MediaConfig {
            transition_timeout: SHORT,
            ..MediaConfig::default()
        },
    );

    factory.set_launch("broken").unwrap();
    assert!(factory.construct("/fake").is_err());

    factory.set_launch("anything").unwrap();
    let media = factory.construct("/fake").unwrap();
    assert_eq!(media.transition_timeout(), SHORT);
    media.prepare().unwrap();
    assert_eq!(media.n_streams(), 2);
}
