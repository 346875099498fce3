//! Integration test: construct → prepare → seek → unprepare through the
//! public API, using the built-in launch engine.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rtsp_media::error::{GraphBuildErrorKind, Operation};
use rtsp_media::graph::LaunchBuilder;
use rtsp_media::{MediaConfig, MediaError, MediaFactory, MediaState, RangeUnit, TimeRange};

const LAUNCH: &str = "( videotestsrc ! rtpvrawpay pt=96 name=pay0 )";
const URL: &str = "rtsp://localhost:8554/test";

fn factory() -> MediaFactory {
    let factory = MediaFactory::with_builder(Arc::new(LaunchBuilder::with_step_delay(
        Duration::from_millis(1),
    )));
    assert!(!factory.is_shared());
    factory.set_launch(LAUNCH).expect("set launch");
    factory
}

#[test]
fn launch_prepare_seek_unprepare() {
    let factory = factory();
    let media = factory.construct(URL).expect("construct");
    assert_eq!(media.n_streams(), 0);

    // Not prepared yet: no range, seek refused.
    assert_eq!(media.get_range_string(false, RangeUnit::Npt), None);
    let range = TimeRange::parse("npt=5.0-").expect("parse range");
    assert!(matches!(
        media.seek(&range),
        Err(MediaError::InvalidState { .. })
    ));

    media.prepare().expect("prepare");
    assert_eq!(media.n_streams(), 1);
    let stream = media.get_stream(0).expect("stream 0");
    assert_eq!(stream.payload_type(), 96);
    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some("npt=0-")
    );
    assert_eq!(
        media.get_range_string(true, RangeUnit::Npt).as_deref(),
        Some("npt=0-")
    );

    media.seek(&range).expect("seek");
    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some("npt=5-")
    );
    assert_eq!(
        media.get_range_string(true, RangeUnit::Npt).as_deref(),
        Some("npt=5-")
    );

    media.unprepare().expect("unprepare");
    assert_eq!(media.get_range_string(false, RangeUnit::Npt), None);
    assert!(media.seek(&range).is_err());
    assert_eq!(media.n_streams(), 0);
}

#[test]
fn failed_seek_before_prepare_leaves_no_trace() {
    let factory = factory();
    let media = factory.construct(URL).unwrap();

    assert!(media.seek(&TimeRange::parse("npt=30-").unwrap()).is_err());
    media.prepare().unwrap();
    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some("npt=0-")
    );
}

#[test]
fn single_use_media_cannot_be_prepared_twice() {
    let factory = factory();
    let media = factory.construct(URL).unwrap();
    assert!(!media.is_reusable());

    media.prepare().unwrap();
    media.unprepare().unwrap();
    assert_eq!(media.n_streams(), 0);
    assert!(media.prepare().is_err());
    assert_eq!(media.n_streams(), 0);
    assert_eq!(media.state(), MediaState::Unprepared);
}

#[test]
fn reusable_media_cycles() {
    let factory = factory();
    let media = factory.construct(URL).unwrap();
    media.set_reusable(true);

    for _ in 0..3 {
        media.prepare().unwrap();
        assert_eq!(media.n_streams(), 1);
        media.unprepare().unwrap();
        assert_eq!(media.n_streams(), 0);
    }
    assert!(!media.is_exhausted());
}

#[test]
fn reusable_from_factory_default() {
    let factory = factory();
    factory.set_reusable(true);
    let media = factory.construct(URL).unwrap();

    media.prepare().unwrap();
    media.unprepare().unwrap();
    media.prepare().unwrap();
    media.unprepare().unwrap();
}

#[test]
fn each_prepare_assigns_fresh_streams() {
    let factory = factory();
    factory.set_reusable(true);
    let media = factory.construct(URL).unwrap();

    media.prepare().unwrap();
    let first = media.get_stream(0).unwrap();
    media.unprepare().unwrap();
    media.prepare().unwrap();
    let second = media.get_stream(0).unwrap();

    assert_eq!(first.index(), second.index());
    assert_eq!(first.descriptor(), second.descriptor());
}

#[test]
fn malformed_launch_fails_construct() {
    let factory = MediaFactory::new();
    factory
        .set_launch("( videotestsrc ! notapayloader name=pay0 )")
        .unwrap();
    assert!(matches!(
        factory.construct(URL),
        Err(MediaError::GraphBuild { .. })
    ));
}

#[test]
fn launch_without_named_payloader_fails_construct() {
    let factory = MediaFactory::new();
    factory.set_launch("( videotestsrc ! rtpvrawpay pt=96 )").unwrap();
    assert!(matches!(
        factory.construct(URL),
        Err(MediaError::GraphBuild {
            kind: GraphBuildErrorKind::NoStreams
        })
    ));
}

#[test]
fn timed_out_prepare_can_be_retried() {
    let factory = MediaFactory::with_builder_and_config(
        Arc::new(LaunchBuilder::with_step_delay(Duration::from_millis(60))),
        MediaConfig {
            transition_timeout: Duration::from_millis(20),
            ..MediaConfig::default()
        },
    );
    factory.set_launch(LAUNCH).unwrap();
    let media = factory.construct(URL).unwrap();

    assert!(matches!(
        media.prepare(),
        Err(MediaError::Timeout {
            operation: Operation::Prepare,
            ..
        })
    ));
    assert_eq!(media.state(), MediaState::Unprepared);
    assert!(!media.is_exhausted());

    // The abandoned activation must not leave the graph half-active.
    media.set_transition_timeout(Duration::from_secs(5));
    media.prepare().unwrap();
    assert_eq!(media.n_streams(), 1);
    media.unprepare().unwrap();
    assert_eq!(media.state(), MediaState::Unprepared);
}

#[test]
fn shared_media_prepared_once_for_all_sharers() {
    let factory = factory();
    factory.set_shared(true);
    let holder = factory.construct(URL).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let media = factory.construct(URL).unwrap();
            thread::spawn(move || {
                media.prepare().unwrap();
                media.n_streams()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }

    let media = factory.construct(URL).unwrap();
    assert!(Arc::ptr_eq(&media, &holder));
    assert!(media.is_prepared());
    media.unprepare().unwrap();
}

#[test]
fn concurrent_seek_waits_for_prepare() {
    let factory = MediaFactory::with_builder(Arc::new(LaunchBuilder::with_step_delay(
        Duration::from_millis(50),
    )));
    factory.set_launch(LAUNCH).unwrap();
    let media = factory.construct(URL).unwrap();

    let preparer = {
        let media = media.clone();
        thread::spawn(move || media.prepare())
    };
    thread::sleep(Duration::from_millis(10));

    // Either the seek queued behind prepare and succeeded, or it ran first
    // and was refused; it never sees a half-prepared media.
    let seek = media.seek(&TimeRange::parse("npt=2-").unwrap());
    preparer.join().unwrap().unwrap();

    let expected = if seek.is_ok() { "npt=2-" } else { "npt=0-" };
    assert_eq!(
        media.get_range_string(false, RangeUnit::Npt).as_deref(),
        Some(expected)
    );
}
