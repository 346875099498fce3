//! Session-lifecycle core of an RTSP media server.
//!
//! A [`MediaFactory`] turns a launch description into [`Media`]; media are
//! prepared (graph activated, [`Stream`]s discovered), seeked with
//! [`TimeRange`]s, and unprepared again. The processing graph itself sits
//! behind the [`graph::MediaGraph`] capability trait.
//!
//! ```no_run
//! use rtsp_media::{MediaFactory, RangeUnit, TimeRange};
//!
//! let factory = MediaFactory::new();
//! factory.set_launch("( videotestsrc ! rtpvrawpay pt=96 name=pay0 )")?;
//!
//! let media = factory.construct("rtsp://localhost:8554/test")?;
//! media.prepare()?;
//! assert_eq!(media.get_range_string(false, RangeUnit::Npt).as_deref(), Some("npt=0-"));
//!
//! media.seek(&TimeRange::parse("npt=5.0-")?)?;
//! media.unprepare()?;
//! # Ok::<(), rtsp_media::MediaError>(())
//! ```

pub mod config;
pub mod error;
pub mod factory;
pub mod graph;
pub mod media;
pub mod range;
pub mod stream;
pub mod url;

pub use config::MediaConfig;
pub use error::{MediaError, Result};
pub use factory::MediaFactory;
pub use media::{Media, MediaState};
pub use range::{RangeStart, RangeUnit, TimeRange};
pub use stream::Stream;
