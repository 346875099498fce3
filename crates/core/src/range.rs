//! Playback ranges (RFC 2326 §3.5–§3.6, §12.29).
//!
//! A [`TimeRange`] is an interval of media time with a start bound and an
//! optional stop bound. Ranges travel as text in the `Range` header:
//!
//! ```text
//! npt=0-             open-ended from the beginning
//! npt=5.25-10        bounded, seconds with a decimal fraction
//! npt=00:01:30.5-    hh:mm:ss form (parse only)
//! npt=now-           live position
//! npt=-20            open start, stop at 20s
//! smpte=00:00:10:12- SMPTE at 30 fps (smpte-25 for 25 fps)
//! ```
//!
//! `now` is accepted as a start in every unit.
//!
//! Times are held as nanosecond [`Duration`]s independent of the unit they
//! were written in; the unit is chosen again when formatting.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{MediaError, RangeErrorKind, Result};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Unit a range is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeUnit {
    /// Normal Play Time: seconds from the start of the presentation.
    #[default]
    Npt,
    /// SMPTE relative timestamps at 30 frames per second.
    Smpte,
    /// SMPTE relative timestamps at 25 frames per second.
    Smpte25,
}

impl RangeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Npt => "npt",
            Self::Smpte => "smpte",
            Self::Smpte25 => "smpte-25",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "npt" => Some(Self::Npt),
            "smpte" | "smpte-30" => Some(Self::Smpte),
            "smpte-25" => Some(Self::Smpte25),
            _ => None,
        }
    }

    fn frame_rate(&self) -> Option<u32> {
        match self {
            Self::Npt => None,
            Self::Smpte => Some(30),
            Self::Smpte25 => Some(25),
        }
    }
}

impl fmt::Display for RangeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start bound of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeStart {
    /// An explicit position.
    At(Duration),
    /// The current position of a live source (`npt=now-`).
    Now,
    /// No start given (`npt=-20`).
    Open,
}

/// An interval of media time. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: RangeStart,
    stop: Option<Duration>,
}

impl Default for TimeRange {
    /// `npt=0-`: from the beginning, no known end.
    fn default() -> Self {
        Self::from_start(Duration::ZERO)
    }
}

impl TimeRange {
    /// Build a range, rejecting a stop bound before the start bound and a
    /// range open at both ends.
    pub fn new(start: RangeStart, stop: Option<Duration>) -> Result<Self> {
        match (start, stop) {
            (RangeStart::At(start), Some(stop)) if stop < start => {
                Err(MediaError::range(RangeErrorKind::Inverted))
            }
            (RangeStart::Open, None) => Err(MediaError::range(RangeErrorKind::InvalidTime(
                "-".to_string(),
            ))),
            _ => Ok(Self { start, stop }),
        }
    }

    /// Open-ended range starting at `start`.
    pub fn from_start(start: Duration) -> Self {
        Self {
            start: RangeStart::At(start),
            stop: None,
        }
    }

    /// Bounded range `[start, stop]`.
    pub fn between(start: Duration, stop: Duration) -> Result<Self> {
        Self::new(RangeStart::At(start), Some(stop))
    }

    pub fn start(&self) -> RangeStart {
        self.start
    }

    /// The explicit start position, if there is one.
    pub fn start_position(&self) -> Option<Duration> {
        match self.start {
            RangeStart::At(t) => Some(t),
            RangeStart::Now | RangeStart::Open => None,
        }
    }

    pub fn stop(&self) -> Option<Duration> {
        self.stop
    }

    pub fn is_open_ended(&self) -> bool {
        self.stop.is_none()
    }

    /// Parse a range such as `npt=5.0-` or `smpte=00:00:10-00:01:00`.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let (unit, value) = text
            .split_once('=')
            .ok_or(MediaError::range(RangeErrorKind::MissingUnit))?;
        let unit = RangeUnit::from_name(unit.trim())
            .ok_or_else(|| MediaError::range(RangeErrorKind::UnknownUnit(unit.to_string())))?;

        let (start, stop) = value
            .split_once('-')
            .ok_or(MediaError::range(RangeErrorKind::MissingSeparator))?;
        let (start, stop) = (start.trim(), stop.trim());

        let start = match start {
            "" => RangeStart::Open,
            "now" => RangeStart::Now,
            s => RangeStart::At(parse_time(unit, s)?),
        };
        let stop = match stop {
            "" => None,
            s => Some(parse_time(unit, s)?),
        };

        Self::new(start, stop)
    }

    /// Serialize in the given unit. An open stop leaves the trailing `-`.
    pub fn format(&self, unit: RangeUnit) -> String {
        let start = match self.start {
            RangeStart::At(t) => format_time(unit, t),
            RangeStart::Now => "now".to_string(),
            RangeStart::Open => String::new(),
        };
        let stop = self
            .stop
            .map(|t| format_time(unit, t))
            .unwrap_or_default();
        format!("{unit}={start}-{stop}")
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(RangeUnit::Npt))
    }
}

impl FromStr for TimeRange {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn invalid(text: &str) -> MediaError {
    MediaError::range(RangeErrorKind::InvalidTime(text.to_string()))
}

fn parse_digits(text: &str) -> Option<u64> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn parse_time(unit: RangeUnit, text: &str) -> Result<Duration> {
    match unit.frame_rate() {
        None => parse_npt(text),
        Some(fps) => parse_smpte(text, fps),
    }
}

/// `npt-sec = 1*DIGIT [ "." *DIGIT ]` or `npt-hhmmss = npt-hh ":" npt-mm ":" npt-ss [ "." *DIGIT ]`.
fn parse_npt(text: &str) -> Result<Duration> {
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (text, ""),
    };

    let secs = match whole.split(':').collect::<Vec<_>>().as_slice() {
        [secs] => parse_digits(secs).ok_or_else(|| invalid(text))?,
        [h, m, s] => {
            let h = parse_digits(h).ok_or_else(|| invalid(text))?;
            let m = parse_digits(m).ok_or_else(|| invalid(text))?;
            let s = parse_digits(s).ok_or_else(|| invalid(text))?;
            if m >= 60 || s >= 60 {
                return Err(invalid(text));
            }
            clock_secs(h, m, s).ok_or_else(|| invalid(text))?
        }
        _ => return Err(invalid(text)),
    };

    Ok(Duration::new(secs, parse_fraction(fraction).ok_or_else(|| invalid(text))?))
}

/// Decimal fraction digits to nanoseconds. Digits beyond nanosecond precision are dropped.
fn parse_fraction(fraction: &str) -> Option<u32> {
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: String = fraction.chars().take(9).collect();
    let padded = format!("{digits:0<9}");
    padded.parse().ok()
}

/// `smpte-time = 1*2DIGIT ":" 1*2DIGIT ":" 1*2DIGIT [ ":" 1*2DIGIT [ "." 1*2DIGIT ] ]`.
fn parse_smpte(text: &str, fps: u32) -> Result<Duration> {
    let parts: Vec<&str> = text.split(':').collect();
    let (h, m, s, frames) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s, None),
        [h, m, s, f] => (*h, *m, *s, Some(*f)),
        _ => return Err(invalid(text)),
    };

    let h = parse_digits(h).ok_or_else(|| invalid(text))?;
    let m = parse_digits(m).ok_or_else(|| invalid(text))?;
    let s = parse_digits(s).ok_or_else(|| invalid(text))?;
    if m >= 60 || s >= 60 {
        return Err(invalid(text));
    }

    // Hundredths of a frame.
    let hundredths = match frames {
        None => 0,
        Some(f) => {
            let (frame, sub) = match f.split_once('.') {
                Some((frame, sub)) => (frame, sub),
                None => (f, "0"),
            };
            let frame = parse_digits(frame).ok_or_else(|| invalid(text))?;
            let sub = parse_digits(sub).ok_or_else(|| invalid(text))?;
            if frame >= u64::from(fps) || sub >= 100 {
                return Err(invalid(text));
            }
            frame * 100 + sub
        }
    };

    let per_second = u128::from(fps) * 100;
    let nanos = (u128::from(hundredths) * NANOS_PER_SEC + per_second / 2) / per_second;
    let nanos = u32::try_from(nanos).map_err(|_| invalid(text))?;
    let secs = clock_secs(h, m, s).ok_or_else(|| invalid(text))?;
    Ok(Duration::new(secs, nanos))
}

/// `h:m:s` in seconds, `None` on overflow.
fn clock_secs(h: u64, m: u64, s: u64) -> Option<u64> {
    h.checked_mul(3600)?.checked_add(m * 60 + s)
}

fn format_time(unit: RangeUnit, time: Duration) -> String {
    match unit.frame_rate() {
        None => format_npt(time),
        Some(fps) => format_smpte(time, fps),
    }
}

/// Shortest exact decimal seconds: `5`, `5.25`, `0.000000001`.
fn format_npt(time: Duration) -> String {
    let nanos = time.subsec_nanos();
    if nanos == 0 {
        return time.as_secs().to_string();
    }
    let fraction = format!("{nanos:09}");
    format!("{}.{}", time.as_secs(), fraction.trim_end_matches('0'))
}

fn format_smpte(time: Duration, fps: u32) -> String {
    let per_second = u128::from(fps) * 100;
    let mut secs = time.as_secs();
    let mut hundredths =
        (u128::from(time.subsec_nanos()) * per_second + NANOS_PER_SEC / 2) / NANOS_PER_SEC;
    if hundredths >= per_second {
        secs = secs.saturating_add(1);
        hundredths = 0;
    }

    let mut out = format!(
        "{:02}:{:02}:{:02}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60
    );
    if hundredths > 0 {
        out.push_str(&format!(":{:02}", hundredths / 100));
        if hundredths % 100 > 0 {
            out.push_str(&format!(".{:02}", hundredths % 100));
        }
    }
    out
}
