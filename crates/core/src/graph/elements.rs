//! Element registry for the simulated launch engine.
//!
//! Each known element factory is classified as a source, a pass-through
//! filter (converters, encoders, parsers, queues) or an RTP payloader.
//! Payloaders carry the RTP parameters that become stream descriptors.
//!
//! | Payloader | Encoding | Clock | PT | RFC |
//! |-----------|----------|-------|----|-----|
//! | `rtpvrawpay` | RAW | 90000 | 96 | [RFC 4175](https://tools.ietf.org/html/rfc4175) |
//! | `rtph264pay` | H264 | 90000 | 96 | [RFC 6184](https://tools.ietf.org/html/rfc6184) |
//! | `rtph265pay` | H265 | 90000 | 96 | [RFC 7798](https://tools.ietf.org/html/rfc7798) |
//! | `rtpjpegpay` | JPEG | 90000 | 26 | [RFC 2435](https://tools.ietf.org/html/rfc2435) |
//! | `rtpL16pay` | L16 | 44100 | 96 | [RFC 3551](https://tools.ietf.org/html/rfc3551) |
//! | `rtpmp4apay` | MP4A-LATM | 44100 | 96 | [RFC 6416](https://tools.ietf.org/html/rfc6416) |
//! | `rtpopuspay` | OPUS | 48000 | 96 | [RFC 7587](https://tools.ietf.org/html/rfc7587) |

use super::MediaKind;

/// RTP parameters of a payloader element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayloaderInfo {
    pub kind: MediaKind,
    pub encoding_name: &'static str,
    pub clock_rate: u32,
    pub default_payload_type: u8,
    pub channels: Option<u32>,
}

/// What role an element plays in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementClass {
    Source(MediaKind),
    Filter,
    Payloader(PayloaderInfo),
}

const fn video(encoding_name: &'static str, default_payload_type: u8) -> ElementClass {
    ElementClass::Payloader(PayloaderInfo {
        kind: MediaKind::Video,
        encoding_name,
        clock_rate: 90_000,
        default_payload_type,
        channels: None,
    })
}

const fn audio(encoding_name: &'static str, clock_rate: u32, channels: u32) -> ElementClass {
    ElementClass::Payloader(PayloaderInfo {
        kind: MediaKind::Audio,
        encoding_name,
        clock_rate,
        default_payload_type: 96,
        channels: Some(channels),
    })
}

const REGISTRY: &[(&str, ElementClass)] = &[
    ("videotestsrc", ElementClass::Source(MediaKind::Video)),
    ("audiotestsrc", ElementClass::Source(MediaKind::Audio)),
    ("capsfilter", ElementClass::Filter),
    ("queue", ElementClass::Filter),
    ("identity", ElementClass::Filter),
    ("videoconvert", ElementClass::Filter),
    ("videoscale", ElementClass::Filter),
    ("videorate", ElementClass::Filter),
    ("audioconvert", ElementClass::Filter),
    ("audioresample", ElementClass::Filter),
    ("x264enc", ElementClass::Filter),
    ("x265enc", ElementClass::Filter),
    ("jpegenc", ElementClass::Filter),
    ("opusenc", ElementClass::Filter),
    ("avenc_aac", ElementClass::Filter),
    ("h264parse", ElementClass::Filter),
    ("rtpvrawpay", video("RAW", 96)),
    ("rtph264pay", video("H264", 96)),
    ("rtph265pay", video("H265", 96)),
    ("rtpjpegpay", video("JPEG", 26)),
    ("rtpL16pay", audio("L16", 44_100, 2)),
    ("rtpmp4apay", audio("MP4A-LATM", 44_100, 2)),
    ("rtpopuspay", audio("OPUS", 48_000, 2)),
];

/// Look up an element factory by name.
pub fn lookup(factory: &str) -> Option<ElementClass> {
    REGISTRY
        .iter()
        .find(|(name, _)| *name == factory)
        .map(|(_, class)| *class)
}
