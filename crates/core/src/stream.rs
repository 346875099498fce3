use crate::graph::{MediaKind, PortDescriptor};

/// One elementary output of a prepared media.
///
/// Streams are discovered from the graph's output ports during
/// [`Media::prepare`](crate::Media::prepare) and handed out as cloned views.
/// The media's stream list is rebuilt on every prepare and cleared on
/// unprepare, so a `Stream` held by a caller describes the prepare cycle it
/// was obtained in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    index: usize,
    descriptor: PortDescriptor,
    /// Synchronization source identifier (RFC 3550 §8.1), random per discovery.
    ssrc: u32,
}

impl Stream {
    pub(crate) fn new(index: usize, descriptor: PortDescriptor) -> Self {
        let ssrc = rand::random::<u32>();
        tracing::debug!(
            index,
            port = %descriptor.name,
            encoding = %descriptor.encoding_name,
            ssrc = format_args!("{:#010X}", ssrc),
            "stream discovered"
        );
        Self {
            index,
            descriptor,
            ssrc,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn descriptor(&self) -> &PortDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> MediaKind {
        self.descriptor.kind
    }

    pub fn payload_type(&self) -> u8 {
        self.descriptor.payload_type
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Control URL suffix used to address this stream in SETUP (`stream=0`).
    pub fn control(&self) -> String {
        format!("stream={}", self.index)
    }

    /// SDP `m=` line with the port left to the transport layer.
    pub fn media_line(&self) -> String {
        format!("m={} 0 RTP/AVP {}", self.descriptor.kind, self.descriptor.payload_type)
    }

    /// SDP media-level attribute lines for this stream.
    ///
    /// - `"a=rtpmap:96 RAW/90000"` (audio adds `/<channels>`)
    /// - `"a=control:stream=0"`
    pub fn sdp_attributes(&self) -> Vec<String> {
        let d = &self.descriptor;
        let rtpmap = match d.channels {
            Some(channels) => format!(
                "a=rtpmap:{} {}/{}/{}",
                d.payload_type, d.encoding_name, d.clock_rate, channels
            ),
            None => format!("a=rtpmap:{} {}/{}", d.payload_type, d.encoding_name, d.clock_rate),
        };
        vec![rtpmap, format!("a=control:{}", self.control())]
    }
}
