/// Default RTSP port (RFC 2326 §3.2).
pub const DEFAULT_RTSP_PORT: u16 = 554;
/// Default RTSP-over-TLS port.
pub const DEFAULT_RTSPS_PORT: u16 = 322;

/// Derive the shared-media cache key for a requested resource.
///
/// Two requests map to the same shared media when their keys match. The
/// key is the port followed by the absolute path and query; the host is
/// ignored so that clients reaching the server by different names share.
///
/// `rtsp://host:8554/test`         → `8554/test`
/// `rtsp://host/test?res=hd`       → `554/test?res=hd`
/// `rtsps://host`                  → `322/`
/// `/test`                         → `/test`
pub fn resource_key(url: &str) -> String {
    let url = url.trim();
    let (rest, default_port) = if let Some(after) = url.strip_prefix("rtsp://") {
        (after, DEFAULT_RTSP_PORT)
    } else if let Some(after) = url.strip_prefix("rtsps://") {
        (after, DEFAULT_RTSPS_PORT)
    } else {
        return url.to_string();
    };

    let (authority, path) = match rest.find(['/', '?']) {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, "/"),
    };

    // IPv6 literals carry colons inside brackets: [::1]:8554
    let port = authority
        .rsplit_once(':')
        .filter(|(host, _)| !host.ends_with(':') && (!host.starts_with('[') || host.ends_with(']')))
        .and_then(|(_, port)| port.parse::<u16>().ok())
        .unwrap_or(default_port);

    if path.starts_with('?') {
        format!("{port}/{path}")
    } else {
        format!("{port}{path}")
    }
}
