use std::time::Duration;

/// Default bound on a single prepare/unprepare/seek transition.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(20);

/// Policy and timing configuration applied by a [`MediaFactory`](crate::MediaFactory).
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// How long `prepare`, `unprepare` and `seek` wait for the graph before
    /// reporting [`MediaError::Timeout`](crate::MediaError::Timeout).
    pub transition_timeout: Duration,
    /// Whether constructed media may be prepared again after unprepare.
    pub reusable: bool,
    /// Whether requests for the same resource share one media instance.
    pub shared: bool,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            transition_timeout: DEFAULT_TRANSITION_TIMEOUT,
            reusable: false,
            shared: false,
        }
    }
}
