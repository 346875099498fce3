use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::MediaConfig;
use crate::error::{GraphBuildErrorKind, MediaError, Operation, Result};
use crate::graph::{GraphBuilder, LaunchBuilder};
use crate::media::Media;
use crate::url::resource_key;

struct FactoryState {
    launch: Option<String>,
    config: MediaConfig,
    /// Set once the first media has been constructed; freezes the launch description.
    constructed: bool,
    /// Shared media by resource key. Entries die with their last `Arc`.
    cache: HashMap<String, Weak<Media>>,
}

/// Builds [`Media`] from a launch description.
///
/// When the factory is shared, requests whose URLs map to the same
/// [resource key](crate::url::resource_key) receive the same media while
/// any caller still holds it; otherwise every `construct` builds a new
/// graph. Constructed media start unprepared and inherit the factory's
/// reusable flag and transition timeout.
pub struct MediaFactory {
    builder: Arc<dyn GraphBuilder>,
    state: Mutex<FactoryState>,
}

impl MediaFactory {
    /// A factory backed by the simulated [`LaunchBuilder`].
    pub fn new() -> Self {
        Self::with_builder_and_config(Arc::new(LaunchBuilder::new()), MediaConfig::default())
    }

    /// A factory with custom policy and timing.
    pub fn with_config(config: MediaConfig) -> Self {
        Self::with_builder_and_config(Arc::new(LaunchBuilder::new()), config)
    }

    /// A factory building graphs with a custom engine.
    pub fn with_builder(builder: Arc<dyn GraphBuilder>) -> Self {
        Self::with_builder_and_config(builder, MediaConfig::default())
    }

    pub fn with_builder_and_config(builder: Arc<dyn GraphBuilder>, config: MediaConfig) -> Self {
        Self {
            builder,
            state: Mutex::new(FactoryState {
                launch: None,
                config,
                constructed: false,
                cache: HashMap::new(),
            }),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.state.lock().config.shared
    }

    /// Enable or disable sharing. Disabling drops the cache; media already
    /// handed out are unaffected.
    pub fn set_shared(&self, shared: bool) {
        let mut state = self.state.lock();
        state.config.shared = shared;
        if !shared {
            state.cache.clear();
        }
    }

    pub fn is_reusable(&self) -> bool {
        self.state.lock().config.reusable
    }

    /// Reusable flag given to media constructed from now on.
    pub fn set_reusable(&self, reusable: bool) {
        self.state.lock().config.reusable = reusable;
    }

    /// Transition timeout given to media constructed from now on.
    pub fn set_transition_timeout(&self, timeout: Duration) {
        self.state.lock().config.transition_timeout = timeout;
    }

    pub fn config(&self) -> MediaConfig {
        self.state.lock().config.clone()
    }

    /// Set the launch description.
    ///
    /// # Errors
    /// [`MediaError::InvalidState`] once any media has been constructed.
    pub fn set_launch(&self, description: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.constructed {
            tracing::warn!("launch description changed after construct");
            return Err(MediaError::InvalidState {
                operation: Operation::SetLaunch,
                state: "constructed",
            });
        }
        state.launch = Some(description.to_string());
        Ok(())
    }

    pub fn launch(&self) -> Option<String> {
        self.state.lock().launch.clone()
    }

    /// Produce media for the resource at `url`.
    ///
    /// # Errors
    /// [`MediaError::GraphBuild`] when no description is set or the
    /// description cannot be built. The factory remains usable.
    pub fn construct(&self, url: &str) -> Result<Arc<Media>> {
        let mut state = self.state.lock();
        let key = resource_key(url);
        let shared = state.config.shared;

        if shared {
            state.cache.retain(|_, media| media.strong_count() > 0);
            if let Some(media) = state.cache.get(&key).and_then(Weak::upgrade) {
                tracing::debug!(resource = %key, holders = Arc::strong_count(&media), "reusing shared media");
                return Ok(media);
            }
        }

        let description = state
            .launch
            .as_deref()
            .ok_or(MediaError::graph(GraphBuildErrorKind::NoLaunch))?;
        let graph = self.builder.build(description).inspect_err(|e| {
            tracing::warn!(resource = %key, error = %e, "graph build failed");
        })?;

        let media = Arc::new(Media::with_policy(
            graph,
            key.clone(),
            shared,
            state.config.reusable,
            state.config.transition_timeout,
        ));
        state.constructed = true;
        if shared {
            state.cache.insert(key.clone(), Arc::downgrade(&media));
        }

        tracing::info!(resource = %key, shared, reusable = state.config.reusable, "media constructed");
        Ok(media)
    }

    /// Number of shared media still held by at least one caller.
    pub fn cached_media_count(&self) -> usize {
        self.state
            .lock()
            .cache
            .values()
            .filter(|media| media.strong_count() > 0)
            .count()
    }
}

impl Default for MediaFactory {
    fn default() -> Self {
        Self::new()
    }
}
