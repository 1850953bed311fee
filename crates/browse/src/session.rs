//! Shared wiring for the browse views and the library actions that
//! invalidate them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use library::{Catalog, LibraryError, LibraryStats};
use tracing::info;

use crate::commands::PlaybackQueue;
use crate::config::{resolve_path, BrowseConfig};
use crate::events::{EventHub, LibraryEvent};
use crate::ui::{DispatchError, UiExecutor, UiThread};

/// Everything a view-model needs from its surroundings.
#[derive(Clone)]
pub struct BrowseContext {
    pub ui: UiExecutor,
    pub catalog: Catalog,
    pub hub: EventHub,
    pub queue: Arc<dyn PlaybackQueue>,
    pub config: BrowseConfig,
}

impl BrowseContext {
    pub fn new(
        ui: UiExecutor,
        catalog: Catalog,
        queue: Arc<dyn PlaybackQueue>,
        config: BrowseConfig,
    ) -> Self {
        let hub = EventHub::new(config.event_capacity);
        Self {
            ui,
            catalog,
            hub,
            queue,
            config,
        }
    }

    /// Start the UI loop and load the library snapshot named by `config`.
    /// Relative paths resolve against `config_path`.
    pub fn open(
        config: BrowseConfig,
        config_path: &Path,
        queue: Arc<dyn PlaybackQueue>,
    ) -> Result<(Self, UiThread), SessionError> {
        let library_path = resolve_path(config_path, &config.library_path);
        let music_root = if config.music_root.trim().is_empty() {
            PathBuf::from(".")
        } else {
            resolve_path(config_path, config.music_root.trim())
        };
        let catalog = Catalog::load(music_root, &library_path)?;
        let (ui, thread) = UiExecutor::spawn("browse-ui")?;
        Ok((Self::new(ui, catalog, queue, config), thread))
    }
}

/// Library-level actions. Each successful change is announced on the hub so
/// the affected views reload.
#[derive(Clone)]
pub struct Session {
    ctx: BrowseContext,
}

impl Session {
    pub fn new(ctx: BrowseContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BrowseContext {
        &self.ctx
    }

    pub fn switch_profile(&self, profile_id: &str) -> Result<bool, SessionError> {
        let changed = self.ctx.catalog.switch_profile(profile_id)?;
        if changed {
            self.ctx.hub.publish(LibraryEvent::ProfileChanged {
                profile: profile_id.to_string(),
            });
        }
        Ok(changed)
    }

    pub fn like_track(&self, track_id: &str) -> Result<bool, SessionError> {
        let changed = self.ctx.catalog.like_track(track_id)?;
        if changed {
            self.ctx.hub.publish(LibraryEvent::TrackLiked {
                track_id: track_id.to_string(),
            });
        }
        Ok(changed)
    }

    pub fn unlike_track(&self, track_id: &str) -> Result<bool, SessionError> {
        let changed = self.ctx.catalog.unlike_track(track_id)?;
        if changed {
            self.ctx.hub.publish(LibraryEvent::TrackUnliked {
                track_id: track_id.to_string(),
            });
        }
        Ok(changed)
    }

    pub fn reload_library(&self, snapshot_path: &Path) -> Result<LibraryStats, SessionError> {
        let stats = self.ctx.catalog.reload(snapshot_path)?;
        info!(
            "Reloaded library: {} artists, {} albums, {} tracks",
            stats.artists, stats.albums, stats.tracks
        );
        self.ctx.hub.publish(LibraryEvent::LibraryInvalidated);
        Ok(stats)
    }
}

#[derive(Debug)]
pub enum SessionError {
    Library(LibraryError),
    Dispatch(DispatchError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::Library(err) => write!(f, "{}", err),
            SessionError::Dispatch(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<LibraryError> for SessionError {
    fn from(err: LibraryError) -> Self {
        SessionError::Library(err)
    }
}

impl From<DispatchError> for SessionError {
    fn from(err: DispatchError) -> Self {
        SessionError::Dispatch(err)
    }
}
