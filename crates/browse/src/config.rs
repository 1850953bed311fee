use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::events::ViewKind;
use crate::loader::{LoaderOptions, ProgressOnFinish};
use crate::sort::{SortKind, SortSpec};

pub const CONFIG_VERSION: u32 = 2;
const DEFAULT_PAGE_SIZE: usize = 50;
const DEFAULT_FOLDER_PAGE_SIZE: usize = 100;
const DEFAULT_EVENT_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: usize,
    pub sort: SortSpec,
    pub progress_on_finish: ProgressOnFinish,
}

impl ViewConfig {
    fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            ..Self::default()
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            page_size: self.page_size,
            sort: self.sort,
            progress_on_finish: self.progress_on_finish,
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            sort: SortSpec::ascending(SortKind::Title),
            progress_on_finish: ProgressOnFinish::Hold,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowseConfig {
    pub version: u32,
    pub music_root: String,
    pub library_path: String,
    pub event_capacity: usize,
    pub albums: ViewConfig,
    pub artists: ViewConfig,
    pub genres: ViewConfig,
    pub folders: ViewConfig,
    pub playlists: ViewConfig,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            music_root: "".to_string(),
            library_path: "library.json".to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            albums: ViewConfig::default(),
            artists: ViewConfig::default(),
            genres: ViewConfig::default(),
            folders: ViewConfig::with_page_size(DEFAULT_FOLDER_PAGE_SIZE),
            playlists: ViewConfig::default(),
        }
    }
}

impl BrowseConfig {
    pub fn view(&self, kind: ViewKind) -> &ViewConfig {
        match kind {
            ViewKind::Albums => &self.albums,
            ViewKind::Artists => &self.artists,
            ViewKind::Genres => &self.genres,
            ViewKind::Folders => &self.folders,
            ViewKind::Playlists => &self.playlists,
        }
    }

    pub fn view_mut(&mut self, kind: ViewKind) -> &mut ViewConfig {
        match kind {
            ViewKind::Albums => &mut self.albums,
            ViewKind::Artists => &mut self.artists,
            ViewKind::Genres => &mut self.genres,
            ViewKind::Folders => &mut self.folders,
            ViewKind::Playlists => &mut self.playlists,
        }
    }

    fn sanitize(&mut self) {
        if self.version < CONFIG_VERSION {
            self.version = CONFIG_VERSION;
        }
        if self.library_path.trim().is_empty() {
            self.library_path = "library.json".to_string();
        }
        if self.event_capacity == 0 {
            self.event_capacity = DEFAULT_EVENT_CAPACITY;
        }
        for kind in [
            ViewKind::Albums,
            ViewKind::Artists,
            ViewKind::Genres,
            ViewKind::Folders,
            ViewKind::Playlists,
        ] {
            let view = self.view_mut(kind);
            if view.page_size == 0 {
                view.page_size = match kind {
                    ViewKind::Folders => DEFAULT_FOLDER_PAGE_SIZE,
                    _ => DEFAULT_PAGE_SIZE,
                };
            }
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Yaml(serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {}", err),
            ConfigError::Yaml(err) => write!(f, "yaml error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err)
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Yaml(err)
    }
}

pub fn config_path_from_env() -> PathBuf {
    match env::var("BROWSE_CONFIG") {
        Ok(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => PathBuf::from("browse.yaml"),
    }
}

/// Returns the config and whether it was created fresh.
pub fn load_or_create_config(path: &Path) -> Result<(BrowseConfig, bool), ConfigError> {
    if path.exists() {
        let contents = fs::read_to_string(path)?;
        let mut config: BrowseConfig = serde_yaml::from_str(&contents)?;
        config.sanitize();
        return Ok((config, false));
    }

    let config = BrowseConfig::default();
    save_config(path, &config)?;
    Ok((config, true))
}

pub fn save_config(path: &Path, config: &BrowseConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let contents = serde_yaml::to_string(config)?;
    fs::write(path, contents)?;
    Ok(())
}

pub fn resolve_path(config_path: &Path, value: &str) -> PathBuf {
    let raw = PathBuf::from(value);
    if raw.is_absolute() {
        return raw;
    }
    let base = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    base.join(raw)
}
