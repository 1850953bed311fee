mod index;

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use common::{join_relpath, Album, Artist, CoverRef, Folder, Genre, Playlist, ResourceTag, Track};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use index::{sort_name, IndexedLibrary};
pub use index::LibraryData;

pub const LIKED_PLAYLIST_ID: &str = "liked";
pub const DEFAULT_PROFILE_ID: &str = "default";
const THUMB_EDGE: u32 = 256;

/// On-disk library snapshot: every profile with its own library view.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LibrarySnapshot {
    #[serde(default)]
    pub active_profile: Option<String>,
    #[serde(default)]
    pub profiles: Vec<ProfileSnapshot>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub library: LibraryData,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileInfo {
    pub id: String,
    pub name: String,
}

/// Where a cover image lives and how large it should be decoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverLocation {
    pub source: PathBuf,
    pub embedded: bool,
    pub max_edge: Option<u32>,
}

/// Shared handle over the in-memory library. Cloning is cheap; all clones see
/// the same profiles, likes and visibility hints.
#[derive(Clone)]
pub struct Catalog {
    root: PathBuf,
    state: Arc<RwLock<CatalogState>>,
    visible: Arc<RwLock<HashSet<String>>>,
}

struct CatalogState {
    active: String,
    profiles: Vec<Profile>,
}

struct Profile {
    info: ProfileInfo,
    library: Arc<IndexedLibrary>,
}

impl Catalog {
    pub fn load(root: PathBuf, snapshot_path: &Path) -> Result<Self, LibraryError> {
        let contents = fs::read_to_string(snapshot_path)?;
        let snapshot: LibrarySnapshot = serde_json::from_str(&contents)?;
        let catalog = Self::from_snapshot(root, snapshot)?;
        info!("Loaded library snapshot from {:?}", snapshot_path);
        Ok(catalog)
    }

    pub fn from_snapshot(root: PathBuf, snapshot: LibrarySnapshot) -> Result<Self, LibraryError> {
        let state = build_state(snapshot, None)?;
        Ok(Self {
            root,
            state: Arc::new(RwLock::new(state)),
            visible: Arc::new(RwLock::new(HashSet::new())),
        })
    }

    /// Swap in a new snapshot. The active profile is kept when the new
    /// snapshot still has it.
    pub fn replace_snapshot(
        &self,
        snapshot: LibrarySnapshot,
    ) -> Result<LibraryStats, LibraryError> {
        let mut guard = self.state.write();
        let next = build_state(snapshot, Some(&guard.active))?;
        *guard = next;
        drop(guard);
        self.visible.write().clear();
        let stats = self.stats();
        info!(
            "Library replaced: {} artists, {} albums, {} tracks",
            stats.artists, stats.albums, stats.tracks
        );
        Ok(stats)
    }

    pub fn reload(&self, snapshot_path: &Path) -> Result<LibraryStats, LibraryError> {
        let contents = fs::read_to_string(snapshot_path)?;
        let snapshot: LibrarySnapshot = serde_json::from_str(&contents)?;
        self.replace_snapshot(snapshot)
    }

    pub fn stats(&self) -> LibraryStats {
        let library = self.active();
        LibraryStats {
            artists: library.artists.len(),
            albums: library.albums.len(),
            tracks: library.tracks.len(),
        }
    }

    pub fn active_profile(&self) -> String {
        self.state.read().active.clone()
    }

    pub fn profiles(&self) -> Vec<ProfileInfo> {
        self.state
            .read()
            .profiles
            .iter()
            .map(|p| p.info.clone())
            .collect()
    }

    /// Returns `false` when `profile_id` was already active.
    pub fn switch_profile(&self, profile_id: &str) -> Result<bool, LibraryError> {
        let mut guard = self.state.write();
        if !guard.profiles.iter().any(|p| p.info.id == profile_id) {
            return Err(LibraryError::UnknownProfile(profile_id.to_string()));
        }
        if guard.active == profile_id {
            return Ok(false);
        }
        guard.active = profile_id.to_string();
        drop(guard);
        self.visible.write().clear();
        info!("Switched to profile {}", profile_id);
        Ok(true)
    }

    pub fn list_artists(
        &self,
        search: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<Artist>, usize) {
        let library = self.active();
        page_matching(&library.artists, search, limit, offset, |a| &a.name)
    }

    pub fn all_artists(&self) -> Vec<Artist> {
        self.active().artists.clone()
    }

    pub fn get_artist(&self, artist_id: &str) -> Option<Artist> {
        self.active().artist(artist_id).cloned()
    }

    pub fn artist_tracks(&self, artist_id: &str) -> Vec<Track> {
        let library = self.active();
        let mut tracks = Vec::new();
        for album in library.artist_albums(artist_id) {
            tracks.append(&mut library.album_tracks(&album.id));
        }
        tracks
    }

    pub fn all_albums(&self) -> Vec<Album> {
        self.active().albums.clone()
    }

    pub fn get_album(&self, album_id: &str) -> Option<Album> {
        self.active().album(album_id).cloned()
    }

    pub fn get_album_tracks(&self, album_id: &str) -> Vec<Track> {
        self.active().album_tracks(album_id)
    }

    pub fn get_track(&self, track_id: &str) -> Option<Track> {
        self.active().track(track_id).cloned()
    }

    pub fn list_genres(&self) -> Vec<Genre> {
        self.active().genres.clone()
    }

    pub fn genre_tracks(&self, genre_id: &str) -> Result<Vec<Track>, LibraryError> {
        let library = self.active();
        if !library.has_genre(genre_id) {
            return Err(LibraryError::NotFound(format!("genre {}", genre_id)));
        }
        Ok(library.genre_tracks(genre_id))
    }

    pub fn list_folders(&self) -> Vec<Folder> {
        self.active().folders.clone()
    }

    pub fn folder_tracks(&self, folder_id: &str) -> Result<Vec<Track>, LibraryError> {
        let library = self.active();
        if !library.has_folder(folder_id) {
            return Err(LibraryError::NotFound(format!("folder {}", folder_id)));
        }
        Ok(library.folder_tracks(folder_id))
    }

    /// Stored playlists, preceded by a virtual "Liked Songs" playlist when the
    /// active profile has likes.
    pub fn list_playlists(&self) -> Vec<Playlist> {
        let library = self.active();
        let mut items = Vec::with_capacity(library.playlists.len() + 1);
        if !library.likes.is_empty() {
            items.push(Playlist {
                id: LIKED_PLAYLIST_ID.to_string(),
                name: "Liked Songs".to_string(),
                track_ids: library.likes.clone(),
                created_at: None,
                cover_ref: library.cover_for_tracks(library.likes.iter()),
            });
        }
        for playlist in &library.playlists {
            let mut playlist = playlist.clone();
            if playlist.cover_ref.is_none() {
                playlist.cover_ref = library.cover_for_tracks(playlist.track_ids.iter());
            }
            items.push(playlist);
        }
        items
    }

    pub fn get_playlist(&self, playlist_id: &str) -> Option<Playlist> {
        self.list_playlists()
            .into_iter()
            .find(|playlist| playlist.id == playlist_id)
    }

    /// Tracks of a playlist in playlist order. Ids that no longer resolve are
    /// skipped.
    pub fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, LibraryError> {
        let playlist = self
            .get_playlist(playlist_id)
            .ok_or_else(|| LibraryError::NotFound(format!("playlist {}", playlist_id)))?;
        let library = self.active();
        Ok(playlist
            .track_ids
            .iter()
            .filter_map(|track_id| library.track(track_id).cloned())
            .collect())
    }

    /// Returns `false` when the track was already liked.
    pub fn like_track(&self, track_id: &str) -> Result<bool, LibraryError> {
        self.with_active_mut(|library| {
            if library.track(track_id).is_none() {
                return Err(LibraryError::NotFound(format!("track {}", track_id)));
            }
            if library.likes.iter().any(|id| id == track_id) {
                return Ok(false);
            }
            library.likes.push(track_id.to_string());
            Ok(true)
        })
    }

    /// Returns `false` when the track was not liked.
    pub fn unlike_track(&self, track_id: &str) -> Result<bool, LibraryError> {
        self.with_active_mut(|library| {
            let before = library.likes.len();
            library.likes.retain(|id| id != track_id);
            Ok(library.likes.len() != before)
        })
    }

    pub fn resolve_cover(
        &self,
        cover_ref: &CoverRef,
        tag: ResourceTag,
    ) -> Result<CoverLocation, LibraryError> {
        let max_edge = match tag {
            ResourceTag::Low => Some(THUMB_EDGE),
            ResourceTag::High => None,
        };
        match cover_ref {
            CoverRef::File { relpath } => {
                if relpath.trim().is_empty() {
                    return Err(LibraryError::NotFound("cover file".to_string()));
                }
                Ok(CoverLocation {
                    source: join_relpath(&self.root, relpath),
                    embedded: false,
                    max_edge,
                })
            }
            CoverRef::Embedded { track_id } => {
                let track = self
                    .get_track(track_id)
                    .ok_or_else(|| LibraryError::NotFound(format!("track {}", track_id)))?;
                Ok(CoverLocation {
                    source: join_relpath(&self.root, &track.file_relpath),
                    embedded: true,
                    max_edge,
                })
            }
        }
    }

    /// Visibility hint from a list; visible covers are fetched first.
    pub fn notify_visible(&self, cover_ref: &CoverRef, visible: bool) {
        let key = cover_ref.cache_key();
        let mut guard = self.visible.write();
        if visible {
            guard.insert(key);
        } else {
            guard.remove(&key);
        }
        debug!("{} covers visible", guard.len());
    }

    pub fn is_visible(&self, cover_ref: &CoverRef) -> bool {
        self.visible.read().contains(&cover_ref.cache_key())
    }

    pub fn visible_count(&self) -> usize {
        self.visible.read().len()
    }

    fn active(&self) -> Arc<IndexedLibrary> {
        let guard = self.state.read();
        guard
            .profiles
            .iter()
            .find(|p| p.info.id == guard.active)
            .map(|p| Arc::clone(&p.library))
            .unwrap_or_else(|| Arc::new(IndexedLibrary::build(LibraryData::default())))
    }

    fn with_active_mut<R>(
        &self,
        f: impl FnOnce(&mut IndexedLibrary) -> Result<R, LibraryError>,
    ) -> Result<R, LibraryError> {
        let mut guard = self.state.write();
        let active = guard.active.clone();
        let profile = guard
            .profiles
            .iter_mut()
            .find(|p| p.info.id == active)
            .ok_or(LibraryError::UnknownProfile(active))?;
        f(Arc::make_mut(&mut profile.library))
    }
}

fn build_state(
    snapshot: LibrarySnapshot,
    keep_active: Option<&str>,
) -> Result<CatalogState, LibraryError> {
    let mut profiles: Vec<Profile> = snapshot
        .profiles
        .into_iter()
        .map(|profile| {
            let name = if profile.name.trim().is_empty() {
                profile.id.clone()
            } else {
                profile.name
            };
            Profile {
                info: ProfileInfo {
                    id: profile.id,
                    name,
                },
                library: Arc::new(IndexedLibrary::build(profile.library)),
            }
        })
        .collect();
    if profiles.is_empty() {
        profiles.push(Profile {
            info: ProfileInfo {
                id: DEFAULT_PROFILE_ID.to_string(),
                name: "Default".to_string(),
            },
            library: Arc::new(IndexedLibrary::build(LibraryData::default())),
        });
    }

    let has = |id: &str| profiles.iter().any(|p| p.info.id == id);
    let active = match (keep_active, snapshot.active_profile) {
        (Some(current), _) if has(current) => current.to_string(),
        (_, Some(requested)) => {
            if !has(&requested) {
                return Err(LibraryError::UnknownProfile(requested));
            }
            requested
        }
        _ => profiles[0].info.id.clone(),
    };
    Ok(CatalogState { active, profiles })
}

fn page_matching<T: Clone>(
    items: &[T],
    search: Option<&str>,
    limit: usize,
    offset: usize,
    name: impl Fn(&T) -> &str,
) -> (Vec<T>, usize) {
    let search = search
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(|value| value.to_lowercase());

    let mut total = 0usize;
    let mut out = Vec::new();
    for item in items {
        if let Some(search) = &search {
            if !sort_name(name(item)).contains(search) {
                continue;
            }
        }
        total += 1;
        if total <= offset {
            continue;
        }
        if out.len() >= limit {
            continue;
        }
        out.push(item.clone());
    }
    (out, total)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryStats {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

#[derive(Debug)]
pub enum LibraryError {
    Io(std::io::Error),
    Json(serde_json::Error),
    UnknownProfile(String),
    NotFound(String),
}

impl std::fmt::Display for LibraryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryError::Io(err) => write!(f, "io error: {}", err),
            LibraryError::Json(err) => write!(f, "snapshot error: {}", err),
            LibraryError::UnknownProfile(id) => write!(f, "unknown profile: {}", id),
            LibraryError::NotFound(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for LibraryError {}

impl From<std::io::Error> for LibraryError {
    fn from(err: std::io::Error) -> Self {
        LibraryError::Io(err)
    }
}

impl From<serde_json::Error> for LibraryError {
    fn from(err: serde_json::Error) -> Self {
        LibraryError::Json(err)
    }
}
