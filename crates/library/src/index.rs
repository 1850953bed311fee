use std::collections::{BTreeMap, HashMap, HashSet};

use common::{
    folder_name, parent_relpath, stable_id, Album, Artist, CoverRef, Folder, Genre, Playlist, Track,
};
use serde::{Deserialize, Serialize};

/// One profile's worth of library data as stored in the snapshot file.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LibraryData {
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default)]
    pub albums: Vec<Album>,
    #[serde(default)]
    pub tracks: Vec<Track>,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
    #[serde(default)]
    pub likes: Vec<String>,
}

#[derive(Clone, Debug)]
pub(crate) struct IndexedLibrary {
    pub artists: Vec<Artist>,
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
    pub playlists: Vec<Playlist>,
    pub likes: Vec<String>,
    pub genres: Vec<Genre>,
    pub folders: Vec<Folder>,
    artist_pos: HashMap<String, usize>,
    album_pos: HashMap<String, usize>,
    track_pos: HashMap<String, usize>,
    album_tracks: HashMap<String, Vec<usize>>,
    artist_albums: HashMap<String, Vec<usize>>,
    genre_tracks: HashMap<String, Vec<usize>>,
    folder_tracks: HashMap<String, Vec<usize>>,
}

impl IndexedLibrary {
    pub fn build(data: LibraryData) -> Self {
        let LibraryData {
            mut artists,
            mut albums,
            mut tracks,
            playlists,
            likes,
        } = data;

        tracks.sort_by(|a, b| {
            sort_name(&a.title)
                .cmp(&sort_name(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        let track_pos = position_map(tracks.iter().map(|t| t.id.as_str()));

        let mut album_tracks: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, track) in tracks.iter().enumerate() {
            album_tracks
                .entry(track.album_id.clone())
                .or_default()
                .push(idx);
        }
        for indices in album_tracks.values_mut() {
            indices.sort_by(|a, b| compare_album_order(&tracks[*a], &tracks[*b]));
        }

        artists.sort_by(|a, b| {
            sort_name(&a.name)
                .cmp(&sort_name(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        let artist_pos = position_map(artists.iter().map(|a| a.id.as_str()));

        for album in albums.iter_mut() {
            if album.artist_name.is_empty() {
                if let Some(idx) = artist_pos.get(&album.artist_id) {
                    album.artist_name = artists[*idx].name.clone();
                }
            }
            album.track_count = album_tracks.get(&album.id).map(|t| t.len()).unwrap_or(0);
        }
        albums.sort_by(|a, b| {
            sort_name(&a.title)
                .cmp(&sort_name(&b.title))
                .then_with(|| a.id.cmp(&b.id))
        });
        let album_pos = position_map(albums.iter().map(|a| a.id.as_str()));

        let mut artist_albums: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, album) in albums.iter().enumerate() {
            artist_albums
                .entry(album.artist_id.clone())
                .or_default()
                .push(idx);
        }
        for indices in artist_albums.values_mut() {
            indices.sort_by(|a, b| {
                albums[*a]
                    .year
                    .unwrap_or(0)
                    .cmp(&albums[*b].year.unwrap_or(0))
                    .then_with(|| sort_name(&albums[*a].title).cmp(&sort_name(&albums[*b].title)))
            });
        }
        for artist in artists.iter_mut() {
            artist.album_count = artist_albums.get(&artist.id).map(|a| a.len()).unwrap_or(0);
        }

        let (genres, genre_tracks) = derive_genres(&albums, &tracks, &album_pos);
        let (folders, folder_tracks) = derive_folders(&albums, &tracks);

        Self {
            artists,
            albums,
            tracks,
            playlists,
            likes,
            genres,
            folders,
            artist_pos,
            album_pos,
            track_pos,
            album_tracks,
            artist_albums,
            genre_tracks,
            folder_tracks,
        }
    }

    pub fn artist(&self, artist_id: &str) -> Option<&Artist> {
        self.artist_pos.get(artist_id).map(|idx| &self.artists[*idx])
    }

    pub fn album(&self, album_id: &str) -> Option<&Album> {
        self.album_pos.get(album_id).map(|idx| &self.albums[*idx])
    }

    pub fn track(&self, track_id: &str) -> Option<&Track> {
        self.track_pos.get(track_id).map(|idx| &self.tracks[*idx])
    }

    pub fn album_tracks(&self, album_id: &str) -> Vec<Track> {
        self.collect_tracks(self.album_tracks.get(album_id))
    }

    pub fn artist_albums(&self, artist_id: &str) -> Vec<Album> {
        self.artist_albums
            .get(artist_id)
            .map(|indices| indices.iter().map(|idx| self.albums[*idx].clone()).collect())
            .unwrap_or_default()
    }

    pub fn genre_tracks(&self, genre_id: &str) -> Vec<Track> {
        self.collect_tracks(self.genre_tracks.get(genre_id))
    }

    pub fn folder_tracks(&self, folder_id: &str) -> Vec<Track> {
        self.collect_tracks(self.folder_tracks.get(folder_id))
    }

    pub fn has_genre(&self, genre_id: &str) -> bool {
        self.genre_tracks.contains_key(genre_id)
    }

    pub fn has_folder(&self, folder_id: &str) -> bool {
        self.folder_tracks.contains_key(folder_id)
    }

    /// First album cover among the given tracks, falling back to the first
    /// track's embedded art.
    pub fn cover_for_tracks<'a, I>(&self, track_ids: I) -> Option<CoverRef>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut first_track = None;
        for track_id in track_ids {
            let Some(track) = self.track(track_id) else {
                continue;
            };
            if let Some(cover) = self.album(&track.album_id).and_then(|a| a.cover_ref.clone()) {
                return Some(cover);
            }
            if first_track.is_none() {
                first_track = Some(track.id.clone());
            }
        }
        first_track.map(|track_id| CoverRef::Embedded { track_id })
    }

    fn collect_tracks(&self, indices: Option<&Vec<usize>>) -> Vec<Track> {
        indices
            .map(|indices| indices.iter().map(|idx| self.tracks[*idx].clone()).collect())
            .unwrap_or_default()
    }
}

pub(crate) fn sort_name(value: &str) -> String {
    value.trim().to_lowercase()
}

pub(crate) fn compare_album_order(a: &Track, b: &Track) -> std::cmp::Ordering {
    a.disc_no
        .unwrap_or(0)
        .cmp(&b.disc_no.unwrap_or(0))
        .then_with(|| a.track_no.unwrap_or(0).cmp(&b.track_no.unwrap_or(0)))
        .then_with(|| a.title.to_ascii_lowercase().cmp(&b.title.to_ascii_lowercase()))
}

fn position_map<'a, I>(ids: I) -> HashMap<String, usize>
where
    I: Iterator<Item = &'a str>,
{
    ids.enumerate()
        .map(|(idx, id)| (id.to_string(), idx))
        .collect()
}

struct GenreAcc {
    name: String,
    albums: HashSet<usize>,
    tracks: Vec<usize>,
    seen_tracks: HashSet<usize>,
    cover_ref: Option<CoverRef>,
}

fn derive_genres(
    albums: &[Album],
    tracks: &[Track],
    album_pos: &HashMap<String, usize>,
) -> (Vec<Genre>, HashMap<String, Vec<usize>>) {
    let mut acc: BTreeMap<String, GenreAcc> = BTreeMap::new();

    let mut add = |name: &str, album_idx: Option<usize>, track_idx: Option<usize>| {
        let key = sort_name(name);
        if key.is_empty() {
            return;
        }
        let entry = acc.entry(key).or_insert_with(|| GenreAcc {
            name: name.trim().to_string(),
            albums: HashSet::new(),
            tracks: Vec::new(),
            seen_tracks: HashSet::new(),
            cover_ref: None,
        });
        if let Some(album_idx) = album_idx {
            entry.albums.insert(album_idx);
            if entry.cover_ref.is_none() {
                entry.cover_ref = albums[album_idx].cover_ref.clone();
            }
        }
        if let Some(track_idx) = track_idx {
            if entry.seen_tracks.insert(track_idx) {
                entry.tracks.push(track_idx);
            }
        }
    };

    for (track_idx, track) in tracks.iter().enumerate() {
        let album_idx = album_pos.get(&track.album_id).copied();
        for genre in &track.genres {
            add(genre, album_idx, Some(track_idx));
        }
        if let Some(album_idx) = album_idx {
            for genre in &albums[album_idx].genres {
                add(genre, Some(album_idx), Some(track_idx));
            }
        }
    }
    for (album_idx, album) in albums.iter().enumerate() {
        for genre in &album.genres {
            add(genre, Some(album_idx), None);
        }
    }

    let mut genres = Vec::with_capacity(acc.len());
    let mut genre_tracks = HashMap::with_capacity(acc.len());
    for (key, mut entry) in acc {
        let id = stable_id(&format!("genre:{}", key));
        entry
            .tracks
            .sort_by(|a, b| compare_album_order(&tracks[*a], &tracks[*b]));
        genres.push(Genre {
            id: id.clone(),
            name: entry.name,
            album_count: entry.albums.len(),
            track_count: entry.tracks.len(),
            cover_ref: entry.cover_ref,
        });
        genre_tracks.insert(id, entry.tracks);
    }
    (genres, genre_tracks)
}

fn derive_folders(
    albums: &[Album],
    tracks: &[Track],
) -> (Vec<Folder>, HashMap<String, Vec<usize>>) {
    let mut grouped: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, track) in tracks.iter().enumerate() {
        grouped
            .entry(parent_relpath(&track.file_relpath).to_string())
            .or_default()
            .push(idx);
    }

    let album_covers: HashMap<&str, &CoverRef> = albums
        .iter()
        .filter_map(|album| {
            album
                .cover_ref
                .as_ref()
                .map(|cover| (album.folder_relpath.trim_end_matches('/'), cover))
        })
        .collect();

    let mut folders = Vec::with_capacity(grouped.len());
    let mut folder_tracks = HashMap::with_capacity(grouped.len());
    for (relpath, mut indices) in grouped {
        indices.sort_by(|a, b| {
            tracks[*a]
                .file_relpath
                .cmp(&tracks[*b].file_relpath)
        });
        let cover_ref = album_covers
            .get(relpath.as_str())
            .map(|cover| (*cover).clone())
            .or_else(|| {
                indices.first().map(|idx| CoverRef::Embedded {
                    track_id: tracks[*idx].id.clone(),
                })
            });
        let name = if relpath.is_empty() {
            "Music".to_string()
        } else {
            folder_name(&relpath).to_string()
        };
        let id = stable_id(&format!("folder:{}", relpath));
        folders.push(Folder {
            id: id.clone(),
            relpath,
            name,
            track_count: indices.len(),
            cover_ref,
        });
        folder_tracks.insert(id, indices);
    }
    (folders, folder_tracks)
}
