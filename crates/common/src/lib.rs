use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Anything a browse list can show: a stable identity, a title and an
/// optional artwork reference.
pub trait DisplayEntity: Clone + Send + Sync + 'static {
    fn key(&self) -> &str;
    fn title(&self) -> &str;
    fn cover_ref(&self) -> Option<&CoverRef> {
        None
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub photo_ref: Option<CoverRef>,
    #[serde(default)]
    pub album_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub artist_id: String,
    #[serde(default)]
    pub artist_name: String,
    pub title: String,
    pub year: Option<i32>,
    pub folder_relpath: String,
    pub cover_ref: Option<CoverRef>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub added_at: Option<u64>,
    #[serde(default)]
    pub track_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub album_id: String,
    pub artist_id: String,
    pub title: String,
    pub track_no: Option<u16>,
    pub disc_no: Option<u16>,
    pub duration_ms: u32,
    pub file_relpath: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// Derived from track and album tags; never stored.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genre {
    pub id: String,
    pub name: String,
    pub album_count: usize,
    pub track_count: usize,
    pub cover_ref: Option<CoverRef>,
}

/// A directory under the music root that directly holds tracks.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub relpath: String,
    pub name: String,
    pub track_count: usize,
    pub cover_ref: Option<CoverRef>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub track_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<u64>,
    #[serde(default)]
    pub cover_ref: Option<CoverRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverRef {
    Embedded { track_id: String },
    File { relpath: String },
}

impl CoverRef {
    pub fn cache_key(&self) -> String {
        match self {
            CoverRef::Embedded { track_id } => format!("embedded:{}", track_id),
            CoverRef::File { relpath } => format!("file:{}", relpath),
        }
    }
}

/// Coarse artwork resolution. Lists start with `Low` and upgrade to `High`
/// once an item has been on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceTag {
    Low,
    High,
}

impl DisplayEntity for Artist {
    fn key(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn cover_ref(&self) -> Option<&CoverRef> {
        self.photo_ref.as_ref()
    }
}

impl DisplayEntity for Album {
    fn key(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn cover_ref(&self) -> Option<&CoverRef> {
        self.cover_ref.as_ref()
    }
}

impl DisplayEntity for Genre {
    fn key(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn cover_ref(&self) -> Option<&CoverRef> {
        self.cover_ref.as_ref()
    }
}

impl DisplayEntity for Folder {
    fn key(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn cover_ref(&self) -> Option<&CoverRef> {
        self.cover_ref.as_ref()
    }
}

impl DisplayEntity for Playlist {
    fn key(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.name
    }

    fn cover_ref(&self) -> Option<&CoverRef> {
        self.cover_ref.as_ref()
    }
}

pub fn stable_id(input: &str) -> String {
    blake3::hash(input.as_bytes()).to_hex().to_string()
}

pub fn join_relpath(root: &Path, relpath: &str) -> PathBuf {
    let mut out = PathBuf::from(root);
    for part in relpath.split('/') {
        if part.is_empty() {
            continue;
        }
        out.push(part);
    }
    out
}

/// Parent directory of a slash separated relpath; `""` for top level files.
pub fn parent_relpath(relpath: &str) -> &str {
    let trimmed = relpath.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[..idx],
        None => "",
    }
}

pub fn folder_name(relpath: &str) -> &str {
    let trimmed = relpath.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

#[cfg(test)]
mod tests {
    use super::{folder_name, join_relpath, parent_relpath, stable_id, CoverRef};
    use std::path::{Path, PathBuf};

    #[test]
    fn stable_id_is_deterministic() {
        let first = stable_id("genre:jazz");
        let second = stable_id("genre:jazz");
        assert_eq!(first, second);
        assert_ne!(first, stable_id("genre:rock"));
    }

    #[test]
    fn parent_of_nested_relpath() {
        assert_eq!(parent_relpath("Artist/Album/01.flac"), "Artist/Album");
        assert_eq!(parent_relpath("01.flac"), "");
        assert_eq!(parent_relpath("Artist/Album/"), "Artist");
    }

    #[test]
    fn folder_name_is_last_segment() {
        assert_eq!(folder_name("Artist/Album"), "Album");
        assert_eq!(folder_name("Album"), "Album");
        assert_eq!(folder_name(""), "");
    }

    #[test]
    fn join_skips_empty_segments() {
        let path = join_relpath(Path::new("/music"), "a//b/cover.jpg");
        assert_eq!(path, PathBuf::from("/music/a/b/cover.jpg"));
    }

    #[test]
    fn cover_cache_keys_differ_by_kind() {
        let embedded = CoverRef::Embedded {
            track_id: "x".to_string(),
        };
        let file = CoverRef::File {
            relpath: "x".to_string(),
        };
        assert_ne!(embedded.cache_key(), file.cache_key());
    }
}
