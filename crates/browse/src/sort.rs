use std::cmp::Ordering;

use common::{Album, Artist, DisplayEntity, Folder, Genre, Playlist};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKind {
    Title,
    Artist,
    Year,
    TrackCount,
    AlbumCount,
    DateAdded,
}

impl SortKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "title" | "name" => Some(Self::Title),
            "artist" => Some(Self::Artist),
            "year" => Some(Self::Year),
            "tracks" | "track_count" => Some(Self::TrackCount),
            "albums" | "album_count" => Some(Self::AlbumCount),
            "added" | "date_added" => Some(Self::DateAdded),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub kind: SortKind,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn new(kind: SortKind, direction: SortDirection) -> Self {
        Self { kind, direction }
    }

    pub fn ascending(kind: SortKind) -> Self {
        Self::new(kind, SortDirection::Ascending)
    }

    pub fn descending(kind: SortKind) -> Self {
        Self::new(kind, SortDirection::Descending)
    }
}

impl Default for SortSpec {
    fn default() -> Self {
        Self::ascending(SortKind::Title)
    }
}

/// A comparable sort value. `Missing` always lands after present values,
/// whatever the direction.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Number(i64),
    Text(String),
    Missing,
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        SortKey::Text(value.trim().to_lowercase())
    }
}

pub trait SortKeys: DisplayEntity {
    fn sort_key(&self, kind: SortKind) -> SortKey;

    fn secondary_key(&self) -> SortKey {
        SortKey::text(self.title())
    }
}

/// The sort service contract: return `items` ordered by `spec`.
pub trait Sorter<T>: Send + Sync {
    fn sort_items(&self, items: &[T], spec: SortSpec) -> Vec<T>;
}

/// Sorts by [`SortKeys`], breaking ties by the secondary key and then by
/// identity so the order is total.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeySorter;

impl<T: SortKeys> Sorter<T> for KeySorter {
    fn sort_items(&self, items: &[T], spec: SortSpec) -> Vec<T> {
        sort_by_keys(
            items,
            spec.direction,
            |item| item.sort_key(spec.kind),
            |item| item.secondary_key(),
        )
    }
}

pub fn sort_by_keys<T, P, S>(
    items: &[T],
    direction: SortDirection,
    primary: P,
    secondary: S,
) -> Vec<T>
where
    T: DisplayEntity,
    P: Fn(&T) -> SortKey,
    S: Fn(&T) -> SortKey,
{
    let mut keyed: Vec<(SortKey, SortKey, usize)> = items
        .iter()
        .enumerate()
        .map(|(idx, item)| (primary(item), secondary(item), idx))
        .collect();
    keyed.sort_by(|a, b| {
        compare_primary(&a.0, &b.0, direction)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| items[a.2].key().cmp(items[b.2].key()))
    });
    keyed.into_iter().map(|(_, _, idx)| items[idx].clone()).collect()
}

fn compare_primary(a: &SortKey, b: &SortKey, direction: SortDirection) -> Ordering {
    match (a, b) {
        (SortKey::Missing, SortKey::Missing) => Ordering::Equal,
        (SortKey::Missing, _) => Ordering::Greater,
        (_, SortKey::Missing) => Ordering::Less,
        _ => match direction {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        },
    }
}

fn count_key(value: usize) -> SortKey {
    SortKey::Number(value as i64)
}

impl SortKeys for Album {
    fn sort_key(&self, kind: SortKind) -> SortKey {
        match kind {
            SortKind::Title => SortKey::text(&self.title),
            SortKind::Artist => SortKey::text(&self.artist_name),
            SortKind::Year => self
                .year
                .map(|year| SortKey::Number(year as i64))
                .unwrap_or(SortKey::Missing),
            SortKind::TrackCount => count_key(self.track_count),
            SortKind::DateAdded => self
                .added_at
                .map(|at| SortKey::Number(at as i64))
                .unwrap_or(SortKey::Missing),
            SortKind::AlbumCount => SortKey::Missing,
        }
    }
}

impl SortKeys for Artist {
    fn sort_key(&self, kind: SortKind) -> SortKey {
        match kind {
            SortKind::Title | SortKind::Artist => SortKey::text(&self.name),
            SortKind::AlbumCount => count_key(self.album_count),
            _ => SortKey::Missing,
        }
    }
}

impl SortKeys for Genre {
    fn sort_key(&self, kind: SortKind) -> SortKey {
        match kind {
            SortKind::Title => SortKey::text(&self.name),
            SortKind::TrackCount => count_key(self.track_count),
            SortKind::AlbumCount => count_key(self.album_count),
            _ => SortKey::Missing,
        }
    }
}

impl SortKeys for Folder {
    fn sort_key(&self, kind: SortKind) -> SortKey {
        match kind {
            SortKind::Title => SortKey::text(&self.name),
            SortKind::TrackCount => count_key(self.track_count),
            _ => SortKey::Missing,
        }
    }

    fn secondary_key(&self) -> SortKey {
        SortKey::text(&self.relpath)
    }
}

impl SortKeys for Playlist {
    fn sort_key(&self, kind: SortKind) -> SortKey {
        match kind {
            SortKind::Title => SortKey::text(&self.name),
            SortKind::TrackCount => count_key(self.track_ids.len()),
            SortKind::DateAdded => self
                .created_at
                .map(|at| SortKey::Number(at as i64))
                .unwrap_or(SortKey::Missing),
            _ => SortKey::Missing,
        }
    }
}
