//! Catalog-backed data sources for every browse kind.

use common::{Album, Artist, Folder, Genre, Playlist, Track};
use library::Catalog;

use crate::commands::TrackSource;
use crate::error::SourceError;
use crate::loader::{CollectionSource, PagedSource};
use crate::sort::{KeySorter, SortKind, SortSpec, Sorter};

impl CollectionSource<Album> for Catalog {
    fn get_all(&self) -> Result<Vec<Album>, SourceError> {
        Ok(self.all_albums())
    }
}

impl CollectionSource<Genre> for Catalog {
    fn get_all(&self) -> Result<Vec<Genre>, SourceError> {
        Ok(self.list_genres())
    }
}

impl CollectionSource<Folder> for Catalog {
    fn get_all(&self) -> Result<Vec<Folder>, SourceError> {
        Ok(self.list_folders())
    }
}

impl CollectionSource<Playlist> for Catalog {
    fn get_all(&self) -> Result<Vec<Playlist>, SourceError> {
        Ok(self.list_playlists())
    }
}

/// Artists are served page by page, already in the requested order. The
/// catalog keeps them in name order, so that order pages without a sort.
impl PagedSource<Artist> for Catalog {
    fn get_page(
        &self,
        page: usize,
        size: usize,
        sort: SortSpec,
    ) -> Result<Vec<Artist>, SourceError> {
        let offset = page.saturating_sub(1).saturating_mul(size);
        if sort == SortSpec::ascending(SortKind::Title) {
            let (items, _) = self.list_artists(None, size, offset);
            return Ok(items);
        }
        let sorted = KeySorter.sort_items(&self.all_artists(), sort);
        Ok(sorted.into_iter().skip(offset).take(size).collect())
    }
}

impl TrackSource<Album> for Catalog {
    fn tracks_for(&self, entity: &Album) -> Result<Vec<Track>, SourceError> {
        Ok(self.get_album_tracks(&entity.id))
    }
}

impl TrackSource<Artist> for Catalog {
    fn tracks_for(&self, entity: &Artist) -> Result<Vec<Track>, SourceError> {
        Ok(self.artist_tracks(&entity.id))
    }
}

impl TrackSource<Genre> for Catalog {
    fn tracks_for(&self, entity: &Genre) -> Result<Vec<Track>, SourceError> {
        Ok(self.genre_tracks(&entity.id)?)
    }
}

impl TrackSource<Folder> for Catalog {
    fn tracks_for(&self, entity: &Folder) -> Result<Vec<Track>, SourceError> {
        Ok(self.folder_tracks(&entity.id)?)
    }
}

impl TrackSource<Playlist> for Catalog {
    fn tracks_for(&self, entity: &Playlist) -> Result<Vec<Track>, SourceError> {
        Ok(self.playlist_tracks(&entity.id)?)
    }
}
