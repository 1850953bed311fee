//! Per-kind browse view-models wired against the catalog.

mod albums;
mod artists;
mod folders;
mod genres;
mod playlists;

use std::sync::Arc;

use library::Catalog;

use crate::commands::{Commands, TrackSource};
use crate::enrich::CoverEnricher;
use crate::events::ViewKind;
use crate::loader::{LoaderBuilder, Paging};
use crate::session::BrowseContext;
use crate::sort::SortKeys;
use crate::viewmodel::{CollectionViewModel, InvalidationFilter};

pub use albums::{albums_view, AlbumsView};
pub use artists::{artists_view, ArtistsView};
pub use folders::{folders_view, FoldersView};
pub use genres::{genres_view, GenresView};
pub use playlists::{playlists_view, PlaylistsView};

fn build_view<T>(
    ctx: &BrowseContext,
    kind: ViewKind,
    paging: Paging<T>,
    invalidated_by: InvalidationFilter,
) -> CollectionViewModel<T>
where
    T: SortKeys,
    Catalog: TrackSource<T>,
{
    let covers = Arc::new(CoverEnricher::new(ctx.catalog.clone()));
    let loader = LoaderBuilder::new(kind.as_str(), ctx.ui.clone(), paging)
        .enricher(covers.clone())
        .hints(covers)
        .options(ctx.config.view(kind).loader_options())
        .build();
    let commands = Commands::new(Arc::new(ctx.catalog.clone()), Arc::clone(&ctx.queue));
    CollectionViewModel::new(kind, loader, commands, ctx.hub.clone(), invalidated_by)
}
