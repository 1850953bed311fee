use std::sync::Arc;

use common::Genre;

use crate::events::ViewKind;
use crate::loader::Paging;
use crate::session::BrowseContext;
use crate::viewmodel::{library_changes, CollectionViewModel};

pub type GenresView = CollectionViewModel<Genre>;

pub fn genres_view(ctx: &BrowseContext) -> GenresView {
    let paging: Paging<Genre> = Paging::InMemory(Arc::new(ctx.catalog.clone()));
    super::build_view(ctx, ViewKind::Genres, paging, library_changes)
}
