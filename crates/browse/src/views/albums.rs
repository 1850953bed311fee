use std::sync::Arc;

use common::Album;

use crate::events::ViewKind;
use crate::loader::Paging;
use crate::session::BrowseContext;
use crate::viewmodel::{library_changes, CollectionViewModel};

pub type AlbumsView = CollectionViewModel<Album>;

pub fn albums_view(ctx: &BrowseContext) -> AlbumsView {
    let paging: Paging<Album> = Paging::InMemory(Arc::new(ctx.catalog.clone()));
    super::build_view(ctx, ViewKind::Albums, paging, library_changes)
}
