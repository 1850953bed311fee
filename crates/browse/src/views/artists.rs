use std::sync::Arc;

use common::Artist;

use crate::events::ViewKind;
use crate::loader::Paging;
use crate::session::BrowseContext;
use crate::viewmodel::{library_changes, CollectionViewModel};

pub type ArtistsView = CollectionViewModel<Artist>;

/// Artists page through the catalog directly instead of holding the full set.
pub fn artists_view(ctx: &BrowseContext) -> ArtistsView {
    let paging: Paging<Artist> = Paging::Paged(Arc::new(ctx.catalog.clone()));
    super::build_view(ctx, ViewKind::Artists, paging, library_changes)
}
