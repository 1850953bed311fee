use std::sync::Arc;

use common::Folder;

use crate::events::ViewKind;
use crate::loader::Paging;
use crate::session::BrowseContext;
use crate::viewmodel::{library_changes, CollectionViewModel};

pub type FoldersView = CollectionViewModel<Folder>;

pub fn folders_view(ctx: &BrowseContext) -> FoldersView {
    let paging: Paging<Folder> = Paging::InMemory(Arc::new(ctx.catalog.clone()));
    super::build_view(ctx, ViewKind::Folders, paging, library_changes)
}
