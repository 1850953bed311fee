use std::sync::Arc;

use common::Playlist;

use crate::events::{LibraryEvent, ViewKind};
use crate::loader::Paging;
use crate::session::BrowseContext;
use crate::viewmodel::{library_changes, CollectionViewModel};

pub type PlaylistsView = CollectionViewModel<Playlist>;

/// Likes feed the virtual liked-songs playlist, so they invalidate too.
fn playlist_changes(event: &LibraryEvent) -> bool {
    library_changes(event)
        || matches!(
            event,
            LibraryEvent::TrackLiked { .. } | LibraryEvent::TrackUnliked { .. }
        )
}

pub fn playlists_view(ctx: &BrowseContext) -> PlaylistsView {
    let paging: Paging<Playlist> = Paging::InMemory(Arc::new(ctx.catalog.clone()));
    super::build_view(ctx, ViewKind::Playlists, paging, playlist_changes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::{context, wait_until};
    use crate::session::Session;
    use library::LIKED_PLAYLIST_ID;

    #[tokio::test(flavor = "multi_thread")]
    async fn likes_refresh_the_playlist_list() {
        let (ctx, _queue) = context();
        let view = playlists_view(&ctx);
        view.load_more().await;
        assert_eq!(view.loader().keys(), vec!["p1"]);

        let session = Session::new(ctx.clone());
        session.like_track("t4").unwrap();
        wait_until("liked playlist", || view.loader().len() == 2).await;
        assert!(view.loader().keys().iter().any(|key| key == LIKED_PLAYLIST_ID));

        session.unlike_track("t4").unwrap();
        wait_until("liked playlist removed", || view.loader().keys() == vec!["p1"]).await;
    }

    #[test]
    fn likes_do_not_invalidate_other_kinds() {
        let liked = LibraryEvent::TrackLiked {
            track_id: "t1".to_string(),
        };
        assert!(playlist_changes(&liked));
        assert!(!library_changes(&liked));
        assert!(playlist_changes(&LibraryEvent::LibraryInvalidated));
    }
}
