use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use browse::config::{config_path_from_env, load_or_create_config};
use browse::views::{albums_view, artists_view, folders_view, genres_view, playlists_view};
use browse::{
    BrowseContext, CollectionViewModel, LoadOutcome, PlaybackQueue, Session, SortKind, SortSpec,
};
use common::{DisplayEntity, Track};
use tracing::info;
use tracing_subscriber::EnvFilter;

struct LogQueue;

impl PlaybackQueue for LogQueue {
    fn play(&self, tracks: Vec<Track>, start_index: usize) {
        let first = tracks.get(start_index).map(|t| t.title.as_str()).unwrap_or("-");
        info!("play {} tracks starting with {}", tracks.len(), first);
    }

    fn enqueue(&self, tracks: Vec<Track>) {
        info!("enqueue {} tracks", tracks.len());
    }
}

async fn load_all<T: DisplayEntity>(view: &CollectionViewModel<T>) -> usize {
    loop {
        match view.load_more().await {
            LoadOutcome::Loaded { .. } => continue,
            LoadOutcome::Busy => tokio::task::yield_now().await,
            _ => break,
        }
    }
    view.loader().len()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(config_path_from_env);
    let (config, created) = load_or_create_config(&config_path)?;
    if created {
        info!("Wrote default config to {:?}", config_path);
    }

    let (ctx, _ui_thread) = BrowseContext::open(config, &config_path, Arc::new(LogQueue))?;
    let stats = ctx.catalog.stats();
    println!(
        "Library: {} artists, {} albums, {} tracks",
        stats.artists, stats.albums, stats.tracks
    );

    let albums = albums_view(&ctx);
    let artists = artists_view(&ctx);
    let genres = genres_view(&ctx);
    let folders = folders_view(&ctx);
    let playlists = playlists_view(&ctx);

    println!("albums:    {}", load_all(&albums).await);
    println!("artists:   {}", load_all(&artists).await);
    println!("genres:    {}", load_all(&genres).await);
    println!("folders:   {}", load_all(&folders).await);
    println!("playlists: {}", load_all(&playlists).await);

    albums.set_sort(SortSpec::descending(SortKind::Year)).await;
    for key in albums.loader().keys().into_iter().take(2) {
        albums.toggle(&key);
    }
    ctx.ui.flush().await?;
    if albums.has_selection() {
        let count = albums.play_selected()?;
        println!("queued {} tracks from the two newest albums", count);
    }

    let session = Session::new(ctx.clone());
    for profile in ctx.catalog.profiles() {
        if profile.id != ctx.catalog.active_profile() {
            session.switch_profile(&profile.id)?;
            println!("switched to profile {}", profile.name);
            break;
        }
    }

    albums.shutdown();
    artists.shutdown();
    genres.shutdown();
    folders.shutdown();
    playlists.shutdown();
    Ok(())
}
