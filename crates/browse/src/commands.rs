use std::sync::Arc;

use common::{DisplayEntity, Track};
use rand::seq::SliceRandom;
use tracing::info;

use crate::error::SourceError;

/// Entry point into the playback subsystem. No feedback is expected.
pub trait PlaybackQueue: Send + Sync {
    fn play(&self, tracks: Vec<Track>, start_index: usize);
    fn enqueue(&self, tracks: Vec<Track>);
}

/// Resolves a browse entity to its tracks in playback order.
pub trait TrackSource<T>: Send + Sync {
    fn tracks_for(&self, entity: &T) -> Result<Vec<Track>, SourceError>;
}

#[derive(Debug)]
pub enum CommandError {
    NothingSelected,
    NoTracks,
    Source(SourceError),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::NothingSelected => write!(f, "nothing selected"),
            CommandError::NoTracks => write!(f, "selection has no playable tracks"),
            CommandError::Source(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<SourceError> for CommandError {
    fn from(err: SourceError) -> Self {
        CommandError::Source(err)
    }
}

/// Play and queue commands for one kind of entity.
pub struct Commands<T> {
    tracks: Arc<dyn TrackSource<T>>,
    queue: Arc<dyn PlaybackQueue>,
}

impl<T> Clone for Commands<T> {
    fn clone(&self) -> Self {
        Self {
            tracks: Arc::clone(&self.tracks),
            queue: Arc::clone(&self.queue),
        }
    }
}

impl<T: DisplayEntity> Commands<T> {
    pub fn new(tracks: Arc<dyn TrackSource<T>>, queue: Arc<dyn PlaybackQueue>) -> Self {
        Self { tracks, queue }
    }

    /// Replace the queue with the tracks of `entities` and start at the first.
    pub fn play(&self, entities: &[T]) -> Result<usize, CommandError> {
        let tracks = self.collect(entities)?;
        let count = tracks.len();
        info!("Playing {} tracks from {} items", count, entities.len());
        self.queue.play(tracks, 0);
        Ok(count)
    }

    /// Play one entity starting at `track_id`, or at its first track when the
    /// id is not part of it.
    pub fn play_from(&self, entity: &T, track_id: &str) -> Result<usize, CommandError> {
        let tracks = self.collect(std::slice::from_ref(entity))?;
        let start = tracks
            .iter()
            .position(|track| track.id == track_id)
            .unwrap_or(0);
        let count = tracks.len();
        info!("Playing {} from track {}", entity.title(), start);
        self.queue.play(tracks, start);
        Ok(count)
    }

    pub fn enqueue(&self, entities: &[T]) -> Result<usize, CommandError> {
        let tracks = self.collect(entities)?;
        let count = tracks.len();
        info!("Queued {} tracks", count);
        self.queue.enqueue(tracks);
        Ok(count)
    }

    pub fn shuffle(&self, entities: &[T]) -> Result<usize, CommandError> {
        let mut tracks = self.collect(entities)?;
        let mut rng = rand::rng();
        tracks.shuffle(&mut rng);
        let count = tracks.len();
        info!("Shuffling {} tracks", count);
        self.queue.play(tracks, 0);
        Ok(count)
    }

    fn collect(&self, entities: &[T]) -> Result<Vec<Track>, CommandError> {
        if entities.is_empty() {
            return Err(CommandError::NothingSelected);
        }
        let mut tracks = Vec::new();
        for entity in entities {
            let mut entity_tracks = self.tracks.tracks_for(entity)?;
            tracks.append(&mut entity_tracks);
        }
        if tracks.is_empty() {
            return Err(CommandError::NoTracks);
        }
        Ok(tracks)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{QueueCall, RecordingQueue};
    use super::*;
    use common::Genre;

    fn track(id: &str) -> Track {
        Track {
            id: id.to_string(),
            album_id: "al".to_string(),
            artist_id: "ar".to_string(),
            title: id.to_uppercase(),
            track_no: None,
            disc_no: None,
            duration_ms: 0,
            file_relpath: format!("{}.flac", id),
            genres: Vec::new(),
        }
    }

    fn genre(id: &str) -> Genre {
        Genre {
            id: id.to_string(),
            name: id.to_string(),
            album_count: 1,
            track_count: 2,
            cover_ref: None,
        }
    }

    /// Every genre resolves to `<id>-1`, `<id>-2`; "empty" has no tracks.
    struct TwoTracks;

    impl TrackSource<Genre> for TwoTracks {
        fn tracks_for(&self, entity: &Genre) -> Result<Vec<Track>, SourceError> {
            if entity.id == "empty" {
                return Ok(Vec::new());
            }
            if entity.id == "broken" {
                return Err(SourceError::Unavailable("gone".to_string()));
            }
            Ok(vec![
                track(&format!("{}-1", entity.id)),
                track(&format!("{}-2", entity.id)),
            ])
        }
    }

    fn commands() -> (Commands<Genre>, Arc<RecordingQueue>) {
        let queue = Arc::new(RecordingQueue::default());
        let commands = Commands::new(
            Arc::new(TwoTracks) as Arc<dyn TrackSource<Genre>>,
            Arc::clone(&queue) as Arc<dyn PlaybackQueue>,
        );
        (commands, queue)
    }

    #[test]
    fn play_concatenates_in_selection_order() {
        let (commands, queue) = commands();
        assert_eq!(commands.play(&[genre("b"), genre("a")]).unwrap(), 4);
        assert_eq!(
            queue.calls.lock().as_slice(),
            [QueueCall::Play {
                ids: vec!["b-1".into(), "b-2".into(), "a-1".into(), "a-2".into()],
                start: 0
            }]
        );
    }

    #[test]
    fn play_from_starts_at_track() {
        let (commands, queue) = commands();
        commands.play_from(&genre("a"), "a-2").unwrap();
        commands.play_from(&genre("a"), "zzz").unwrap();
        let calls = queue.calls.lock();
        assert!(matches!(&calls[0], QueueCall::Play { start: 1, .. }));
        assert!(matches!(&calls[1], QueueCall::Play { start: 0, .. }));
    }

    #[test]
    fn enqueue_and_shuffle_keep_every_track() {
        let (commands, queue) = commands();
        commands.enqueue(&[genre("a")]).unwrap();
        commands.shuffle(&[genre("a"), genre("b")]).unwrap();
        let calls = queue.calls.lock();
        assert_eq!(
            calls[0],
            QueueCall::Enqueue {
                ids: vec!["a-1".into(), "a-2".into()]
            }
        );
        match &calls[1] {
            QueueCall::Play { ids, start } => {
                let mut ids = ids.clone();
                ids.sort();
                assert_eq!(ids, vec!["a-1", "a-2", "b-1", "b-2"]);
                assert_eq!(*start, 0);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn empty_requests_never_reach_the_queue() {
        let (commands, queue) = commands();
        assert!(matches!(commands.play(&[]), Err(CommandError::NothingSelected)));
        assert!(matches!(commands.play(&[genre("empty")]), Err(CommandError::NoTracks)));
        assert!(matches!(commands.enqueue(&[genre("broken")]), Err(CommandError::Source(_))));
        assert!(queue.calls.lock().is_empty());
    }
}
