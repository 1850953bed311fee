//! Library-wide notifications delivered to explicitly registered observers.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::sort::SortSpec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    Albums,
    Artists,
    Genres,
    Folders,
    Playlists,
}

impl ViewKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewKind::Albums => "albums",
            ViewKind::Artists => "artists",
            ViewKind::Genres => "genres",
            ViewKind::Folders => "folders",
            ViewKind::Playlists => "playlists",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LibraryEvent {
    ProfileChanged { profile: String },
    LibraryInvalidated,
    TrackLiked { track_id: String },
    TrackUnliked { track_id: String },
    /// A shared sort setting changed; listeners apply it without forcing a
    /// resort of already visible rows.
    SortChanged { view: ViewKind, spec: SortSpec },
}

#[derive(Clone)]
pub struct EventHub {
    sender: broadcast::Sender<LibraryEvent>,
}

impl EventHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of observers that will see the event.
    pub fn publish(&self, event: LibraryEvent) -> usize {
        debug!("Publishing {:?}", event);
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LibraryEvent> {
        self.sender.subscribe()
    }

    /// Register `handler` for every event published from now on. Events are
    /// handled one at a time, in publish order. Must be called inside a tokio
    /// runtime.
    pub fn observe<F, Fut>(&self, name: &str, mut handler: F) -> Subscription
    where
        F: FnMut(LibraryEvent) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.sender.subscribe();
        let observer = name.to_string();
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event).await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("{} missed {} library events", observer, skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Subscription {
            name: name.to_string(),
            handle: Some(handle),
        }
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
pub struct Subscription {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Unsubscribed {}", self.name);
        }
    }

    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
