use common::DisplayEntity;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::commands::{CommandError, Commands};
use crate::events::{EventHub, LibraryEvent, Subscription, ViewKind};
use crate::loader::{IncrementalLoader, LoadOutcome, SortOutcome};
use crate::sort::SortSpec;

/// Decides whether a library event makes a view's rows stale.
pub type InvalidationFilter = fn(&LibraryEvent) -> bool;

/// Profile switches and library reloads invalidate every view.
pub fn library_changes(event: &LibraryEvent) -> bool {
    matches!(
        event,
        LibraryEvent::ProfileChanged { .. } | LibraryEvent::LibraryInvalidated
    )
}

/// One browse list: incremental loader, selection, play commands and the
/// event subscription that keeps it in sync with the library.
pub struct CollectionViewModel<T> {
    kind: ViewKind,
    loader: IncrementalLoader<T>,
    commands: Commands<T>,
    hub: EventHub,
    subscription: Mutex<Option<Subscription>>,
}

impl<T: DisplayEntity> CollectionViewModel<T> {
    /// Must be called inside a tokio runtime.
    pub fn new(
        kind: ViewKind,
        loader: IncrementalLoader<T>,
        commands: Commands<T>,
        hub: EventHub,
        invalidated_by: InvalidationFilter,
    ) -> Self {
        let observer = loader.clone();
        let subscription = hub.observe(kind.as_str(), move |event| {
            let loader = observer.clone();
            async move {
                match event {
                    LibraryEvent::SortChanged { view, spec } if view == kind => {
                        loader.apply_sort(spec, false).await;
                    }
                    event if invalidated_by(&event) => {
                        debug!("{} invalidated by {:?}", kind.as_str(), event);
                        // Detached; the next event's reset cancels it.
                        loader.reset().await;
                        tokio::spawn(async move {
                            match loader.load_more().await {
                                LoadOutcome::Failed(err) => {
                                    warn!("{} reload failed: {}", kind.as_str(), err)
                                }
                                outcome => debug!("{} reloaded: {:?}", kind.as_str(), outcome),
                            }
                        });
                    }
                    _ => {}
                }
            }
        });
        Self {
            kind,
            loader,
            commands,
            hub,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn loader(&self) -> &IncrementalLoader<T> {
        &self.loader
    }

    pub async fn load_more(&self) -> LoadOutcome {
        self.loader.load_more().await
    }

    pub async fn refresh(&self) -> LoadOutcome {
        self.loader.invalidate().await
    }

    /// A sort picked by the user. Visible rows are re-sorted here and the
    /// choice is shared with every other listener of this view kind.
    pub async fn set_sort(&self, spec: SortSpec) -> SortOutcome {
        info!("{} sort set to {:?}", self.kind.as_str(), spec);
        let outcome = self.loader.apply_sort(spec, true).await;
        self.hub.publish(LibraryEvent::SortChanged {
            view: self.kind,
            spec,
        });
        outcome
    }

    pub fn toggle(&self, key: &str) {
        self.loader.toggle_selection(key);
    }

    pub fn set_selected(&self, key: &str, selected: bool) {
        self.loader.set_selected(key, selected);
    }

    pub fn clear_selection(&self) {
        self.loader.clear_selection();
    }

    pub fn has_selection(&self) -> bool {
        self.loader.has_selection()
    }

    pub fn notify_visible(&self, key: &str, is_visible: bool) {
        self.loader.notify_visible(key, is_visible);
    }

    pub async fn load_high_res(&self, keys: &[String]) -> usize {
        self.loader.load_high_res(keys).await
    }

    pub fn play_selected(&self) -> Result<usize, CommandError> {
        self.commands.play(&self.loader.selected_entities())
    }

    pub fn enqueue_selected(&self) -> Result<usize, CommandError> {
        self.commands.enqueue(&self.loader.selected_entities())
    }

    pub fn shuffle_selected(&self) -> Result<usize, CommandError> {
        self.commands.shuffle(&self.loader.selected_entities())
    }

    /// Play a single row, ignoring the selection.
    pub fn play_item(&self, key: &str) -> Result<usize, CommandError> {
        let entity = self.loader.entity(key).ok_or(CommandError::NothingSelected)?;
        self.commands.play(std::slice::from_ref(&entity))
    }

    pub fn play_from(&self, key: &str, track_id: &str) -> Result<usize, CommandError> {
        let entity = self.loader.entity(key).ok_or(CommandError::NothingSelected)?;
        self.commands.play_from(&entity, track_id)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription
            .lock()
            .as_ref()
            .map(Subscription::is_active)
            .unwrap_or(false)
    }

    /// Unsubscribe from library events and cancel in-flight loads.
    pub fn shutdown(&self) {
        if let Some(mut subscription) = self.subscription.lock().take() {
            subscription.cancel();
        }
        self.loader.cancel();
        info!("{} view closed", self.kind.as_str());
    }
}

impl<T> Drop for CollectionViewModel<T> {
    fn drop(&mut self) {
        if let Some(mut subscription) = self.subscription.get_mut().take() {
            subscription.cancel();
        }
    }
}
