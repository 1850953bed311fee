//! Browse view-models for a music library: incremental loading, sorting,
//! selection, artwork enrichment and play commands over the catalog.

pub mod commands;
pub mod config;
pub mod enrich;
pub mod error;
pub mod events;
pub mod loader;
pub mod selection;
pub mod session;
pub mod sort;
pub mod sources;
pub mod ui;
pub mod viewmodel;
pub mod views;

pub use commands::{CommandError, Commands, PlaybackQueue, TrackSource};
pub use config::{BrowseConfig, ConfigError, ViewConfig};
pub use enrich::{CoverEnricher, CoverResource, Enricher, Row, VisibilityHints};
pub use error::{EnrichError, SourceError};
pub use events::{EventHub, LibraryEvent, Subscription, ViewKind};
pub use loader::{
    CollectionChange, CollectionSource, IncrementalLoader, LoadOutcome, LoaderBuilder,
    LoaderOptions, LoaderSnapshot, PagedSource, Paging, ProgressOnFinish, SortOutcome,
};
pub use selection::SelectionSet;
pub use session::{BrowseContext, Session, SessionError};
pub use sort::{KeySorter, SortDirection, SortKey, SortKeys, SortKind, SortSpec, Sorter};
pub use ui::{DispatchError, UiExecutor, UiThread};
pub use viewmodel::CollectionViewModel;
