use common::{CoverRef, DisplayEntity, ResourceTag};
use library::{Catalog, CoverLocation};

use crate::error::EnrichError;

/// One visible list entry: the entity plus the UI-side state bound to it.
#[derive(Clone, Debug)]
pub struct Row<T> {
    pub entity: T,
    pub selected: bool,
    pub cover: Option<CoverResource>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverResource {
    pub reference: CoverRef,
    pub tag: ResourceTag,
    pub location: CoverLocation,
}

impl<T: DisplayEntity> Row<T> {
    pub fn new(entity: T) -> Self {
        Self {
            entity,
            selected: false,
            cover: None,
        }
    }

    pub fn key(&self) -> &str {
        self.entity.key()
    }

    pub fn title(&self) -> &str {
        self.entity.title()
    }

    pub fn cover_tag(&self) -> Option<ResourceTag> {
        self.cover.as_ref().map(|cover| cover.tag)
    }

    /// True while the entity has artwork that is not yet at high resolution.
    pub fn needs_high_res(&self) -> bool {
        match &self.cover {
            Some(cover) => cover.tag != ResourceTag::High,
            None => self.entity.cover_ref().is_some(),
        }
    }
}

/// Per-item background augmentation run before a row is shown.
pub trait Enricher<T>: Send + Sync {
    fn enrich(
        &self,
        row: &mut Row<T>,
        quality: ResourceTag,
        mark_visible: bool,
    ) -> Result<(), EnrichError>;
}

/// Viewport visibility hints for the resource loader. Fire and forget.
pub trait VisibilityHints: Send + Sync {
    fn notify_visible(&self, cover_ref: &CoverRef, visible: bool);
}

/// Resolves entity artwork through the catalog.
#[derive(Clone)]
pub struct CoverEnricher {
    catalog: Catalog,
}

impl CoverEnricher {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }
}

impl<T: DisplayEntity> Enricher<T> for CoverEnricher {
    fn enrich(
        &self,
        row: &mut Row<T>,
        quality: ResourceTag,
        mark_visible: bool,
    ) -> Result<(), EnrichError> {
        let Some(reference) = row.entity.cover_ref().cloned() else {
            return Ok(());
        };
        let location = self.catalog.resolve_cover(&reference, quality)?;
        if mark_visible {
            self.catalog.notify_visible(&reference, true);
        }
        row.cover = Some(CoverResource {
            reference,
            tag: quality,
            location,
        });
        Ok(())
    }
}

impl VisibilityHints for CoverEnricher {
    fn notify_visible(&self, cover_ref: &CoverRef, visible: bool) {
        self.catalog.notify_visible(cover_ref, visible);
    }
}
