use library::LibraryError;

/// A data source could not produce items.
#[derive(Debug)]
pub enum SourceError {
    Library(LibraryError),
    Unavailable(String),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Library(err) => write!(f, "library error: {}", err),
            SourceError::Unavailable(message) => write!(f, "source unavailable: {}", message),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<LibraryError> for SourceError {
    fn from(err: LibraryError) -> Self {
        SourceError::Library(err)
    }
}

/// Per-item enrichment failed. The item is still shown, just without the
/// resource.
#[derive(Debug)]
pub enum EnrichError {
    Library(LibraryError),
    Unavailable(String),
}

impl std::fmt::Display for EnrichError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrichError::Library(err) => write!(f, "library error: {}", err),
            EnrichError::Unavailable(message) => write!(f, "resource unavailable: {}", message),
        }
    }
}

impl std::error::Error for EnrichError {}

impl From<LibraryError> for EnrichError {
    fn from(err: LibraryError) -> Self {
        EnrichError::Library(err)
    }
}
