use thiserror::Error;

use crate::loader::FetchError;
use crate::validator::ValidationError;

/// Everything that can end a load attempt.
#[derive(Debug, Clone, Error)]
pub enum GalleryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("No media files found at {url}")]
    NoMediaFound { url: String },
}

impl GalleryError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.kind(),
            Self::Fetch(e) => e.kind(),
            Self::NoMediaFound { .. } => "no_media_found",
        }
    }

    /// The single message shown in place of the gallery.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(e) => e.to_string(),
            Self::Fetch(FetchError::AllTransportsExhausted { .. }) => {
                "Could not load the directory through the proxy. Check the URL or try again.".into()
            }
            Self::Fetch(e) => e.to_string(),
            Self::NoMediaFound { .. } => {
                "No media files found. The directory may be empty or protected.".into()
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
