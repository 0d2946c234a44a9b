mod error;
mod pipeline;
mod state;

pub use error::GalleryError;
pub use pipeline::{Gallery, LoadedGallery};
pub use state::{GallerySnapshot, GalleryState, LoadTicket, DEMO_LABEL};
