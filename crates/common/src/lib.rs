//! Shared types for the photo-booth upload workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
