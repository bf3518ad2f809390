//! Adapters between Blake Vision and the outside world: uploaded documents,
//! the language-model service and the object store for images.

pub mod document;
pub mod error;
pub mod media;
pub mod openai;
pub mod prompt;

pub use error::{Error, Result};
