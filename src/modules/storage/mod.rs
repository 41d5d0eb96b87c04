//! Storage module for transient uploads
//!
//! Request bytes are written to a local directory before they are re-uploaded
//! to the assistants API, then removed.

mod temp_storage;

pub use temp_storage::{TempFile, TempFileStore};
