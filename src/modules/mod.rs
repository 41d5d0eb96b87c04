//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the assistants API adapter and local temp-file storage.

pub mod openai;
pub mod storage;
