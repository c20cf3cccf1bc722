//! Event store module
//!
//! Model definitions and the file-backed repository for events.

pub mod models;
pub mod repository;

pub use models::{Event, Stage, CATEGORIES, HEADERS, RECORD_NOT_FOUND};
pub use repository::EventStore;
