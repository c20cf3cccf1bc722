//! Services module
//!
//! Business logic coordinating the event store, settings and notification
//! dispatch.

pub mod events;
pub mod settings;

pub use events::EventsService;
pub use settings::EventsSettings;
