//! Domain types and DTOs
//!
//! These types define the records the engine stores and the request bodies
//! the API accepts.

pub mod artifacts;
pub mod estimates;
pub mod events;
pub mod price_items;

// Re-export commonly used types
pub use artifacts::*;
pub use estimates::*;
pub use events::*;
pub use price_items::*;
