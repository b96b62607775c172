//! State management with actor pattern
//!
//! StateManager owns the coordination store and processes messages via
//! channels, giving the controller, workers and CLI one shared handle.

mod manager;
mod messages;
mod operations;

pub use manager::StateManager;
pub use messages::{StateCommand, StateError, StateResponse};
pub use operations::{RunProgress, all_collections};
