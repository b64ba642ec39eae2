//! Document state handlers
//!
//! The [`StateManager`] applies every mutation, records it on the [`History`] and publishes the
//! resulting events. [`Selection`] is the view state it keeps alongside the graph.

pub mod history;
pub mod selection;
pub mod state_manager;

pub use history::History;
pub use selection::Selection;
pub use state_manager::StateManager;
