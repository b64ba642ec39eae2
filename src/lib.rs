//! Diagram domain for the Composable Information Machine
//!
//! The document model behind a flowchart editor: typed nodes with ports, edges between ports,
//! an indexed graph aggregate, and a state manager that applies every mutation as a reversible
//! command. Observers follow the document through a synchronous event bus.
//!
//! The host owns rendering and interaction. It sends intents to the [`StateManager`] and redraws
//! from the events it publishes.

pub mod aggregate;
pub mod commands;
pub mod components;
pub mod config;
pub mod document;
pub mod domain_events;
pub mod error;
pub mod events;
pub mod factories;
pub mod handlers;
pub mod queries;
pub mod value_objects;

// Re-export main types
pub use aggregate::{Graph, GraphSnapshot};
pub use commands::{Command, CommandKind};
pub use components::*;
pub use config::{StateManagerConfig, DEFAULT_UNDO_LIMIT};
pub use document::{Document, DocumentMetadata, Layer, Settings, Theme, Viewport};
pub use domain_events::{DiagramDomainEvent, EventType};
pub use error::{ConfigError, DocumentError, DocumentResult, ValueObjectError};
pub use events::{EventBus, Subscription};
pub use factories::{EdgeOptions, EdgeUpdate, NodeOptions, NodeUpdate};
pub use handlers::{History, Selection, StateManager};
pub use queries::GraphMetrics;
pub use value_objects::*;
