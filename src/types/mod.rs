//! Core types for the navigator.

pub mod node;
pub mod publication;
pub mod path;

pub use node::{Node, RootNode};
pub use publication::{Publication, Summary, Year, UNKNOWN};
pub use path::ExplorationPath;
