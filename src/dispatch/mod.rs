//! Dependency-graph loading: nodes, path enumeration, fan-out/join.

pub mod context;
pub mod job;
pub mod node;
pub mod path;
pub mod waiter;

pub use context::LoadContext;
pub use job::Job;
pub use node::{show_node, NodeRef, TaskNode, UNKNOWN_NAME};
pub use path::{path_name, NodePath};
pub use waiter::Waiter;
