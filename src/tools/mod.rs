//! Tool system: trait, arguments, schemas, registry, built-ins.

pub mod arguments;
pub mod builtin;
pub mod registry;
pub mod tool;
pub mod types;

pub use arguments::ToolArguments;
pub use registry::{ToolProvider, ToolRegistry};
pub use tool::{FnTool, Tool};
pub use types::ToolParameters;
