//! CLI command implementations
//!
//! Command handlers, organized by category:
//! - `simple`: Commands on a single template file (translate, check)
//! - `project`: Commands that need the project's view layout (search-path, resolve, render)
//! - `config`: Configuration and schema commands
//! - `util`: Shared argument and output helpers

pub mod config;
pub mod project;
pub mod simple;
pub mod util;

pub use config::{cmd_config, cmd_schema};
pub use project::{cmd_render, cmd_resolve, cmd_search_path};
pub use simple::{cmd_check, cmd_translate};
