//! CLI domain: parse, route, output and presentation for the `canopy` binary.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_tree_json, format_tree_text};
pub use route::RunContext;
