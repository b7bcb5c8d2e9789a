//! CLI command handlers, one file per subcommand.

mod get;
mod probe;

pub use get::{run_get, GetArgs};
pub use probe::run_probe;
