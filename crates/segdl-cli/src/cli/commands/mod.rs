//! CLI command handlers.

mod get;
pub(crate) mod plan;
pub(crate) mod probe;

pub use get::{run_get, GetOptions};
pub use plan::run_plan;
pub use probe::run_probe;
