//! CLI subcommands.

pub mod apply;
pub mod plan;

pub use apply::ApplyCommand;
pub use plan::PlanCommand;
