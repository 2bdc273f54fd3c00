//! Caravel installer library.
//!
//! Turns a declarative installation [`Plan`] into a running Kubernetes
//! cluster: the executor builds the ansible inventory and variable set
//! from the plan, launches the installation playbook, and relays the
//! engine's progress output while the run is in flight.

pub mod commands;
pub mod dns;
pub mod execute;
pub mod plan;
pub mod ui;

// Re-export commonly used types at the crate root
pub use execute::{AnsibleExecutor, Executor, ExecutorConfig, INSTALL_PLAYBOOK};
pub use plan::Plan;
