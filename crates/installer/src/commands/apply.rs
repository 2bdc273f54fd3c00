//! `caravel apply` — run the installation described by a plan.

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::execute::{AnsibleExecutor, Executor, ExecutorConfig};
use crate::plan::Plan;
use crate::ui;

/// Apply an installation plan to the machines it describes.
#[derive(Args, Debug)]
pub struct ApplyCommand {
    /// Plan file to apply.
    #[arg(long, default_value = "caravel-plan.yaml")]
    pub file: PathBuf,

    /// Directory holding generated TLS material.
    #[arg(long, default_value = "certs")]
    pub tls_directory: PathBuf,

    /// Directory holding the installation playbooks.
    #[arg(long, default_value = "ansible")]
    pub ansible_directory: PathBuf,

    /// Force a restart of every cluster service.
    #[arg(long)]
    pub restart_services: bool,
}

impl ApplyCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the plan cannot be loaded, the executor cannot
    /// be constructed, or the installation fails.
    pub fn run(self) -> Result<()> {
        let plan = Plan::from_file(&self.file)?;
        ui::print_section(&format!("Installing cluster {}", plan.cluster.name));

        let config = ExecutorConfig::new(self.tls_directory)
            .with_ansible_directory(self.ansible_directory)
            .with_restart_services(self.restart_services);
        let mut executor =
            AnsibleExecutor::new(Box::new(io::stdout()), Box::new(io::stderr()), config)?;

        match executor.install(&plan) {
            Ok(()) => {
                ui::print_success("Installation complete");
                Ok(())
            }
            Err(e) => {
                ui::print_error("Installation failed");
                Err(e)
            }
        }
    }
}
