//! `caravel plan` — generate a starter installation plan.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;

use crate::plan::Plan;
use crate::ui;

/// Generate a starter plan file to edit before `caravel apply`.
#[derive(Args, Debug)]
pub struct PlanCommand {
    /// Where to write the plan.
    #[arg(long, default_value = "caravel-plan.yaml")]
    pub file: PathBuf,

    /// Cluster name to seed the plan with.
    #[arg(long, default_value = "kubernetes")]
    pub name: String,

    /// Number of etcd nodes.
    #[arg(long, default_value_t = 3)]
    pub etcd: usize,

    /// Number of master nodes.
    #[arg(long, default_value_t = 2)]
    pub master: usize,

    /// Number of worker nodes.
    #[arg(long, default_value_t = 3)]
    pub worker: usize,
}

impl PlanCommand {
    /// Run the command.
    ///
    /// # Errors
    ///
    /// Returns an error if the target file already exists or cannot be
    /// written.
    pub fn run(self) -> Result<()> {
        if self.file.exists() {
            bail!("{} already exists, refusing to overwrite", self.file.display());
        }

        let plan = Plan::template(&self.name, self.etcd, self.master, self.worker);
        plan.write_to(&self.file)?;

        ui::print_success(&format!("Plan written to {}", self.file.display()));
        ui::print_info("Fill in node addresses and SSH details, then run `caravel apply`.");
        Ok(())
    }
}
