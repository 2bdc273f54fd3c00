//! Launching playbooks against the ansible engine.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::{fs, thread};

use thiserror::Error;
use tracing::{debug, info};

use crate::inventory::Inventory;

/// Template variables handed to a playbook via `--extra-vars`.
pub type ExtraVars = BTreeMap<String, String>;

/// Inventory file name written into the playbook directory before a run.
const INVENTORY_FILE: &str = "inventory.ini";

/// Errors that can occur while driving ansible-playbook.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The playbook asset directory does not exist.
    #[error("ansible directory not found: {0}")]
    MissingAssets(PathBuf),

    /// The ansible-playbook binary is not on PATH.
    #[error("ansible-playbook not found: {0}")]
    MissingBinary(#[from] which::Error),

    /// I/O failure while launching or streaming a playbook run.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The extra-vars payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The playbook run finished with a failure status.
    #[error("ansible-playbook exited with {status}")]
    Playbook { status: ExitStatus },
}

/// The narrow capability the installer needs from the engine: run one
/// playbook against an inventory with a set of variables, streaming the
/// engine's progress text into `output`.
pub trait PlaybookRunner: Send {
    /// Run `playbook` with `inventory` and `extra_vars`.
    ///
    /// Blocks until the run completes. Progress output is written to
    /// `output` in the order the engine produces it.
    fn run_playbook(
        &mut self,
        inventory: &Inventory,
        playbook: &str,
        extra_vars: &ExtraVars,
        output: &mut (dyn Write + Send),
    ) -> Result<(), RunnerError>;
}

/// Production [`PlaybookRunner`] that shells out to ansible-playbook.
pub struct AnsibleRunner {
    playbook_bin: PathBuf,
    ansible_dir: PathBuf,
    err_out: Box<dyn Write + Send>,
}

impl AnsibleRunner {
    /// Create a runner for the playbooks under `ansible_dir`, sending the
    /// engine's error stream to `err_out`.
    ///
    /// # Errors
    ///
    /// Fails if `ansible_dir` does not exist or ansible-playbook cannot
    /// be found on PATH.
    pub fn new(
        err_out: Box<dyn Write + Send>,
        ansible_dir: impl Into<PathBuf>,
    ) -> Result<Self, RunnerError> {
        let ansible_dir = ansible_dir.into();
        if !ansible_dir.is_dir() {
            return Err(RunnerError::MissingAssets(ansible_dir));
        }

        let playbook_bin = which::which("ansible-playbook")?;
        debug!(bin = %playbook_bin.display(), "resolved ansible-playbook");

        Ok(Self {
            playbook_bin,
            ansible_dir,
            err_out,
        })
    }
}

impl PlaybookRunner for AnsibleRunner {
    fn run_playbook(
        &mut self,
        inventory: &Inventory,
        playbook: &str,
        extra_vars: &ExtraVars,
        output: &mut (dyn Write + Send),
    ) -> Result<(), RunnerError> {
        let inventory_path = self.ansible_dir.join(INVENTORY_FILE);
        fs::write(&inventory_path, inventory.to_ini())?;
        debug!(path = %inventory_path.display(), "wrote inventory");

        let vars = serde_json::to_string(extra_vars)?;

        info!(playbook, "starting ansible-playbook");
        let mut child = Command::new(&self.playbook_bin)
            .args(["-i", INVENTORY_FILE, "--extra-vars", vars.as_str(), playbook])
            .current_dir(&self.ansible_dir)
            .env("ANSIBLE_HOST_KEY_CHECKING", "False")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout not captured"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr not captured"))?;

        // Both child pipes must be drained concurrently or a full kernel
        // buffer on either one stalls the run.
        let err_out = &mut self.err_out;
        let copied: io::Result<u64> = thread::scope(|scope| {
            scope.spawn(move || {
                // The error stream is best-effort; the exit status decides.
                let _ = io::copy(&mut stderr, err_out);
            });
            io::copy(&mut stdout, output)
        });
        copied?;

        let status = child.wait()?;
        if !status.success() {
            return Err(RunnerError::Playbook { status });
        }

        info!(playbook, "ansible-playbook finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_fails_without_asset_directory() {
        let missing = tempfile::tempdir().unwrap().path().join("gone");
        let err = AnsibleRunner::new(Box::new(Vec::new()), &missing)
            .err()
            .expect("runner creation should fail");
        match err {
            RunnerError::MissingAssets(dir) => assert_eq!(dir, missing),
            other => panic!("expected MissingAssets, got {other}"),
        }
    }
}
