//! Plan execution against the ansible engine.
//!
//! The executor turns a [`Plan`] into the inventory and extra-vars the
//! engine needs, launches the installation playbook, and relays the
//! engine's progress output through the output parser while the run is
//! in flight.

use std::io::Write;
use std::path::{self, Path, PathBuf};
use std::thread;

use ansible::inventory::{Node as InventoryNode, NodeGroup as InventoryGroup};
use ansible::runner::{AnsibleRunner, ExtraVars, PlaybookRunner};
use ansible::{Inventory, OutputParser};
use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::dns::dns_service_ip;
use crate::plan::{Node, Plan, SshConfig};

/// Playbook that performs the full installation.
pub const INSTALL_PLAYBOOK: &str = "kubernetes.yaml";

/// Services that get a `force_<service>_restart` flag when service
/// restarts are requested.
const RESTART_SERVICES: [&str; 8] = [
    "etcd",
    "apiserver",
    "controller",
    "scheduler",
    "proxy",
    "kubelet",
    "calico_node",
    "docker",
];

/// Executor configuration supplied at construction.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Directory holding generated TLS material. Resolved to an absolute
    /// path once, at construction.
    pub tls_directory: PathBuf,
    /// Directory holding the playbooks and roles the engine runs.
    pub ansible_directory: PathBuf,
    /// Force a restart of every cluster service during the run.
    pub restart_services: bool,
}

impl ExecutorConfig {
    /// Config with the default asset directory and no forced restarts.
    #[must_use]
    pub fn new(tls_directory: impl Into<PathBuf>) -> Self {
        Self {
            tls_directory: tls_directory.into(),
            ansible_directory: PathBuf::from("ansible"),
            restart_services: false,
        }
    }

    /// Override the playbook asset directory.
    #[must_use]
    pub fn with_ansible_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ansible_directory = dir.into();
        self
    }

    /// Force a restart of every cluster service.
    #[must_use]
    pub fn with_restart_services(mut self, restart: bool) -> Self {
        self.restart_services = restart;
        self
    }
}

/// Carries out installation plans.
pub trait Executor {
    /// Install the cluster described by `plan`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable set cannot be derived from the
    /// plan or the engine run fails. The machines the plan describes may
    /// have been partially reconfigured when an error is returned.
    fn install(&mut self, plan: &Plan) -> Result<()>;
}

/// [`Executor`] backed by ansible-playbook.
pub struct AnsibleExecutor {
    runner: Box<dyn PlaybookRunner>,
    out: Box<dyn Write + Send>,
    tls_directory: PathBuf,
    restart_services: bool,
}

impl AnsibleExecutor {
    /// Create an executor writing rewritten progress to `out` and the
    /// engine's error stream to `err_out`.
    ///
    /// # Errors
    ///
    /// Fails if the TLS directory path cannot be resolved to an absolute
    /// path or the engine runner cannot be created. No partial state is
    /// retained on failure.
    pub fn new(
        out: Box<dyn Write + Send>,
        err_out: Box<dyn Write + Send>,
        config: ExecutorConfig,
    ) -> Result<Self> {
        let tls_directory = path::absolute(&config.tls_directory).with_context(|| {
            format!(
                "error getting absolute path from {:?}",
                config.tls_directory
            )
        })?;

        let runner = AnsibleRunner::new(err_out, config.ansible_directory)
            .context("error creating ansible runner")?;

        Ok(Self {
            runner: Box::new(runner),
            out,
            tls_directory,
            restart_services: config.restart_services,
        })
    }

    /// Build an executor around a pre-built runner.
    ///
    /// `tls_directory` is used as given; [`AnsibleExecutor::new`] is the
    /// constructor that resolves it.
    #[must_use]
    pub fn with_runner(
        runner: Box<dyn PlaybookRunner>,
        out: Box<dyn Write + Send>,
        tls_directory: PathBuf,
        restart_services: bool,
    ) -> Self {
        Self {
            runner,
            out,
            tls_directory,
            restart_services,
        }
    }
}

impl Executor for AnsibleExecutor {
    fn install(&mut self, plan: &Plan) -> Result<()> {
        let inventory = build_inventory(plan);
        let extra_vars = build_extra_vars(plan, &self.tls_directory, self.restart_services)?;

        info!(cluster = %plan.cluster.name, "starting installation");

        // Fresh bridge per run: the engine writes into the pipe while a
        // scoped thread rewrites the stream into `out`. The thread is
        // joined before returning, so transform failures are visible to
        // the caller.
        let (reader, writer) = std::io::pipe().context("error creating output pipe")?;
        let out = &mut self.out;
        let runner = &mut self.runner;

        let (run_result, parse_result) = thread::scope(|scope| {
            let parser = scope.spawn(move || OutputParser::new(out).transform(reader));

            let mut writer = writer;
            let run_result =
                runner.run_playbook(&inventory, INSTALL_PLAYBOOK, &extra_vars, &mut writer);
            // Closing the write end lets the parser drain to EOF.
            drop(writer);

            (run_result, parser.join())
        });

        run_result.context("error running installation playbook")?;
        match parse_result {
            Ok(result) => result.context("error transforming playbook output")?,
            Err(_) => return Err(anyhow!("playbook output parser panicked")),
        }

        info!(cluster = %plan.cluster.name, "installation finished");
        Ok(())
    }
}

/// Convert the plan's node groups into the ansible inventory.
///
/// Groups are always emitted as etcd, master, worker, in that order;
/// node order within a group follows the plan. Empty groups are kept.
fn build_inventory(plan: &Plan) -> Inventory {
    let ssh = &plan.cluster.ssh;
    let convert = |nodes: &[Node]| nodes.iter().map(|n| inventory_node(n, ssh)).collect();

    Inventory::new(vec![
        InventoryGroup {
            name: "etcd".to_string(),
            nodes: convert(&plan.etcd.nodes),
        },
        InventoryGroup {
            name: "master".to_string(),
            nodes: convert(&plan.master.nodes),
        },
        InventoryGroup {
            name: "worker".to_string(),
            nodes: convert(&plan.worker.nodes),
        },
    ])
}

/// Convert one plan node, injecting the plan's shared SSH credential.
fn inventory_node(node: &Node, ssh: &SshConfig) -> InventoryNode {
    InventoryNode {
        host: node.host.clone(),
        public_ip: node.ip.clone(),
        internal_ip: node.internal_ip.clone(),
        ssh_private_key: ssh.key.clone(),
        ssh_user: ssh.user.clone(),
        ssh_port: ssh.port,
    }
}

/// Derive the variable set for the installation playbook.
///
/// Fails only if the DNS service IP cannot be derived from the plan.
fn build_extra_vars(
    plan: &Plan,
    tls_directory: &Path,
    restart_services: bool,
) -> Result<ExtraVars> {
    let dns_ip = dns_service_ip(plan).context("error getting DNS service IP")?;

    let cluster = &plan.cluster;
    let mut vars = ExtraVars::new();
    vars.insert("kubernetes_cluster_name".to_string(), cluster.name.clone());
    vars.insert(
        "kubernetes_admin_password".to_string(),
        cluster.admin_password.clone(),
    );
    vars.insert(
        "tls_directory".to_string(),
        tls_directory.display().to_string(),
    );
    vars.insert(
        "calico_network_type".to_string(),
        cluster.networking.network_type.clone(),
    );
    vars.insert(
        "kubernetes_services_cidr".to_string(),
        cluster.networking.service_cidr_block.clone(),
    );
    vars.insert(
        "kubernetes_pods_cidr".to_string(),
        cluster.networking.pod_cidr_block.clone(),
    );
    vars.insert("kubernetes_dns_service_ip".to_string(), dns_ip);

    if let Some(repository) = cluster.local_repository.as_deref().filter(|r| !r.is_empty()) {
        vars.insert("local_repository_path".to_string(), repository.to_string());
    }

    if restart_services {
        for service in RESTART_SERVICES {
            vars.insert(format!("force_{service}_restart"), true.to_string());
        }
    }

    Ok(vars)
}
