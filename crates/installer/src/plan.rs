//! Installation plan model.
//!
//! A plan is the declarative description of the cluster to install:
//! cluster-wide settings plus the three node groups the playbooks
//! operate on. Plans are YAML documents owned by the operator; this
//! module only loads and writes them, it does not validate their
//! internal consistency.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// SSH access applied uniformly to every node in the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SshConfig {
    /// Path to the private key used for all nodes.
    pub key: String,
    /// Login user.
    pub user: String,
    /// SSH port.
    pub port: u16,
}

/// Cluster networking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Network fabric type handed to the calico configuration.
    #[serde(rename = "type")]
    pub network_type: String,
    /// CIDR block for service virtual IPs.
    pub service_cidr_block: String,
    /// CIDR block for pod IPs.
    pub pod_cidr_block: String,
}

/// Cluster-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDetails {
    /// Cluster name.
    pub name: String,
    /// Password for the cluster administrator account.
    pub admin_password: String,
    /// Networking configuration.
    pub networking: NetworkConfig,
    /// Optional on-site package repository for air-gapped installs.
    #[serde(default)]
    pub local_repository: Option<String>,
    /// SSH access shared by all nodes.
    pub ssh: SshConfig,
}

/// One machine in the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Hostname.
    pub host: String,
    /// Public IP address.
    pub ip: String,
    /// Internal IP address used for cluster traffic.
    pub internal_ip: String,
}

/// One role's worth of nodes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeGroup {
    /// Member nodes, in order.
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// The full installation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// Cluster-wide settings.
    pub cluster: ClusterDetails,
    /// Nodes running etcd.
    pub etcd: NodeGroup,
    /// Nodes running the Kubernetes control plane.
    pub master: NodeGroup,
    /// Nodes running workloads.
    pub worker: NodeGroup,
}

impl Plan {
    /// Load a plan from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse as
    /// a plan.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read plan file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse plan file {}", path.display()))
    }

    /// Write this plan as YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        let raw = serde_yaml::to_string(self).context("failed to serialize plan")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write plan file {}", path.display()))
    }

    /// Starter plan with placeholder nodes, for `caravel plan`.
    #[must_use]
    pub fn template(name: &str, etcd: usize, master: usize, worker: usize) -> Self {
        let placeholders = |role: &str, count: usize| NodeGroup {
            nodes: (1..=count)
                .map(|i| Node {
                    host: format!("{role}{i:02}"),
                    ip: String::new(),
                    internal_ip: String::new(),
                })
                .collect(),
        };

        Self {
            cluster: ClusterDetails {
                name: name.to_string(),
                admin_password: String::new(),
                networking: NetworkConfig {
                    network_type: "overlay".to_string(),
                    service_cidr_block: "172.16.0.0/16".to_string(),
                    pod_cidr_block: "172.17.0.0/16".to_string(),
                },
                local_repository: None,
                ssh: SshConfig {
                    key: String::new(),
                    user: "root".to_string(),
                    port: 22,
                },
            },
            etcd: placeholders("etcd", etcd),
            master: placeholders("master", master),
            worker: placeholders("worker", worker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_node_counts() {
        let plan = Plan::template("kubernetes", 3, 2, 5);
        assert_eq!(plan.cluster.name, "kubernetes");
        assert_eq!(plan.etcd.nodes.len(), 3);
        assert_eq!(plan.master.nodes.len(), 2);
        assert_eq!(plan.worker.nodes.len(), 5);
        assert_eq!(plan.etcd.nodes[0].host, "etcd01");
        assert_eq!(plan.worker.nodes[4].host, "worker05");
    }

    #[test]
    fn test_write_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");

        let plan = Plan::template("roundtrip", 1, 1, 0);
        plan.write_to(&path).unwrap();

        let loaded = Plan::from_file(&path).unwrap();
        assert_eq!(loaded.cluster.name, "roundtrip");
        assert_eq!(loaded.etcd.nodes.len(), 1);
        assert!(loaded.worker.nodes.is_empty());
        assert!(loaded.cluster.local_repository.is_none());
    }

    #[test]
    fn test_from_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(&path, "cluster: [not, a, plan]").unwrap();

        assert!(Plan::from_file(&path).is_err());
    }
}
