//! Host inventory handed to ansible-playbook.
//!
//! An inventory is an ordered list of named groups, each holding the
//! connection details for its machines. Group order matters to the
//! playbooks, so it is preserved exactly as built.

use serde::{Deserialize, Serialize};

/// A single machine in the inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Hostname the playbooks address the machine by.
    pub host: String,
    /// Public IP ansible connects to.
    pub public_ip: String,
    /// Internal IP used for cluster traffic.
    pub internal_ip: String,
    /// Path to the SSH private key for this node.
    pub ssh_private_key: String,
    /// SSH login user.
    pub ssh_user: String,
    /// SSH port.
    pub ssh_port: u16,
}

/// A named group of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGroup {
    /// Group name as the playbooks reference it.
    pub name: String,
    /// Member nodes, in order.
    pub nodes: Vec<Node>,
}

/// An ordered set of named node groups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    /// Groups in the order the playbooks expect them.
    pub groups: Vec<NodeGroup>,
}

impl Inventory {
    /// Create an inventory from pre-built groups.
    #[must_use]
    pub fn new(groups: Vec<NodeGroup>) -> Self {
        Self { groups }
    }

    /// Find a group by name.
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&NodeGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Render the inventory in ansible's INI format.
    ///
    /// Each group becomes a `[name]` section with one line per node
    /// carrying the connection variables the playbooks read.
    #[must_use]
    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        for group in &self.groups {
            out.push_str(&format!("[{}]\n", group.name));
            for node in &group.nodes {
                out.push_str(&format!(
                    "{} ansible_host={} internal_ipv4={} ansible_ssh_private_key_file={} ansible_user={} ansible_port={}\n",
                    node.host,
                    node.public_ip,
                    node.internal_ip,
                    node.ssh_private_key,
                    node.ssh_user,
                    node.ssh_port
                ));
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(host: &str) -> Node {
        Node {
            host: host.to_string(),
            public_ip: "203.0.113.10".to_string(),
            internal_ip: "10.0.0.10".to_string(),
            ssh_private_key: "/keys/cluster.pem".to_string(),
            ssh_user: "core".to_string(),
            ssh_port: 22,
        }
    }

    #[test]
    fn test_group_lookup() {
        let inventory = Inventory::new(vec![
            NodeGroup {
                name: "etcd".to_string(),
                nodes: vec![node("etcd01")],
            },
            NodeGroup {
                name: "master".to_string(),
                nodes: vec![],
            },
        ]);

        assert_eq!(inventory.group("etcd").unwrap().nodes.len(), 1);
        assert!(inventory.group("master").unwrap().nodes.is_empty());
        assert!(inventory.group("worker").is_none());
    }

    #[test]
    fn test_ini_rendering() {
        let inventory = Inventory::new(vec![NodeGroup {
            name: "etcd".to_string(),
            nodes: vec![node("etcd01")],
        }]);

        let ini = inventory.to_ini();
        assert!(ini.starts_with("[etcd]\n"));
        assert!(ini.contains(
            "etcd01 ansible_host=203.0.113.10 internal_ipv4=10.0.0.10 \
             ansible_ssh_private_key_file=/keys/cluster.pem ansible_user=core ansible_port=22"
        ));
    }

    #[test]
    fn test_ini_preserves_group_order() {
        let inventory = Inventory::new(vec![
            NodeGroup {
                name: "etcd".to_string(),
                nodes: vec![],
            },
            NodeGroup {
                name: "master".to_string(),
                nodes: vec![],
            },
            NodeGroup {
                name: "worker".to_string(),
                nodes: vec![],
            },
        ]);

        let ini = inventory.to_ini();
        let etcd = ini.find("[etcd]").unwrap();
        let master = ini.find("[master]").unwrap();
        let worker = ini.find("[worker]").unwrap();
        assert!(etcd < master && master < worker);
    }
}
