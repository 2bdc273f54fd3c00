//! Cluster DNS service IP derivation.

use std::net::Ipv4Addr;

use anyhow::{bail, Context, Result};
use ipnetwork::Ipv4Network;

use crate::plan::Plan;

/// Offset of the cluster DNS ClusterIP within the service block. The
/// playbooks pin the DNS service to this address.
const DNS_OFFSET: u32 = 2;

/// Derive the cluster DNS service IP from the plan's service CIDR.
///
/// # Errors
///
/// Returns an error if the service CIDR does not parse or the block is
/// too small to contain the DNS address.
pub fn dns_service_ip(plan: &Plan) -> Result<String> {
    let cidr = &plan.cluster.networking.service_cidr_block;
    let network: Ipv4Network = cidr
        .parse()
        .with_context(|| format!("invalid services CIDR block {cidr:?}"))?;

    let base = u32::from(network.network());
    let Some(addr) = base.checked_add(DNS_OFFSET).map(Ipv4Addr::from) else {
        bail!("services CIDR block {cidr:?} overflows the address space");
    };
    if !network.contains(addr) || addr == network.broadcast() {
        bail!("services CIDR block {cidr:?} is too small to hold the DNS service IP");
    }

    Ok(addr.to_string())
}
