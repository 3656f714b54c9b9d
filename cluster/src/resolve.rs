//! Mapping a StatefulSet ordinal index to a reachable address.
//!
//! Two strategies exist in the wild: the bare in-cluster pod hostname
//! (`valkey-3`), and a per-member DNS record under a headless service
//! (`valkey-3.valkey-headless.my-ns.svc`). Both are just string
//! construction here; actual lookup happens in the OS resolver when the
//! connection is dialed. Tests substitute a static table.

use std::fmt;

use crate::errors::ClusterError;
use crate::{NODE_NAME_PREFIX, VALKEY_PORT};

/// A member's network address.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeAddr {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

pub trait AddressResolver: Send + Sync {
    fn resolve(&self, index: u32) -> Result<NodeAddr, ClusterError>;
}

/// Builds `<prefix><index>` hostnames, optionally qualified by a domain.
#[derive(Clone, Debug)]
pub struct HostnameResolver {
    prefix: String,
    domain: Option<String>,
    port: u16,
}

impl HostnameResolver {
    pub fn new(prefix: impl Into<String>, domain: Option<String>, port: u16) -> Self {
        Self {
            prefix: prefix.into(),
            domain,
            port,
        }
    }
}

impl Default for HostnameResolver {
    fn default() -> Self {
        Self::new(NODE_NAME_PREFIX, None, VALKEY_PORT)
    }
}

impl AddressResolver for HostnameResolver {
    fn resolve(&self, index: u32) -> Result<NodeAddr, ClusterError> {
        let host = match &self.domain {
            Some(domain) => format!("{}{index}.{domain}", self.prefix),
            None => format!("{}{index}", self.prefix),
        };

        Ok(NodeAddr {
            host,
            port: self.port,
        })
    }
}

/// Fixed address table, indexed by ordinal.
#[derive(Clone, Debug, Default)]
pub struct StaticResolver {
    addrs: Vec<NodeAddr>,
}

impl StaticResolver {
    pub fn new(addrs: Vec<NodeAddr>) -> Self {
        Self { addrs }
    }
}

impl AddressResolver for StaticResolver {
    fn resolve(&self, index: u32) -> Result<NodeAddr, ClusterError> {
        self.addrs
            .get(index as usize)
            .cloned()
            .ok_or(ClusterError::AddressResolution(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_hostname_strategy() {
        let resolver = HostnameResolver::default();
        let addr = resolver.resolve(3).unwrap();
        assert_eq!(addr.to_string(), "valkey-3:6379");
    }

    #[test]
    fn per_member_record_strategy() {
        let resolver = HostnameResolver::new(
            "valkey-",
            Some("valkey-headless.prod.svc.cluster.local".to_string()),
            6379,
        );
        let addr = resolver.resolve(0).unwrap();
        assert_eq!(
            addr.host,
            "valkey-0.valkey-headless.prod.svc.cluster.local"
        );
    }

    #[test]
    fn static_table_misses_are_errors() {
        let resolver = StaticResolver::new(vec![NodeAddr {
            host: "127.0.0.1".into(),
            port: 7000,
        }]);

        assert!(resolver.resolve(0).is_ok());
        assert!(matches!(
            resolver.resolve(1),
            Err(ClusterError::AddressResolution(1))
        ));
    }
}
