//! Cluster formation engine for a sharded Valkey StatefulSet.
//!
//! Each pod in the set runs one valkeeper next to one valkey. Given the
//! set's declared replica count and our own ordinal index, the engine
//! decides whether the local node is a shard primary or a replica, applies
//! that role over valkey's admin commands, and keeps re-applying it every
//! time the count changes. Every step checks live state first, so re-runs
//! are cheap no-ops once the cluster has converged.

use std::time::Duration;

pub mod client;
pub mod configure;
pub mod errors;
pub mod handler;
pub mod info;
pub mod resolve;
pub mod topology;

/// How long to wait between liveness probes of a not-yet-ready node.
pub const PING_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Total number of sharding slots in a valkey cluster.
pub const TOTAL_SLOT_COUNT: u32 = 16384;

/// Hostname prefix of a StatefulSet member, completed by its ordinal index.
pub const NODE_NAME_PREFIX: &str = "valkey-";

/// Port valkey serves on.
pub const VALKEY_PORT: u16 = 6379;
