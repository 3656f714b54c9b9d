//! Parser for valkey's `CLUSTER INFO` report: a line-oriented blob of
//! `key:value` pairs. The format is not guaranteed stable across valkey
//! versions, so parsing is tolerant — unknown or malformed lines are
//! skipped, and absent fields read as "not configured yet" rather than
//! erroring.

use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::ClusterError;

pub const STATE_INFO_KEY: &str = "cluster_state";
pub const EPOCH_INFO_KEY: &str = "cluster_current_epoch";
pub const KNOWN_NODE_COUNT_INFO_KEY: &str = "cluster_known_nodes";
pub const SIZE_INFO_KEY: &str = "cluster_size";
pub const SLOTS_ASSIGNED_INFO_KEY: &str = "cluster_slots_assigned";
pub const LOCAL_EPOCH_INFO_KEY: &str = "cluster_current_epoch";

/// Sentinel returned by the integer accessors when a field is absent or
/// unparseable. Callers treat it the same as zero: not yet configured.
pub const UNKNOWN_FIELD: i64 = -1;

/// State of the cluster as reported by the node we asked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClusterState {
    Ok,
    Fail,
    Unknown,
}

/// One snapshot of the cluster as seen from a single node.
///
/// Always re-fetched before acting on it; the configurator is actively
/// mutating the state this reflects.
#[derive(Clone, Debug)]
pub struct ClusterInfo {
    fields: HashMap<String, String>,
}

impl FromStr for ClusterInfo {
    type Err = ClusterError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut fields = HashMap::new();

        for line in raw.lines() {
            let pieces: Vec<&str> = line.split(':').collect();
            if pieces.len() != 2 {
                log::warn!(text = line; "unhandled cluster info line");
                continue;
            }

            fields.insert(pieces[0].to_string(), pieces[1].trim_end().to_string());
        }

        if fields.is_empty() {
            return Err(ClusterError::EmptyClusterInfo);
        }

        Ok(Self { fields })
    }
}

impl ClusterInfo {
    pub fn state(&self) -> ClusterState {
        let Some(state) = self.fields.get(STATE_INFO_KEY) else {
            log::debug!("no cluster state found in cluster info");
            return ClusterState::Unknown;
        };

        match state.as_str() {
            "ok" => ClusterState::Ok,
            "fail" => ClusterState::Fail,
            other => {
                log::debug!(state = other; "unrecognized cluster state");
                ClusterState::Unknown
            }
        }
    }

    pub fn cluster_epoch(&self) -> i64 {
        self.get_i64(EPOCH_INFO_KEY)
    }

    pub fn local_epoch(&self) -> i64 {
        self.get_i64(LOCAL_EPOCH_INFO_KEY)
    }

    /// Number of primary nodes in the cluster.
    pub fn size(&self) -> i64 {
        self.get_i64(SIZE_INFO_KEY)
    }

    /// Number of slots assigned to any node in the cluster.
    pub fn slots_assigned(&self) -> i64 {
        self.get_i64(SLOTS_ASSIGNED_INFO_KEY)
    }

    pub fn known_node_count(&self) -> i64 {
        self.get_i64(KNOWN_NODE_COUNT_INFO_KEY)
    }

    fn get_i64(&self, key: &str) -> i64 {
        let Some(value) = self.fields.get(key) else {
            log::debug!(field = key; "field not present in cluster info");
            return UNKNOWN_FIELD;
        };

        match value.parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::debug!(field = key, value = value.as_str(); "field is not an integer");
                UNKNOWN_FIELD
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_report() {
        let info: ClusterInfo = "cluster_state:ok\ncluster_current_epoch:3\n"
            .parse()
            .unwrap();

        assert_eq!(info.state(), ClusterState::Ok);
        assert_eq!(info.local_epoch(), 3);
        assert_eq!(info.cluster_epoch(), 3);
    }

    #[test]
    fn empty_report_is_an_error() {
        assert!("".parse::<ClusterInfo>().is_err());
        assert!("\n\n".parse::<ClusterInfo>().is_err());
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let info: ClusterInfo = "garbage with no colon\ncluster_state:ok\n"
            .parse()
            .unwrap();

        assert_eq!(info.state(), ClusterState::Ok);
    }

    #[test]
    fn crlf_terminated_lines_parse() {
        // valkey terminates CLUSTER INFO lines with \r\n.
        let info: ClusterInfo = "cluster_state:fail\r\ncluster_slots_assigned:16384\r\n"
            .parse()
            .unwrap();

        assert_eq!(info.state(), ClusterState::Fail);
        assert_eq!(info.slots_assigned(), 16384);
    }

    #[test]
    fn absent_and_unparseable_fields_read_as_unknown() {
        let info: ClusterInfo = "cluster_state:ok\ncluster_size:soon\n".parse().unwrap();

        assert_eq!(info.size(), UNKNOWN_FIELD);
        assert_eq!(info.slots_assigned(), UNKNOWN_FIELD);
    }

    #[test]
    fn unrecognized_state_reads_as_unknown() {
        let info: ClusterInfo = "cluster_state:degraded\n".parse().unwrap();
        assert_eq!(info.state(), ClusterState::Unknown);

        let info: ClusterInfo = "cluster_size:3\n".parse().unwrap();
        assert_eq!(info.state(), ClusterState::Unknown);
    }
}
