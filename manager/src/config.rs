use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use valkeeper_cluster::{NODE_NAME_PREFIX, VALKEY_PORT};

use crate::errors::ManagerError;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AppConfig {
    pub rocket: rocket::Config,
    pub manager: ManagerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut rocket = rocket::Config::default();
        // The orchestrator probes this port from outside the pod; 8087
        // keeps clear of valkey's.
        rocket.address = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        rocket.port = 8087;
        // Shutdown is driven by the process-wide cancellation token, not
        // by rocket's own signal handling.
        rocket.shutdown.ctrlc = false;

        Self {
            rocket,
            manager: ManagerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid by the YAML file (if present), overlaid by
    /// `VALKEEPER_`-prefixed environment variables.
    pub fn load(file: PathBuf) -> Result<Self, ManagerError> {
        Ok(Figment::from(Serialized::defaults(Self::default()))
            .merge(Yaml::file(file))
            .merge(Env::prefixed("VALKEEPER_").split("__"))
            .extract()?)
    }

    /// Missing required values are fatal at startup, before anything runs.
    pub fn validate(&self) -> Result<(), ManagerError> {
        if self.manager.namespace.is_empty() {
            return Err(ManagerError::InvalidConfig(
                "please configure a namespace".to_string(),
            ));
        }

        if self.manager.index < 0 {
            return Err(ManagerError::InvalidConfig(
                "please configure this member's index".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ManagerConfig {
    /// Kubernetes namespace in which the manager and managed valkey run.
    pub namespace: String,

    /// Label selector uniquely identifying the valkey StatefulSet. Only
    /// needed when the namespace holds more than one StatefulSet.
    pub label_selector: String,

    /// Ordinal index of this StatefulSet member.
    pub index: i64,

    /// Seconds between re-deliveries of the last observed member count,
    /// so a failed attempt is retried without waiting for the next change.
    pub resync_secs: u64,

    /// Hostname prefix for peer members, completed by their index.
    pub node_name_prefix: String,

    /// Optional DNS domain qualifying peer hostnames (headless service).
    pub node_domain: Option<String>,

    /// Port valkey serves on, locally and on peers.
    pub valkey_port: u16,

    /// Host of the valkey instance living in this pod.
    pub local_host: String,

    /// Enables debug logging.
    pub debug: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            label_selector: String::new(),
            index: -1,
            resync_secs: 60,
            node_name_prefix: NODE_NAME_PREFIX.to_string(),
            node_domain: None,
            valkey_port: VALKEY_PORT,
            local_host: "127.0.0.1".to_string(),
            debug: false,
        }
    }
}
