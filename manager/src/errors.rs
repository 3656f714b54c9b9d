use thiserror::Error;

use valkeeper_cluster::errors::ClusterError;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Config error {0}")]
    ConfigError(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Kubernetes API error {0}")]
    KubeError(#[from] kube::Error),

    #[error("Rocket failed {0}")]
    RocketError(String),

    #[error("{0}")]
    ClusterError(#[from] ClusterError),
}

impl From<rocket::Error> for ManagerError {
    fn from(value: rocket::Error) -> Self {
        ManagerError::RocketError(value.to_string())
    }
}
