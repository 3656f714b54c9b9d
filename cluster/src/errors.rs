use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("IO error {0}")]
    IoError(#[from] std::io::Error),

    #[error("unexpected protocol data: {0}")]
    ProtocolError(String),

    #[error("valkey refused command: {0}")]
    CommandError(String),

    #[error("no cluster info found")]
    EmptyClusterInfo,

    #[error("failed to set epoch on node {index}: {source}")]
    EpochAssignment {
        index: u32,
        source: Box<ClusterError>,
    },

    #[error("failed to set slot range ({first} - {last}) on node {index}: {source}")]
    SlotAssignment {
        first: u16,
        last: u16,
        index: u32,
        source: Box<ClusterError>,
    },

    #[error("failed to attach to primary {primary}: {source}")]
    Replicate {
        primary: String,
        source: Box<ClusterError>,
    },

    #[error("failed to resolve address for node {0}")]
    AddressResolution(u32),

    #[error("cannot plan a cluster of {0} members")]
    InvalidGroupSize(i32),

    #[error("cancelled while waiting for node to become ready")]
    Cancelled,
}

impl ClusterError {
    /// Wrap a command failure with the epoch-assignment context.
    pub(crate) fn epoch(index: u32) -> impl FnOnce(ClusterError) -> ClusterError {
        move |source| ClusterError::EpochAssignment {
            index,
            source: Box::new(source),
        }
    }

    /// Wrap a command failure with the slot-assignment context.
    pub(crate) fn slots(first: u16, last: u16, index: u32) -> impl FnOnce(ClusterError) -> ClusterError {
        move |source| ClusterError::SlotAssignment {
            first,
            last,
            index,
            source: Box::new(source),
        }
    }
}
