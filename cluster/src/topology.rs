//! Pure topology arithmetic: who is a primary, who replicates whom, and
//! which slot range each primary owns. No I/O lives here.

use crate::errors::ClusterError;
use crate::TOTAL_SLOT_COUNT;

/// The part a StatefulSet member plays in the cluster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

/// Primary/replica split derived from the set's declared member count.
///
/// Half the members (rounded down, never fewer than one) become primaries;
/// everyone else becomes a replica. Derived fresh on every reconciliation,
/// never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopologyPlan {
    primary_count: u32,
    replica_count: u32,
}

impl TopologyPlan {
    pub fn for_group(total_count: i32) -> Result<Self, ClusterError> {
        if total_count <= 0 {
            return Err(ClusterError::InvalidGroupSize(total_count));
        }

        let total = total_count as u32;
        let primary_count = (total / 2).max(1);

        Ok(Self {
            primary_count,
            replica_count: total - primary_count,
        })
    }

    pub fn primary_count(&self) -> u32 {
        self.primary_count
    }

    pub fn replica_count(&self) -> u32 {
        self.replica_count
    }

    /// Members with the lowest indices are the primaries.
    pub fn role_for(&self, index: u32) -> Role {
        if index < self.primary_count {
            Role::Primary
        } else {
            Role::Replica
        }
    }

    /// Inclusive slot range owned by the primary at `index`.
    ///
    /// The last primary's range always ends at the final slot, so the
    /// remainder of the integer division is never left unowned.
    pub fn slot_range_for(&self, index: u32) -> (u16, u16) {
        let slot_size = TOTAL_SLOT_COUNT / self.primary_count;
        let first = index * slot_size;

        let last = if index + 1 == self.primary_count {
            TOTAL_SLOT_COUNT - 1
        } else {
            first + slot_size - 1
        };

        (first as u16, last as u16)
    }

    /// Index of the primary a replica at `index` attaches to.
    ///
    /// Replicas are spread round-robin across primaries rather than
    /// clustered on the first one.
    pub fn primary_index_for(&self, index: u32) -> u32 {
        index % self.primary_count
    }
}
