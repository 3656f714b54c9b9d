//! Applies a planned role to the local valkey instance.
//!
//! Every pass starts from what the live node reports, not from anything
//! remembered between passes: an epoch already set stays set, slots already
//! assigned stay assigned. That makes the whole sequence safe to re-run on
//! every membership change and after restarts.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::client::{wait_ready, Connector, NodeAdmin};
use crate::errors::ClusterError;
use crate::info::ClusterInfo;
use crate::resolve::{AddressResolver, NodeAddr};
use crate::topology::{Role, TopologyPlan};

pub struct Configurator {
    connector: Arc<dyn Connector>,
    resolver: Arc<dyn AddressResolver>,
    local_addr: NodeAddr,
    our_index: u32,
    cancel: CancellationToken,
}

impl Configurator {
    pub fn new(
        connector: Arc<dyn Connector>,
        resolver: Arc<dyn AddressResolver>,
        local_addr: NodeAddr,
        our_index: u32,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            connector,
            resolver,
            local_addr,
            our_index,
            cancel,
        }
    }

    /// Run one full configuration pass for a group of `total_count` members.
    pub async fn configure(&self, total_count: i32) -> Result<(), ClusterError> {
        let plan = TopologyPlan::for_group(total_count)?;

        let mut local = wait_ready(&self.cancel, self.connector.as_ref(), &self.local_addr).await?;
        log::info!("local valkey is alive");

        match plan.role_for(self.our_index) {
            Role::Primary => {
                log::info!(index = self.our_index; "configuring ourselves as a primary node");
                self.configure_primary(local.as_mut(), &plan).await
            }
            Role::Replica => {
                log::info!(index = self.our_index; "configuring ourselves as a replica node");
                self.configure_replica(local.as_mut(), &plan).await
            }
        }
    }

    async fn configure_primary(
        &self,
        local: &mut dyn NodeAdmin,
        plan: &TopologyPlan,
    ) -> Result<(), ClusterError> {
        let info: ClusterInfo = local.cluster_info().await?.parse()?;

        // Ensure the epoch is set.
        if info.local_epoch() > 0 {
            log::debug!(index = self.our_index; "cluster epoch is configured");
        } else {
            let epoch = u64::from(self.our_index) + 1;
            log::info!(index = self.our_index, epoch = epoch; "setting cluster epoch equal to node index + 1");

            local
                .set_config_epoch(epoch)
                .await
                .map_err(ClusterError::epoch(self.our_index))?;
        }

        // Ensure slots are configured. A primary with no slots cannot serve
        // traffic, so failure here fails the attempt.
        if info.slots_assigned() > 0 {
            log::debug!(index = self.our_index; "slots for this node are already assigned");
        } else {
            let (first, last) = plan.slot_range_for(self.our_index);
            log::info!(index = self.our_index, first = first, last = last; "setting cluster shard slots");

            local
                .add_slots_range(first, last)
                .await
                .map_err(ClusterError::slots(first, last, self.our_index))?;
        }

        // Peers that are still starting will be met on a later pass, or by
        // their own symmetric meet attempt. Not worth failing over.
        for peer_index in 0..plan.primary_count() {
            if peer_index == self.our_index {
                continue;
            }

            let peer = match self.resolver.resolve(peer_index) {
                Ok(addr) => addr,
                Err(e) => {
                    log::warn!(peer_index = peer_index, err = e.to_string(); "failed to resolve peer address");
                    continue;
                }
            };

            log::info!(index = self.our_index, peer_index = peer_index; "introducing ourselves to peer");

            if let Err(e) = local.meet(&peer.host, peer.port).await {
                log::warn!(peer_index = peer_index, err = e.to_string(); "failed to introduce peer");
                continue;
            }
        }

        Ok(())
    }

    async fn configure_replica(
        &self,
        local: &mut dyn NodeAdmin,
        plan: &TopologyPlan,
    ) -> Result<(), ClusterError> {
        let primary_index = plan.primary_index_for(self.our_index);
        let primary = self.resolver.resolve(primary_index)?;

        // Our primary may not even be scheduled yet; wait until it answers
        // before attaching to it.
        wait_ready(&self.cancel, self.connector.as_ref(), &primary).await?;

        let primary_addr = primary.to_string();
        log::info!(index = self.our_index, primary = primary_addr.as_str(); "configuring our valkey instance as a replica");

        local
            .replicate(&primary_addr)
            .await
            .map_err(|source| ClusterError::Replicate {
                primary: primary_addr,
                source: Box::new(source),
            })
    }
}
