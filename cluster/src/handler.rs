//! Membership-event handling and reconciliation state.
//!
//! Whatever machinery watches the StatefulSet reduces its callbacks to the
//! one `MembershipEvent` enum here, keeping the engine independent of any
//! particular watch framework. The handler serializes configuration
//! attempts and owns the "cluster configured" flag the readiness probe
//! reports.

use std::sync::{PoisonError, RwLock};

use tokio::sync::Mutex;

use crate::configure::Configurator;

/// A change to the group's membership, carrying the declared member count
/// where one was available.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MembershipEvent {
    Added(Option<i32>),
    Updated { old: Option<i32>, new: Option<i32> },
    Removed,
}

pub struct UpdateHandler {
    configurator: Configurator,
    run_lock: Mutex<()>,
    cluster_configured: RwLock<bool>,
}

impl UpdateHandler {
    pub fn new(configurator: Configurator) -> Self {
        Self {
            configurator,
            run_lock: Mutex::new(()),
            cluster_configured: RwLock::new(false),
        }
    }

    /// Whether the last configuration attempt succeeded. False until one
    /// has.
    pub fn cluster_configured(&self) -> bool {
        *self
            .cluster_configured
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn on_event(&self, event: MembershipEvent) {
        let count = match event {
            MembershipEvent::Added(count) => count,
            MembershipEvent::Updated { old, new } => {
                // We only care about changes in member counts; any other
                // update to the set is noise.
                if old == new {
                    return;
                }
                new
            }
            MembershipEvent::Removed => {
                // Nothing we can do.
                log::debug!("statefulset removed");
                return;
            }
        };

        let Some(count) = count.filter(|c| *c > 0) else {
            log::warn!("failed to locate member count; cannot configure cluster");
            return;
        };

        // One configuration attempt at a time. Nothing queues behind the
        // lock: membership events are idempotent to replay, and the watch
        // side re-delivers on its resync interval anyway.
        let _running = self.run_lock.lock().await;

        match self.configurator.configure(count).await {
            Ok(()) => {
                log::info!(members = count; "cluster configured");
                self.set_configured(true);
            }
            Err(e) => {
                log::error!(err = e.to_string(); "failed to reconfigure cluster after member count change");
                self.set_configured(false);
            }
        }
    }

    fn set_configured(&self, value: bool) {
        *self
            .cluster_configured
            .write()
            .unwrap_or_else(PoisonError::into_inner) = value;
    }
}
