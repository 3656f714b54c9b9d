//! StatefulSet watch: reduces raw Kubernetes watch traffic to
//! `MembershipEvent`s on a channel.
//!
//! The previous observed member count is tracked here so updates carry
//! both sides of the change, and a resync tick re-delivers the last count
//! at a fixed interval — that is what retries a failed configuration
//! attempt when the set itself is quiet.

use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt};
use k8s_openapi::api::apps::v1::StatefulSet;
use kube::api::Api;
use kube::runtime::watcher;
use tokio_util::sync::CancellationToken;

use valkeeper_cluster::handler::MembershipEvent;

use crate::config::ManagerConfig;
use crate::errors::ManagerError;

/// The member count a StatefulSet declares, if it declares one.
fn declared_members(ss: &StatefulSet) -> Option<i32> {
    ss.spec.as_ref().and_then(|spec| spec.replicas)
}

pub async fn run(
    client: kube::Client,
    config: &ManagerConfig,
    events: flume::Sender<MembershipEvent>,
    cancel: CancellationToken,
) -> Result<(), ManagerError> {
    let api: Api<StatefulSet> = Api::namespaced(client, &config.namespace);

    // NB: the selector should isolate exactly our own StatefulSet. If it
    // matches more than one, their counts will fight each other.
    let mut watcher_config = watcher::Config::default();
    if !config.label_selector.is_empty() {
        watcher_config = watcher_config.labels(&config.label_selector);
    }

    let mut stream = watcher(api, watcher_config).boxed();
    let mut last_seen: Option<Option<i32>> = None;

    let mut resync = tokio::time::interval(Duration::from_secs(config.resync_secs));
    resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),

            _ = resync.tick() => {
                if let Some(count) = last_seen {
                    log::debug!("resyncing last observed member count");
                    if events.send_async(MembershipEvent::Added(count)).await.is_err() {
                        return Ok(());
                    }
                }
            }

            item = stream.try_next() => match item {
                Ok(Some(watcher::Event::Applied(ss))) => {
                    let new = declared_members(&ss);
                    let event = match last_seen.replace(new) {
                        None => MembershipEvent::Added(new),
                        Some(old) => MembershipEvent::Updated { old, new },
                    };

                    if events.send_async(event).await.is_err() {
                        return Ok(());
                    }
                }

                Ok(Some(watcher::Event::Deleted(_))) => {
                    last_seen = None;
                    if events.send_async(MembershipEvent::Removed).await.is_err() {
                        return Ok(());
                    }
                }

                Ok(Some(watcher::Event::Restarted(sets))) => {
                    for ss in &sets {
                        let new = declared_members(ss);
                        let event = match last_seen.replace(new) {
                            None => MembershipEvent::Added(new),
                            Some(old) => MembershipEvent::Updated { old, new },
                        };

                        if events.send_async(event).await.is_err() {
                            return Ok(());
                        }
                    }
                }

                // Watch closed; the receiver side shuts us down too.
                Ok(None) => return Ok(()),

                // The watcher re-establishes itself; just note it.
                Err(e) => log::warn!(err = e.to_string(); "statefulset watch error"),
            }
        }
    }
}
