//! Process-level wiring for valkeeper: configuration, the StatefulSet
//! watch, the reconciliation loop, and the health surface. The actual
//! cluster formation logic lives in `valkeeper_cluster`.

#[macro_use]
extern crate rocket;

pub mod config;
pub mod errors;
pub mod health;
pub mod watch;

use std::sync::Arc;

use rocket::{Build, Rocket};
use tokio_util::sync::CancellationToken;

use valkeeper_cluster::client::TcpConnector;
use valkeeper_cluster::configure::Configurator;
use valkeeper_cluster::handler::UpdateHandler;
use valkeeper_cluster::resolve::{HostnameResolver, NodeAddr};

use crate::config::AppConfig;
use crate::errors::ManagerError;

/// Ties the watch, the reconciliation handler, and the health service
/// together for one StatefulSet member.
pub struct Manager {
    config: AppConfig,
    client: kube::Client,
    handler: Arc<UpdateHandler>,
    cancel: CancellationToken,
}

impl Manager {
    /// Expects a validated config; `index` must be non-negative.
    pub fn new(client: kube::Client, config: AppConfig, cancel: CancellationToken) -> Self {
        let resolver = HostnameResolver::new(
            config.manager.node_name_prefix.clone(),
            config.manager.node_domain.clone(),
            config.manager.valkey_port,
        );

        let local = NodeAddr {
            host: config.manager.local_host.clone(),
            port: config.manager.valkey_port,
        };

        let configurator = Configurator::new(
            Arc::new(TcpConnector),
            Arc::new(resolver),
            local,
            config.manager.index as u32,
            cancel.clone(),
        );

        Self {
            config,
            client,
            handler: Arc::new(UpdateHandler::new(configurator)),
            cancel,
        }
    }

    /// Runs the health service, the StatefulSet watch, and the
    /// reconciliation loop until cancellation.
    pub async fn run(&self) -> Result<(), ManagerError> {
        let (tx, rx) = flume::unbounded();

        let rocket = health_rocket(&self.config, self.handler.clone());
        let health = tokio::spawn(async move {
            if let Err(e) = rocket.launch().await {
                log::error!("health service failed {e}");
            }
        });

        let reconcile = {
            let handler = self.handler.clone();
            async move {
                while let Ok(event) = rx.recv_async().await {
                    handler.on_event(event).await;
                }
            }
        };

        let watch = watch::run(
            self.client.clone(),
            &self.config.manager,
            tx,
            self.cancel.clone(),
        );

        let result = tokio::select! {
            result = watch => result,
            _ = reconcile => Ok(()),
            _ = self.cancel.cancelled() => Ok(()),
        };

        health.abort();

        result
    }
}

pub fn health_rocket(config: &AppConfig, handler: Arc<UpdateHandler>) -> Rocket<Build> {
    rocket::build()
        .configure(&config.rocket)
        .manage(handler)
        .mount("/", routes![health::healthz, health::readyz])
}
