//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize all subsystems in dependency order
//! - Apply the initial cluster state before accepting traffic
//! - Start background tasks (metrics exporter, config watcher, signals)
//! - Bind listeners and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: a listener that cannot bind is fatal
//! - Listeners start last (traffic only when routes are loaded)
//! - Config reloads are applied by a single task, one at a time

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::admin::{setup_admin_router, AdminState};
use crate::config::{ConfigWatcher, GatewayConfig};
use crate::control::{ControlPlane, DataPlane};
use crate::http::{Forwarder, HttpServer, HyperForwarder, PipelineSettings, RequestPipeline};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::shutdown_on_signal;
use crate::net::{build_client, Resolver, TransportStats};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The assembled gateway: data plane, control plane and both HTTP surfaces.
pub struct Gateway {
    config: GatewayConfig,
    data: DataPlane,
    control: ControlPlane,
    stats: Arc<TransportStats>,
    pipeline: Arc<RequestPipeline>,
    shutdown: Shutdown,
}

impl Gateway {
    /// Build with the pooled hyper transport.
    pub fn new(config: GatewayConfig, shutdown: Shutdown) -> Self {
        let stats = Arc::new(TransportStats::default());
        let resolver = Self::resolver(&config, stats);
        let client = build_client(&config.transport, &config.timeouts, resolver.clone());
        Self::assemble(config, shutdown, resolver, Arc::new(HyperForwarder::new(client)))
    }

    /// Build with a caller-supplied transport.
    pub fn with_forwarder(
        config: GatewayConfig,
        shutdown: Shutdown,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let stats = Arc::new(TransportStats::default());
        let resolver = Self::resolver(&config, stats);
        Self::assemble(config, shutdown, resolver, forwarder)
    }

    fn resolver(config: &GatewayConfig, stats: Arc<TransportStats>) -> Resolver {
        Resolver::new(
            &config.transport.static_hosts,
            std::time::Duration::from_secs(config.transport.dns_cache_ttl_secs),
            stats,
        )
    }

    fn assemble(
        config: GatewayConfig,
        shutdown: Shutdown,
        resolver: Resolver,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        let data = DataPlane::new();
        let control = data.control_plane();
        control.apply_cluster_state(&config.cluster);

        let stats = resolver.stats().clone();
        let pipeline = Arc::new(RequestPipeline::new(
            data.clone(),
            resolver,
            forwarder,
            shutdown.clone(),
            PipelineSettings::from_config(&config),
        ));

        Self {
            config,
            data,
            control,
            stats,
            pipeline,
            shutdown,
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn data_plane(&self) -> &DataPlane {
        &self.data
    }

    pub fn control_plane(&self) -> &ControlPlane {
        &self.control
    }

    pub fn stats(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    pub fn proxy_router(&self) -> Router {
        HttpServer::new(self.pipeline.clone()).router()
    }

    pub fn admin_router(&self) -> Router {
        setup_admin_router(AdminState {
            data: self.data.clone(),
            stats: self.stats.clone(),
        })
    }

    /// Apply a reloaded configuration. Only the cluster section takes
    /// effect; other changes are reported and wait for a restart.
    pub fn apply_update(&mut self, new: GatewayConfig) {
        let old = &self.config;
        let restart_needed = old.listener != new.listener
            || old.admin != new.admin
            || old.timeouts != new.timeouts
            || old.cold_start != new.cold_start
            || old.transport != new.transport
            || old.observability != new.observability;
        if restart_needed {
            tracing::warn!("Config changes outside [cluster] take effect after a restart");
        }

        self.control.apply_cluster_state(&new.cluster);
        tracing::info!(
            routes = new.cluster.routes.len(),
            slices = new.cluster.endpoint_slices.len(),
            "Cluster state reloaded"
        );
        self.config = new;
    }

    /// Serve on already-bound listeners until shutdown. Config updates
    /// arriving on `updates` are applied in order.
    pub async fn serve(
        mut self,
        proxy: TcpListener,
        admin: Option<TcpListener>,
        updates: Option<mpsc::UnboundedReceiver<GatewayConfig>>,
    ) -> Result<(), StartupError> {
        let proxy_server = HttpServer::new(self.pipeline.clone());

        let admin_task = admin.map(|listener| {
            let router = self.admin_router();
            let shutdown = self.shutdown.clone();
            tokio::spawn(async move {
                let addr = listener.local_addr().ok();
                tracing::info!(address = ?addr, "Admin server starting");
                let result = axum::serve(listener, router)
                    .with_graceful_shutdown(async move { shutdown.wait().await })
                    .await;
                if let Err(e) = result {
                    tracing::error!(error = %e, "Admin server failed");
                }
            })
        });

        let shutdown = self.shutdown.clone();
        let proxy_task = tokio::spawn(proxy_server.run(proxy, shutdown.clone()));

        if let Some(mut updates) = updates {
            loop {
                tokio::select! {
                    update = updates.recv() => match update {
                        Some(config) => self.apply_update(config),
                        None => break,
                    },
                    _ = shutdown.wait() => break,
                }
            }
        }

        let result = proxy_task.await.map_err(std::io::Error::other)?;
        if let Some(task) = admin_task {
            let _ = task.await;
        }
        result?;
        tracing::info!("Gateway stopped");
        Ok(())
    }

    /// Bind listeners from config, start the exporter, watcher and signal
    /// handler, then serve until shutdown.
    pub async fn run(self, config_path: Option<&Path>) -> Result<(), StartupError> {
        let obs = &self.config.observability;
        if obs.metrics_enabled {
            match obs.metrics_address.parse::<SocketAddr>() {
                Ok(addr) => {
                    if let Err(e) = metrics::init_metrics(addr) {
                        tracing::error!(error = %e, "Failed to start metrics exporter");
                    }
                }
                Err(_) => tracing::error!(
                    metrics_address = %obs.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let proxy = bind(&self.config.listener.bind_address).await?;
        let admin = if self.config.admin.enabled {
            Some(bind(&self.config.admin.bind_address).await?)
        } else {
            None
        };

        let (_watcher, updates) = match config_path {
            Some(path) => {
                let (watcher, updates) = ConfigWatcher::new(path);
                (Some(watcher.run()?), Some(updates))
            }
            None => (None, None),
        };

        tokio::spawn(shutdown_on_signal(self.shutdown.clone()));
        self.serve(proxy, admin, updates).await
    }
}

async fn bind(address: &str) -> Result<TcpListener, StartupError> {
    TcpListener::bind(address)
        .await
        .map_err(|source| StartupError::Bind {
            address: address.to_string(),
            source,
        })
}
