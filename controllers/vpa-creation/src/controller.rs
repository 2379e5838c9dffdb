//! Main controller implementation.
//!
//! This module contains the `Controller` struct that wires the store,
//! reconciler, workload watchers, orphan sweeper and metrics server together.

use crate::config::ControllerConfig;
use crate::error::ControllerError;
use crate::metrics::ControllerMetrics;
use crate::reconciler::Reconciler;
use crate::server::{self, AppState};
use crate::watcher::{self, Dispatch, WatchSettings};
use crds::VerticalPodAutoscaler;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use kube::{Api, Client};
use kube_store::KubeStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

type TaskHandle = JoinHandle<Result<(), ControllerError>>;

/// Typed API for `K`, scoped to the watched namespace when one is set
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Main controller for advisory VPA management.
pub struct Controller {
    deployment_watcher: TaskHandle,
    daemon_set_watcher: TaskHandle,
    stateful_set_watcher: TaskHandle,
    orphan_sweeper: TaskHandle,
    metrics_server: TaskHandle,
}

impl Controller {
    /// Creates a new controller instance and starts its tasks.
    pub async fn new(config: ControllerConfig) -> Result<Self, ControllerError> {
        info!("Initializing VPA creation controller");

        let kube_client = Client::try_default().await?;
        let namespace = config.namespace.as_deref();

        let metrics = ControllerMetrics::new()?;
        let app_state = Arc::new(AppState::new(metrics.clone()));
        let metrics_server = {
            let state = app_state.clone();
            let addr = config.metrics_addr;
            tokio::spawn(async move { server::serve(addr, state).await })
        };

        let store = KubeStore::new(kube_client.clone());
        let vpa_installed = store.vpa_kind_installed(namespace).await?;
        if vpa_installed {
            info!("VPA CRD detected");
        } else {
            warn!("VPA CRD not installed; VPAs will be created once it is");
        }

        let reconciler = Arc::new(Reconciler::new(
            Box::new(store),
            Arc::new(metrics),
            config.namespace.clone(),
        ));
        let dispatch = Arc::new(Dispatch::new(reconciler, config.capability_retry));

        let settings = WatchSettings {
            debounce: config.debounce,
            concurrency: config.concurrency,
            vpa_api: vpa_installed.then(|| scoped_api::<VerticalPodAutoscaler>(&kube_client, namespace)),
        };

        let deployment_watcher = {
            let api: Api<Deployment> = scoped_api(&kube_client, namespace);
            let dispatch = dispatch.clone();
            let settings = settings.clone();
            tokio::spawn(async move { watcher::watch_workload(api, dispatch, settings).await })
        };

        let daemon_set_watcher = {
            let api: Api<DaemonSet> = scoped_api(&kube_client, namespace);
            let dispatch = dispatch.clone();
            let settings = settings.clone();
            tokio::spawn(async move { watcher::watch_workload(api, dispatch, settings).await })
        };

        let stateful_set_watcher = {
            let api: Api<StatefulSet> = scoped_api(&kube_client, namespace);
            let dispatch = dispatch.clone();
            tokio::spawn(async move { watcher::watch_workload(api, dispatch, settings).await })
        };

        let orphan_sweeper = {
            let interval = config.sweep_interval;
            tokio::spawn(async move { watcher::run_sweeper(dispatch, interval).await })
        };

        app_state.set_ready();
        info!("All watchers started");

        Ok(Self {
            deployment_watcher,
            daemon_set_watcher,
            stateful_set_watcher,
            orphan_sweeper,
            metrics_server,
        })
    }

    /// Runs until a watcher stops (shutdown signal) or a task fails.
    pub async fn run(mut self) -> Result<(), ControllerError> {
        info!("VPA creation controller running");

        let (task, result) = tokio::select! {
            result = &mut self.deployment_watcher => ("Deployment watcher", result),
            result = &mut self.daemon_set_watcher => ("DaemonSet watcher", result),
            result = &mut self.stateful_set_watcher => ("StatefulSet watcher", result),
            result = &mut self.orphan_sweeper => ("Orphan sweeper", result),
            result = &mut self.metrics_server => ("Metrics server", result),
        };

        result
            .map_err(|e| ControllerError::Watch(format!("{} panicked: {}", task, e)))?
            .map_err(|e| ControllerError::Watch(format!("{} error: {}", task, e)))?;

        info!("{} stopped, shutting down", task);
        Ok(())
    }
}
