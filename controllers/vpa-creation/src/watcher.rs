//! Kubernetes resource watchers.
//!
//! Each workload kind gets its own `kube_runtime::Controller`. They all feed
//! the same `Reconciler` with a (namespace, name) key; the reconciler resolves
//! the kind itself. A separate sweeper task drives the orphan sweep on a timer.

use crate::backoff::KeyedBackoff;
use crate::error::ControllerError;
use crate::reconciler::{ReconcileKey, ReconcileOutcome, Reconciler};
use crds::VerticalPodAutoscaler;
use futures::StreamExt;
use kube::{Api, Resource};
use kube_runtime::{
    controller::{self, Action, Config as RuntimeConfig},
    watcher, Controller,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Shared context handed to every controller and the sweeper
pub struct Dispatch {
    pub reconciler: Arc<Reconciler>,
    backoff: KeyedBackoff,
    capability_retry: Duration,
}

impl Dispatch {
    pub fn new(reconciler: Arc<Reconciler>, capability_retry: Duration) -> Self {
        Self {
            reconciler,
            backoff: KeyedBackoff::new(),
            capability_retry,
        }
    }

    /// Reconcile `key`, clearing its backoff on success
    pub async fn dispatch(&self, key: &ReconcileKey) -> Result<ReconcileOutcome, ControllerError> {
        let outcome = self.reconciler.reconcile(key).await?;
        self.backoff.reset(&key.to_string());
        Ok(outcome)
    }

    /// Requeue action for a successful outcome
    pub fn action_for(&self, outcome: &ReconcileOutcome) -> Action {
        match outcome {
            ReconcileOutcome::CapabilityUnavailable => Action::requeue(self.capability_retry),
            _ => Action::await_change(),
        }
    }

    /// Backoff delay for a failed reconcile of `key`
    fn backoff_delay(&self, key: &ReconcileKey, error: &ControllerError) -> Duration {
        let (delay, attempts) = self.backoff.next_delay(&key.to_string());
        warn!(
            key = %key,
            attempts,
            "Reconcile failed, retrying in {}s: {}",
            delay.as_secs(),
            error
        );
        delay
    }

    /// Requeue action for a failed reconcile of `key`
    pub fn retry_after_error(&self, key: &ReconcileKey, error: &ControllerError) -> Action {
        Action::requeue(self.backoff_delay(key, error))
    }

    /// Drop the backoff state of a key whose object no longer exists
    pub fn forget(&self, key: &ReconcileKey) {
        self.backoff.reset(&key.to_string());
    }

    /// How long to wait before repeating a sweep, or `None` when it is done
    /// until the next tick
    fn sweep_retry_delay(&self, result: &Result<ReconcileOutcome, ControllerError>) -> Option<Duration> {
        match result {
            Ok(ReconcileOutcome::CapabilityUnavailable) => Some(self.capability_retry),
            Ok(_) => None,
            Err(e) => Some(self.backoff_delay(&ReconcileKey::Sweep, e)),
        }
    }
}

async fn reconcile_workload<K>(obj: Arc<K>, ctx: Arc<Dispatch>) -> Result<Action, ControllerError>
where
    K: Resource,
{
    let key = ReconcileKey::for_resource(obj.as_ref());
    let outcome = ctx.dispatch(&key).await?;
    debug!(key = %key, "Reconcile outcome: {:?}", outcome);
    Ok(ctx.action_for(&outcome))
}

fn error_policy<K>(obj: Arc<K>, error: &ControllerError, ctx: Arc<Dispatch>) -> Action
where
    K: Resource,
{
    ctx.retry_after_error(&ReconcileKey::for_resource(obj.as_ref()), error)
}

/// Settings shared by all workload watchers
#[derive(Clone)]
pub struct WatchSettings {
    pub debounce: Duration,
    pub concurrency: u16,
    /// Present only when the VPA CRD is installed
    pub vpa_api: Option<Api<VerticalPodAutoscaler>>,
}

/// Watch one workload kind and reconcile every change until shutdown.
///
/// When the VPA API is available the controller also owns VPAs, so deleting a
/// VPA re-triggers its owning workload.
pub async fn watch_workload<K>(
    api: Api<K>,
    dispatch: Arc<Dispatch>,
    settings: WatchSettings,
) -> Result<(), ControllerError>
where
    K: Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    info!("Starting {} watcher", kind);

    let runtime_config = RuntimeConfig::default()
        .debounce(settings.debounce)
        .concurrency(settings.concurrency);

    let mut controller = Controller::new(api, watcher::Config::default()).with_config(runtime_config);
    match settings.vpa_api {
        Some(vpa_api) => controller = controller.owns(vpa_api, watcher::Config::default()),
        None => warn!("VPA CRD not installed, {} watcher will not react to VPA deletions", kind),
    }

    controller
        .shutdown_on_signal()
        .run(reconcile_workload::<K>, error_policy::<K>, dispatch.clone())
        .for_each(|res| {
            let kind = kind.as_str();
            let dispatch = dispatch.as_ref();
            async move {
                match res {
                    Ok((obj, _)) => debug!("Reconciled {} {}", kind, obj),
                    // The object was deleted while requeued; neither the reconciler
                    // nor the error policy will see its key again
                    Err(controller::Error::ObjectNotFound(obj)) => {
                        debug!("{} {} gone before its retry", kind, obj);
                        dispatch.forget(&ReconcileKey::new(
                            obj.namespace.unwrap_or_else(|| "default".to_string()),
                            obj.name,
                        ));
                    }
                    // Reconcile failures are already logged by the error policy
                    Err(e @ controller::Error::ReconcilerFailed(..)) => {
                        debug!("{} controller event not reconciled: {}", kind, e)
                    }
                    Err(e) => warn!("{} controller error: {}", kind, e),
                }
            }
        })
        .await;

    info!("{} watcher stopped", kind);
    Ok(())
}

/// Run the orphan sweep every `interval`, starting immediately.
///
/// A failed sweep is retried with backoff, and a sweep that found no VPA kind
/// is retried after the capability delay, until it completes or the next
/// tick is due.
pub async fn run_sweeper(dispatch: Arc<Dispatch>, interval: Duration) -> Result<(), ControllerError> {
    info!("Starting orphan sweeper every {}s", interval.as_secs());
    let key = ReconcileKey::Sweep;
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        loop {
            let result = dispatch.dispatch(&key).await;
            if let Ok(outcome) = &result {
                debug!("Sweep outcome: {:?}", outcome);
            }
            match dispatch.sweep_retry_delay(&result) {
                Some(delay) if delay < interval => tokio::time::sleep(delay).await,
                _ => break,
            }
        }
    }
}
