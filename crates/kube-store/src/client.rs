//! Kubernetes API store
//!
//! Implements `KubeStoreTrait` on top of a `kube::Client`.

use crate::error::StoreError;
use crate::models::{Workload, WorkloadKind};
use crate::store_trait::KubeStoreTrait;
use crds::VerticalPodAutoscaler;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use kube::api::{DeleteParams, ListParams, ObjectList, PostParams};
use kube::{Api, Client};
use std::future::Future;
use tracing::debug;

/// Default number of VPAs requested per list page
pub const DEFAULT_PAGE_SIZE: u32 = 500;

const VPA_KIND: &str = "VerticalPodAutoscaler";

/// Kubernetes API store
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    page_size: u32,
}

impl KubeStore {
    /// Create a new store backed by `client`
    pub fn new(client: Client) -> Self {
        Self {
            client,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the list page size (minimum 1)
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Check whether the VPA CRD is served by the cluster.
    ///
    /// Lists a single object in `namespace` (or cluster-wide); a 404 on the
    /// collection means the kind is not registered.
    pub async fn vpa_kind_installed(&self, namespace: Option<&str>) -> Result<bool, StoreError> {
        let api: Api<VerticalPodAutoscaler> = match namespace {
            Some(ns) => self.vpa_api(ns),
            None => Api::all(self.client.clone()),
        };
        match api.list(&ListParams::default().limit(1)).await {
            Ok(_) => Ok(true),
            Err(e) => match StoreError::from_collection_request(e, VPA_KIND) {
                StoreError::KindNotRegistered(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    fn vpa_api(&self, namespace: &str) -> Api<VerticalPodAutoscaler> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

/// Fetch every page of a list, following continue tokens until the server
/// returns none (or an empty one)
pub(crate) async fn collect_pages<T, F, Fut>(page_size: u32, mut fetch: F) -> Result<Vec<T>, kube::Error>
where
    T: Clone,
    F: FnMut(ListParams) -> Fut,
    Fut: Future<Output = Result<ObjectList<T>, kube::Error>>,
{
    let mut params = ListParams::default().limit(page_size);
    let mut all_results = Vec::new();

    loop {
        let page = fetch(params.clone()).await?;
        debug!("Fetched page with {} items", page.items.len());
        all_results.extend(page.items);

        match page.metadata.continue_ {
            Some(token) if !token.is_empty() => {
                params = params.continue_token(&token);
            }
            _ => break,
        }
    }

    Ok(all_results)
}

#[async_trait::async_trait]
impl KubeStoreTrait for KubeStore {
    async fn get_workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, StoreError> {
        debug!(kind = %kind, namespace, name, "Probing workload");
        match kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);
                let deployment = api.get(name).await.map_err(StoreError::from_object_request)?;
                Workload::from_deployment(deployment)
            }
            WorkloadKind::DaemonSet => {
                let api: Api<DaemonSet> = Api::namespaced(self.client.clone(), namespace);
                let daemon_set = api.get(name).await.map_err(StoreError::from_object_request)?;
                Workload::from_daemon_set(daemon_set)
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> = Api::namespaced(self.client.clone(), namespace);
                let stateful_set = api.get(name).await.map_err(StoreError::from_object_request)?;
                Workload::from_stateful_set(stateful_set)
            }
        }
    }

    async fn get_vpa(&self, namespace: &str, name: &str) -> Result<VerticalPodAutoscaler, StoreError> {
        self.vpa_api(namespace)
            .get(name)
            .await
            .map_err(StoreError::from_object_request)
    }

    async fn list_vpas(&self, namespace: Option<&str>) -> Result<Vec<VerticalPodAutoscaler>, StoreError> {
        let api: Api<VerticalPodAutoscaler> = match namespace {
            Some(ns) => self.vpa_api(ns),
            None => Api::all(self.client.clone()),
        };

        collect_pages(self.page_size, |params| {
            let api = api.clone();
            async move { api.list(&params).await }
        })
        .await
        .map_err(|e| StoreError::from_collection_request(e, VPA_KIND))
    }

    async fn create_vpa(&self, vpa: &VerticalPodAutoscaler) -> Result<VerticalPodAutoscaler, StoreError> {
        let namespace = vpa
            .metadata
            .namespace
            .as_deref()
            .ok_or_else(|| StoreError::InvalidObject("VPA missing namespace".to_string()))?;
        self.vpa_api(namespace)
            .create(&PostParams::default(), vpa)
            .await
            .map_err(|e| StoreError::from_collection_request(e, VPA_KIND))
    }

    async fn delete_vpa(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        self.vpa_api(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map(|_| ())
            .map_err(StoreError::from_object_request)
    }
}
