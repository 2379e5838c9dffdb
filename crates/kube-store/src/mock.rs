//! Mock KubeStore for unit testing
//!
//! In-memory implementation of `KubeStoreTrait` that behaves like the API
//! server for the operations the controller uses: name conflicts on create,
//! not-found on get/delete and a missing VPA kind when the CRD is "uninstalled".
//! Faults can be injected per operation to exercise error paths.

use crate::error::StoreError;
use crate::models::{Workload, WorkloadKind};
use crate::store_trait::KubeStoreTrait;
use crds::VerticalPodAutoscaler;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

type ObjectKey = (String, String);

fn key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

/// Injected failure, classified the way the real store classifies status codes
fn transient(code: u16, operation: &str) -> StoreError {
    let message = format!("injected failure on {}", operation);
    match code {
        404 => StoreError::NotFound(message),
        409 => StoreError::AlreadyExists(message),
        _ => StoreError::Api { code, message },
    }
}

/// Injected failures, as HTTP status codes
#[derive(Default)]
struct Faults {
    workload_get: HashMap<WorkloadKind, u16>,
    vpa_get: Option<u16>,
    vpa_list: Option<u16>,
    vpa_create: Option<u16>,
    vpa_delete: HashMap<ObjectKey, u16>,
    /// Another writer creates the VPA between our get and our create
    race_next_create: bool,
}

/// Mock KubeStore for testing
#[derive(Clone)]
pub struct MockKubeStore {
    workloads: Arc<Mutex<HashMap<(WorkloadKind, String, String), Workload>>>,
    vpas: Arc<Mutex<BTreeMap<ObjectKey, VerticalPodAutoscaler>>>,
    vpa_kind_registered: Arc<Mutex<bool>>,
    faults: Arc<Mutex<Faults>>,
    create_calls: Arc<Mutex<usize>>,
    deleted: Arc<Mutex<HashSet<ObjectKey>>>,
    next_uid: Arc<Mutex<u64>>,
}

impl Default for MockKubeStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockKubeStore {
    /// Create an empty mock store with the VPA kind registered
    pub fn new() -> Self {
        Self {
            workloads: Arc::new(Mutex::new(HashMap::new())),
            vpas: Arc::new(Mutex::new(BTreeMap::new())),
            vpa_kind_registered: Arc::new(Mutex::new(true)),
            faults: Arc::new(Mutex::new(Faults::default())),
            create_calls: Arc::new(Mutex::new(0)),
            deleted: Arc::new(Mutex::new(HashSet::new())),
            next_uid: Arc::new(Mutex::new(1)),
        }
    }

    /// Add a workload to the mock store (for test setup)
    pub fn add_workload(&self, workload: Workload) {
        lock(&self.workloads).insert(
            (workload.kind, workload.namespace.clone(), workload.name.clone()),
            workload,
        );
    }

    /// Remove a workload, as if it had been deleted
    pub fn remove_workload(&self, kind: WorkloadKind, namespace: &str, name: &str) {
        lock(&self.workloads).remove(&(kind, namespace.to_string(), name.to_string()));
    }

    /// Add a VPA to the mock store (for test setup)
    pub fn add_vpa(&self, vpa: VerticalPodAutoscaler) {
        let namespace = vpa.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
        let name = vpa.metadata.name.clone().unwrap_or_default();
        lock(&self.vpas).insert((namespace, name), vpa);
    }

    /// Look up a VPA directly, bypassing injected faults
    pub fn vpa(&self, namespace: &str, name: &str) -> Option<VerticalPodAutoscaler> {
        lock(&self.vpas).get(&key(namespace, name)).cloned()
    }

    /// All stored VPAs, ordered by namespace and name
    pub fn vpas(&self) -> Vec<VerticalPodAutoscaler> {
        lock(&self.vpas).values().cloned().collect()
    }

    /// Number of `create_vpa` calls received, successful or not
    pub fn create_calls(&self) -> usize {
        *lock(&self.create_calls)
    }

    /// Whether `delete_vpa` removed the given VPA
    pub fn was_deleted(&self, namespace: &str, name: &str) -> bool {
        lock(&self.deleted).contains(&key(namespace, name))
    }

    /// Simulate installing or removing the VPA CRD
    pub fn set_vpa_kind_registered(&self, registered: bool) {
        *lock(&self.vpa_kind_registered) = registered;
    }

    /// Fail every get of the given workload kind with `code`
    pub fn fail_workload_gets(&self, kind: WorkloadKind, code: u16) {
        lock(&self.faults).workload_get.insert(kind, code);
    }

    /// Fail every VPA get with `code`
    pub fn fail_vpa_gets(&self, code: u16) {
        lock(&self.faults).vpa_get = Some(code);
    }

    /// Fail every VPA list with `code`
    pub fn fail_vpa_lists(&self, code: u16) {
        lock(&self.faults).vpa_list = Some(code);
    }

    /// Fail every VPA create with `code`
    pub fn fail_vpa_creates(&self, code: u16) {
        lock(&self.faults).vpa_create = Some(code);
    }

    /// Fail deletes of one VPA with `code`
    pub fn fail_vpa_delete(&self, namespace: &str, name: &str, code: u16) {
        lock(&self.faults).vpa_delete.insert(key(namespace, name), code);
    }

    /// Make the next create lose a race: the object appears just before our
    /// request lands, so the create reports a conflict.
    pub fn race_next_create(&self) {
        lock(&self.faults).race_next_create = true;
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        *lock(&self.faults) = Faults::default();
    }

    fn next_uid(&self) -> String {
        let mut id = lock(&self.next_uid);
        let current = *id;
        *id += 1;
        format!("mock-uid-{}", current)
    }

    fn ensure_vpa_kind(&self) -> Result<(), StoreError> {
        if *lock(&self.vpa_kind_registered) {
            Ok(())
        } else {
            Err(StoreError::KindNotRegistered("VerticalPodAutoscaler".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl KubeStoreTrait for MockKubeStore {
    async fn get_workload(&self, kind: WorkloadKind, namespace: &str, name: &str) -> Result<Workload, StoreError> {
        if let Some(code) = lock(&self.faults).workload_get.get(&kind) {
            return Err(transient(*code, "get_workload"));
        }
        lock(&self.workloads)
            .get(&(kind, namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}/{}", kind, namespace, name)))
    }

    async fn get_vpa(&self, namespace: &str, name: &str) -> Result<VerticalPodAutoscaler, StoreError> {
        if let Some(code) = lock(&self.faults).vpa_get {
            return Err(transient(code, "get_vpa"));
        }
        // The API server answers 404 for a missing CRD on named gets too
        if !*lock(&self.vpa_kind_registered) {
            return Err(StoreError::NotFound(format!("VerticalPodAutoscaler {}/{}", namespace, name)));
        }
        self.vpa(namespace, name)
            .ok_or_else(|| StoreError::NotFound(format!("VerticalPodAutoscaler {}/{}", namespace, name)))
    }

    async fn list_vpas(&self, namespace: Option<&str>) -> Result<Vec<VerticalPodAutoscaler>, StoreError> {
        if let Some(code) = lock(&self.faults).vpa_list {
            return Err(transient(code, "list_vpas"));
        }
        self.ensure_vpa_kind()?;
        Ok(lock(&self.vpas)
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|wanted| wanted == ns.as_str()))
            .map(|(_, vpa)| vpa.clone())
            .collect())
    }

    async fn create_vpa(&self, vpa: &VerticalPodAutoscaler) -> Result<VerticalPodAutoscaler, StoreError> {
        *lock(&self.create_calls) += 1;
        let race = {
            let mut faults = lock(&self.faults);
            if let Some(code) = faults.vpa_create {
                return Err(transient(code, "create_vpa"));
            }
            std::mem::take(&mut faults.race_next_create)
        };
        self.ensure_vpa_kind()?;

        let namespace = vpa
            .metadata
            .namespace
            .clone()
            .ok_or_else(|| StoreError::InvalidObject("VPA missing namespace".to_string()))?;
        let name = vpa
            .metadata
            .name
            .clone()
            .ok_or_else(|| StoreError::InvalidObject("VPA missing name".to_string()))?;

        let mut created = vpa.clone();
        created.metadata.uid = Some(self.next_uid());
        created.metadata.resource_version = Some("1".to_string());

        let mut vpas = lock(&self.vpas);
        if race {
            vpas.insert((namespace.clone(), name.clone()), created);
            return Err(StoreError::AlreadyExists(format!("VerticalPodAutoscaler {}/{}", namespace, name)));
        }
        if vpas.contains_key(&(namespace.clone(), name.clone())) {
            return Err(StoreError::AlreadyExists(format!("VerticalPodAutoscaler {}/{}", namespace, name)));
        }
        vpas.insert((namespace, name), created.clone());
        Ok(created)
    }

    async fn delete_vpa(&self, namespace: &str, name: &str) -> Result<(), StoreError> {
        if let Some(code) = lock(&self.faults).vpa_delete.get(&key(namespace, name)) {
            return Err(transient(*code, "delete_vpa"));
        }
        match lock(&self.vpas).remove(&key(namespace, name)) {
            Some(_) => {
                lock(&self.deleted).insert(key(namespace, name));
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("VerticalPodAutoscaler {}/{}", namespace, name))),
        }
    }
}
