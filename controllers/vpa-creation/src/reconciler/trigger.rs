//! Trigger resolution.
//!
//! A reconcile key carries only a namespace and a name. The kind is found by
//! probing each supported workload kind in `WorkloadKind::PRIORITY` order.

use kube_store::{KubeStoreTrait, StoreError, Workload, WorkloadKind};
use tracing::{debug, error};

/// Resolve a key to the first workload kind that has an object with that name.
///
/// Returns `Ok(None)` when no kind matches: the object was deleted, or it is of
/// a kind this controller does not manage. Any error other than not-found
/// aborts resolution so the key is retried.
pub async fn resolve(
    store: &dyn KubeStoreTrait,
    namespace: &str,
    name: &str,
) -> Result<Option<Workload>, StoreError> {
    for kind in WorkloadKind::PRIORITY {
        match store.get_workload(kind, namespace, name).await {
            Ok(workload) => {
                debug!(kind = %kind, namespace, name, "Resolved reconcile key");
                return Ok(Some(workload));
            }
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                error!(kind = %kind, namespace, name, "Failed to probe workload: {}", e);
                return Err(e);
            }
        }
    }

    debug!(namespace, name, "Reconcile key matches no supported workload");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use kube_store::MockKubeStore;

    #[tokio::test]
    async fn test_resolves_each_kind() {
        let store = MockKubeStore::new();
        store.add_workload(create_test_workload(WorkloadKind::Deployment, "default", "web", None));
        store.add_workload(create_test_workload(WorkloadKind::DaemonSet, "default", "agent", None));
        store.add_workload(create_test_workload(WorkloadKind::StatefulSet, "default", "db", None));

        for (name, kind) in [
            ("web", WorkloadKind::Deployment),
            ("agent", WorkloadKind::DaemonSet),
            ("db", WorkloadKind::StatefulSet),
        ] {
            let workload = resolve(&store, "default", name).await.unwrap().unwrap();
            assert_eq!(workload.kind, kind);
            assert_eq!(workload.name, name);
        }
    }

    #[tokio::test]
    async fn test_priority_order_wins_on_name_clash() {
        let store = MockKubeStore::new();
        store.add_workload(create_test_workload(WorkloadKind::StatefulSet, "default", "shared", None));
        store.add_workload(create_test_workload(WorkloadKind::DaemonSet, "default", "shared", None));

        let workload = resolve(&store, "default", "shared").await.unwrap().unwrap();
        assert_eq!(workload.kind, WorkloadKind::DaemonSet);

        store.add_workload(create_test_workload(WorkloadKind::Deployment, "default", "shared", None));
        let workload = resolve(&store, "default", "shared").await.unwrap().unwrap();
        assert_eq!(workload.kind, WorkloadKind::Deployment);
    }

    #[tokio::test]
    async fn test_no_match_is_not_an_error() {
        let store = MockKubeStore::new();
        store.add_workload(create_test_workload(WorkloadKind::Deployment, "other", "web", None));

        assert!(resolve(&store, "default", "web").await.unwrap().is_none());
        assert!(resolve(&store, "default", "web-vpa").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_probe_error_aborts_resolution() {
        let store = MockKubeStore::new();
        store.add_workload(create_test_workload(WorkloadKind::StatefulSet, "default", "db", None));
        store.fail_workload_gets(WorkloadKind::DaemonSet, 503);

        let err = resolve(&store, "default", "db").await.unwrap_err();
        assert!(matches!(err, StoreError::Api { code: 503, .. }));
    }

    #[tokio::test]
    async fn test_error_after_match_is_not_reached() {
        let store = MockKubeStore::new();
        store.add_workload(create_test_workload(WorkloadKind::Deployment, "default", "web", None));
        store.fail_workload_gets(WorkloadKind::StatefulSet, 500);

        let workload = resolve(&store, "default", "web").await.unwrap().unwrap();
        assert_eq!(workload.kind, WorkloadKind::Deployment);
    }
}
