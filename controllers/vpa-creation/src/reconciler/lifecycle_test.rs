//! Unit tests for the advisory VPA lifecycle

#[cfg(test)]
mod tests {
    use crate::reconciler::lifecycle::*;
    use crate::test_utils::*;
    use crds::{PodUpdatePolicy, TargetReference, UpdateMode};
    use kube_store::{MockKubeStore, StoreError, WorkloadKind};

    #[test]
    fn test_build_advisory_shape() {
        let workload = create_enabled_workload(WorkloadKind::StatefulSet, "data", "db");
        let vpa = build_advisory(&workload);

        assert_eq!(vpa.metadata.name.as_deref(), Some("db-vpa"));
        assert_eq!(vpa.metadata.namespace.as_deref(), Some("data"));
        assert_eq!(
            vpa.metadata
                .labels
                .as_ref()
                .and_then(|labels| labels.get(MANAGED_BY_LABEL))
                .map(String::as_str),
            Some(MANAGED_BY_VALUE)
        );

        let target = &vpa.spec.target_ref;
        assert_eq!(target.api_version.as_deref(), Some("apps/v1"));
        assert_eq!(target.kind, "StatefulSet");
        assert_eq!(target.name, "db");
        assert_eq!(vpa.update_mode(), Some(UpdateMode::Off));

        let owners = vpa.metadata.owner_references.as_ref().unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "StatefulSet");
        assert_eq!(owners[0].name, "db");
        assert_eq!(owners[0].uid, workload.uid);
        assert_eq!(owners[0].controller, Some(true));
    }

    #[test]
    fn test_build_advisory_is_deterministic() {
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");
        assert_eq!(
            serde_json::to_value(build_advisory(&workload)).unwrap(),
            serde_json::to_value(build_advisory(&workload)).unwrap()
        );
    }

    #[tokio::test]
    async fn test_ensure_creates_when_absent() {
        let store = MockKubeStore::new();
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");

        let outcome = ensure_advisory(&store, &metrics, &workload).await.unwrap();

        assert_eq!(outcome, LifecycleOutcome::Created);
        assert!(store.vpa("default", "web-vpa").is_some());
        assert_eq!(metrics.created(), vec![(WorkloadKind::Deployment, "default".to_string())]);
    }

    #[tokio::test]
    async fn test_ensure_leaves_existing_vpa_untouched() {
        let store = MockKubeStore::new();
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");
        // Hand-made VPA with different content: it is not reconciled back
        store.add_vpa(create_test_vpa("default", "web-vpa", None));

        let outcome = ensure_advisory(&store, &metrics, &workload).await.unwrap();

        assert_eq!(outcome, LifecycleOutcome::Present);
        assert_eq!(store.create_calls(), 0);
        assert!(store.vpa("default", "web-vpa").unwrap().has_no_owners());
        assert!(metrics.created().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_race_counts_as_success() {
        let store = MockKubeStore::new();
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::DaemonSet, "kube-system", "agent");
        store.race_next_create();

        let outcome = ensure_advisory(&store, &metrics, &workload).await.unwrap();

        assert_eq!(outcome, LifecycleOutcome::CreatedConcurrently);
        assert_eq!(store.vpas().len(), 1);
        assert!(metrics.created().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_reports_missing_kind() {
        let store = MockKubeStore::new();
        store.set_vpa_kind_registered(false);
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");

        let outcome = ensure_advisory(&store, &metrics, &workload).await.unwrap();

        assert_eq!(outcome, LifecycleOutcome::KindNotRegistered);
        assert!(metrics.created().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_get_error_skips_create() {
        let store = MockKubeStore::new();
        store.fail_vpa_gets(500);
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");

        let err = ensure_advisory(&store, &metrics, &workload).await.unwrap_err();

        assert!(matches!(err, StoreError::Api { code: 500, .. }));
        assert_eq!(store.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_create_error_propagates() {
        let store = MockKubeStore::new();
        store.fail_vpa_creates(403);
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");

        let err = ensure_advisory(&store, &metrics, &workload).await.unwrap_err();

        assert!(matches!(err, StoreError::Api { code: 403, .. }));
        assert!(store.vpas().is_empty());
        assert!(metrics.created().is_empty());
    }

    #[test]
    fn test_drift_none_for_own_advisory() {
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");
        assert!(drift(&build_advisory(&workload), &workload).is_empty());
    }

    #[test]
    fn test_drift_reports_foreign_target_and_mode() {
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");

        let mut vpa = build_advisory(&workload);
        vpa.spec.target_ref = TargetReference::new("apps/v1", "StatefulSet", "web");
        vpa.spec.update_policy = Some(PodUpdatePolicy {
            update_mode: Some(UpdateMode::Auto),
            ..Default::default()
        });
        assert_eq!(
            drift(&vpa, &workload),
            vec![
                Drift::OtherTarget {
                    kind: WorkloadKind::StatefulSet,
                    name: "web".to_string()
                },
                Drift::NotAdvisory(Some(UpdateMode::Auto)),
            ]
        );

        vpa.spec.target_ref = TargetReference::new("batch/v1", "CronJob", "web");
        vpa.spec.update_policy = None;
        assert_eq!(
            drift(&vpa, &workload),
            vec![
                Drift::UnsupportedTarget {
                    kind: "CronJob".to_string(),
                    name: "web".to_string()
                },
                Drift::NotAdvisory(None),
            ]
        );
    }

    #[tokio::test]
    async fn test_ensure_reports_drift_without_modifying() {
        let store = MockKubeStore::new();
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "default", "web");
        let mut existing = build_advisory(&workload);
        existing.spec.update_policy = Some(PodUpdatePolicy {
            update_mode: Some(UpdateMode::Recreate),
            ..Default::default()
        });
        store.add_vpa(existing.clone());

        let outcome = ensure_advisory(&store, &metrics, &workload).await.unwrap();

        assert_eq!(outcome, LifecycleOutcome::Present);
        assert_eq!(store.create_calls(), 0);
        assert_eq!(
            serde_json::to_value(store.vpa("default", "web-vpa").unwrap()).unwrap(),
            serde_json::to_value(&existing).unwrap()
        );
    }

    #[tokio::test]
    async fn test_ensure_create_not_found_propagates() {
        // e.g. the namespace was deleted between the get and the create
        let store = MockKubeStore::new();
        store.fail_vpa_creates(404);
        let metrics = RecordingMetrics::default();
        let workload = create_enabled_workload(WorkloadKind::Deployment, "gone", "web");

        let err = ensure_advisory(&store, &metrics, &workload).await.unwrap_err();

        assert!(err.is_not_found());
        assert!(!err.is_kind_not_registered());
        assert!(metrics.created().is_empty());
    }
}
