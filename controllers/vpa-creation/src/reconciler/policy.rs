//! Opt-in annotation policy.

use std::collections::BTreeMap;

/// Annotation that opts a workload into VPA management
pub const VPA_ENABLED_ANNOTATION: &str = "k8s.autoscaling.vpacreation/vpa-enabled";

/// The only value that enables management
pub const ENABLED_VALUE: &str = "true";

/// Whether a workload with these annotations is opted in.
///
/// Exact match only: no trimming, no case folding, no other truthy values.
pub fn is_enabled(annotations: &BTreeMap<String, String>) -> bool {
    annotations
        .get(VPA_ENABLED_ANNOTATION)
        .is_some_and(|value| value == ENABLED_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(value: Option<&str>) -> BTreeMap<String, String> {
        let mut map = BTreeMap::from([("unrelated".to_string(), "true".to_string())]);
        if let Some(value) = value {
            map.insert(VPA_ENABLED_ANNOTATION.to_string(), value.to_string());
        }
        map
    }

    #[test]
    fn test_enabled_only_for_exact_true() {
        assert!(is_enabled(&annotations(Some("true"))));
    }

    #[test]
    fn test_absent_key_is_disabled() {
        assert!(!is_enabled(&annotations(None)));
        assert!(!is_enabled(&BTreeMap::new()));
    }

    #[test]
    fn test_other_values_are_disabled() {
        for value in ["True", "TRUE", " true", "true ", "1", "yes", "on", "", "false"] {
            assert!(!is_enabled(&annotations(Some(value))), "'{}' must not enable", value);
        }
    }

    #[test]
    fn test_similar_keys_are_ignored() {
        let map = BTreeMap::from([
            ("k8s.autoscaling.vpacreation/vpa-enabled ".to_string(), "true".to_string()),
            ("K8s.autoscaling.vpacreation/vpa-enabled".to_string(), "true".to_string()),
            ("vpa-enabled".to_string(), "true".to_string()),
        ]);
        assert!(!is_enabled(&map));
    }
}
