//! Advisory object naming.
//!
//! A VPA is always named `<workload-name>-vpa` and lives in the workload's
//! namespace. Stripping the suffix gives back the workload name exactly.

/// Suffix appended to the workload name
pub const ADVISORY_SUFFIX: &str = "-vpa";

/// Name of the VPA for a workload
pub fn advisory_name(workload_name: &str) -> String {
    format!("{}{}", workload_name, ADVISORY_SUFFIX)
}

/// Workload name encoded in a VPA name, if it follows the naming scheme
pub fn workload_name(advisory_name: &str) -> Option<&str> {
    advisory_name.strip_suffix(ADVISORY_SUFFIX)
}
