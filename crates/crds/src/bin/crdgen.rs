//! Prints the VerticalPodAutoscaler CRD as YAML.
//!
//! Production clusters get the CRD from the upstream VPA installation; this
//! output is for test clusters that only need the API to exist.

use crds::VerticalPodAutoscaler;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&VerticalPodAutoscaler::crd())?);
    Ok(())
}
