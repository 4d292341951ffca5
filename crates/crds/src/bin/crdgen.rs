//! Prints the ExternalIPRequest CustomResourceDefinition as YAML.
//!
//! Usage: `cargo run -p crds --bin crdgen > config/crd/externaliprequest.yaml`

use crds::ExternalIPRequest;
use kube::CustomResourceExt;

fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&ExternalIPRequest::crd())?);
    Ok(())
}
