//! ExternalIPRequest CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the external IP request API.

pub mod external_ip_request;

pub use external_ip_request::*;
