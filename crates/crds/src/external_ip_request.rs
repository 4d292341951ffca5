//! ExternalIPRequest CRD
//!
//! Requests allocation of an externally reachable IP address for a service.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ListMeta;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "dcops.microscaler.io",
    version = "v1alpha1",
    kind = "ExternalIPRequest",
    plural = "externaliprequests",
    shortname = "eipr",
    namespaced,
    status = "ExternalIPRequestStatus",
    derive = "PartialEq",
    derive = "Default"
)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIPRequestSpec {
    /// Service the external IP is requested for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    /// Preferred IP (hint, not guarantee)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_ip: Option<String>,

    /// Ports to expose on the allocated address
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIPRequestStatus {
    /// Allocated external IP address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ip: Option<String>,

    /// Allocation state
    #[serde(default)]
    pub state: RequestState,

    /// Last reconciliation timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<chrono::DateTime<chrono::Utc>>,

    /// Error message if allocation failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// External IP request state
///
/// Serializes as PascalCase ("Allocated", "Failed", etc.) but also accepts
/// lowercase on the way in.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Default)]
#[serde(rename_all = "PascalCase")]
pub enum RequestState {
    /// Waiting for an address
    #[default]
    #[serde(alias = "pending")]
    Pending,

    /// Address allocated
    #[serde(alias = "allocated")]
    Allocated,

    /// Allocation failed
    #[serde(alias = "failed")]
    Failed,
}

/// An ordered collection of ExternalIPRequests as returned by list calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIPRequestList {
    /// Standard list metadata (resource version of the snapshot)
    #[serde(default)]
    pub metadata: ListMeta,

    /// Requests in the order the registry returned them
    #[serde(default)]
    pub items: Vec<ExternalIPRequest>,
}

impl ExternalIPRequestList {
    /// Builds a list from already-filtered items.
    pub fn from_items(items: Vec<ExternalIPRequest>) -> Self {
        Self {
            metadata: ListMeta::default(),
            items,
        }
    }

    /// Number of items in the list
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
