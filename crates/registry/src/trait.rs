//! ExternalIPRequestRegistry trait
//!
//! The storage contract the REST adapter is written against. Concrete stores
//! implement this trait; tests use an in-memory implementation.

use crate::context::RequestContext;
use crate::error::RegistryError;
use crate::labels::Selector;
use crate::watch::WatchStream;
use crds::{ExternalIPRequest, ExternalIPRequestList};

/// Predicate applied by `list_external_ip_requests_predicate`.
pub type RequestFilter<'a> = dyn Fn(&ExternalIPRequest) -> bool + Send + Sync + 'a;

/// Knows how to store ExternalIPRequest objects.
///
/// The registry owns durability, ordering and versioning. All async methods
/// must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait ExternalIPRequestRegistry: Send + Sync {
    /// Lists requests whose labels match `selector`.
    async fn list_external_ip_requests(
        &self,
        ctx: &RequestContext,
        selector: &Selector,
    ) -> Result<ExternalIPRequestList, RegistryError>;

    /// Lists requests for which `filter` returns true.
    async fn list_external_ip_requests_predicate(
        &self,
        ctx: &RequestContext,
        filter: &RequestFilter<'_>,
    ) -> Result<ExternalIPRequestList, RegistryError>;

    /// Watches for new, changed or deleted requests after `resource_version`.
    async fn watch_external_ip_requests(
        &self,
        ctx: &RequestContext,
        label: &Selector,
        field: &Selector,
        resource_version: &str,
    ) -> Result<WatchStream, RegistryError>;

    /// Gets a single request. A missing request is `Ok(None)`, not an error.
    async fn get_external_ip_request(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<ExternalIPRequest>, RegistryError>;

    /// Stores a new request.
    async fn create_external_ip_request(
        &self,
        ctx: &RequestContext,
        request: &ExternalIPRequest,
    ) -> Result<(), RegistryError>;

    /// Replaces an existing request.
    async fn update_external_ip_request(
        &self,
        ctx: &RequestContext,
        request: &ExternalIPRequest,
    ) -> Result<(), RegistryError>;

    /// Deletes a request by name.
    async fn delete_external_ip_request(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<(), RegistryError>;
}
