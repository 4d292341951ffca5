//! REST storage for ExternalIPRequest objects.
//!
//! `ExternalIPRequestRest` is stateless: it validates and defaults incoming
//! objects, then issues one or two registry calls per request. Mutations are
//! dispatched with [`make_async`]; reads are awaited inline.

use crate::async_result::{make_async, RestResult};
use crate::error::ApiError;
use crate::meta::{ObjectMetaFiller, SystemFields};
use crate::predicate;
use crate::status;
use crds::{ExternalIPRequest, ExternalIPRequestList};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;
use registry::{valid_namespace, ExternalIPRequestRegistry, RequestContext, Selector, WatchStream};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Resource name used in errors
pub const RESOURCE: &str = "externaliprequest";

/// Storage operations the API layer dispatches decoded requests to.
#[async_trait::async_trait]
pub trait RestStorage: Send + Sync {
    /// Object type served by this storage
    type Object: Send;
    /// Collection type returned by list
    type List: Send;

    /// Empty object for the decoder to fill
    fn new_object(&self) -> Self::Object;

    /// Empty collection for the decoder to fill
    fn new_list(&self) -> Self::List;

    /// Gets an object by name; `Ok(None)` when it does not exist.
    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Option<Self::Object>, ApiError>;

    /// Lists objects matching both selectors.
    async fn list(&self, ctx: &RequestContext, label: &Selector, field: &Selector) -> Result<Self::List, ApiError>;

    /// Validates `object` and dispatches its creation.
    fn create(&self, ctx: &RequestContext, object: Self::Object) -> Result<RestResult<Self::Object>, ApiError>;

    /// Validates `object` and dispatches its update.
    fn update(&self, ctx: &RequestContext, object: Self::Object) -> Result<RestResult<Self::Object>, ApiError>;

    /// Dispatches deletion of `name`.
    fn delete(&self, ctx: &RequestContext, name: &str) -> RestResult<Status>;
}

/// Storage that can stream changes.
#[async_trait::async_trait]
pub trait ResourceWatcher: Send + Sync {
    /// Starts a watch; the stream lives until the caller drops it.
    async fn watch(
        &self,
        ctx: &RequestContext,
        label: &Selector,
        field: &Selector,
        resource_version: &str,
    ) -> Result<WatchStream, ApiError>;
}

/// REST adapter for ExternalIPRequests.
#[derive(Clone)]
pub struct ExternalIPRequestRest {
    registry: Arc<dyn ExternalIPRequestRegistry>,
    meta_filler: Arc<dyn ObjectMetaFiller>,
}

impl ExternalIPRequestRest {
    /// Creates an adapter over `registry` using [`SystemFields`] for system metadata.
    pub fn new(registry: Arc<dyn ExternalIPRequestRegistry>) -> Self {
        Self::with_meta_filler(registry, Arc::new(SystemFields))
    }

    /// Creates an adapter with a custom system-metadata filler.
    pub fn with_meta_filler(
        registry: Arc<dyn ExternalIPRequestRegistry>,
        meta_filler: Arc<dyn ObjectMetaFiller>,
    ) -> Self {
        Self {
            registry,
            meta_filler,
        }
    }
}

impl fmt::Debug for ExternalIPRequestRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalIPRequestRest")
            .field("meta_filler", &self.meta_filler)
            .finish_non_exhaustive()
    }
}

fn namespace_conflict(request: &ExternalIPRequest) -> ApiError {
    ApiError::conflict(
        RESOURCE,
        request.metadata.namespace.clone().unwrap_or_default(),
        "ExternalIPRequest.Namespace does not match the provided context",
    )
}

/// Reads the object back after a write so callers see what was stored.
async fn read_back(
    registry: &dyn ExternalIPRequestRegistry,
    ctx: &RequestContext,
    name: &str,
) -> Result<ExternalIPRequest, ApiError> {
    registry
        .get_external_ip_request(ctx, name)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            kind: RESOURCE,
            name: name.to_string(),
        })
}

#[async_trait::async_trait]
impl RestStorage for ExternalIPRequestRest {
    type Object = ExternalIPRequest;
    type List = ExternalIPRequestList;

    fn new_object(&self) -> ExternalIPRequest {
        ExternalIPRequest::default()
    }

    fn new_list(&self) -> ExternalIPRequestList {
        ExternalIPRequestList::default()
    }

    async fn get(&self, ctx: &RequestContext, name: &str) -> Result<Option<ExternalIPRequest>, ApiError> {
        let request = self.registry.get_external_ip_request(ctx, name).await?;
        if request.is_none() {
            debug!("ExternalIPRequest {}/{} not found", ctx.namespace_or_all(), name);
        }
        Ok(request)
    }

    async fn list(
        &self,
        ctx: &RequestContext,
        label: &Selector,
        field: &Selector,
    ) -> Result<ExternalIPRequestList, ApiError> {
        debug!(
            "Listing ExternalIPRequests in {:?} (labels: {:?}, fields: {:?})",
            ctx.namespace_or_all(),
            label.to_string(),
            field.to_string()
        );
        let filter = predicate::filter_func(label, field);
        Ok(self
            .registry
            .list_external_ip_requests_predicate(ctx, &filter)
            .await?)
    }

    fn create(
        &self,
        ctx: &RequestContext,
        mut request: ExternalIPRequest,
    ) -> Result<RestResult<ExternalIPRequest>, ApiError> {
        if !valid_namespace(ctx, &mut request.metadata) {
            warn!(
                "Rejecting ExternalIPRequest create: namespace {:?} does not match context {:?}",
                request.metadata.namespace,
                ctx.namespace()
            );
            return Err(namespace_conflict(&request));
        }

        self.meta_filler.fill(ctx, &mut request.metadata);
        if request.metadata.name.as_deref().is_none_or(str::is_empty) {
            // Placeholder until generated names are supported: the UID doubles as the name
            request.metadata.name = request.metadata.uid.clone();
        }

        let name = request.metadata.name.clone().unwrap_or_default();
        info!("Creating ExternalIPRequest {}/{}", ctx.namespace_or_all(), name);

        let registry = Arc::clone(&self.registry);
        let ctx = ctx.clone();
        Ok(make_async(async move {
            registry.create_external_ip_request(&ctx, &request).await?;
            read_back(registry.as_ref(), &ctx, &name).await
        }))
    }

    fn update(
        &self,
        ctx: &RequestContext,
        mut request: ExternalIPRequest,
    ) -> Result<RestResult<ExternalIPRequest>, ApiError> {
        if !valid_namespace(ctx, &mut request.metadata) {
            warn!(
                "Rejecting ExternalIPRequest update: namespace {:?} does not match context {:?}",
                request.metadata.namespace,
                ctx.namespace()
            );
            return Err(namespace_conflict(&request));
        }

        let name = request.metadata.name.clone().unwrap_or_default();
        info!("Updating ExternalIPRequest {}/{}", ctx.namespace_or_all(), name);

        let registry = Arc::clone(&self.registry);
        let ctx = ctx.clone();
        Ok(make_async(async move {
            registry.update_external_ip_request(&ctx, &request).await?;
            read_back(registry.as_ref(), &ctx, &name).await
        }))
    }

    fn delete(&self, ctx: &RequestContext, name: &str) -> RestResult<Status> {
        let registry = Arc::clone(&self.registry);
        let ctx = ctx.clone();
        let name = name.to_string();
        make_async(async move {
            // No namespace is a failed delete, not an error
            if ctx.namespace().is_none() {
                warn!("Not deleting ExternalIPRequest {}: no namespace in context", name);
                return Ok(status::failure());
            }

            info!("Deleting ExternalIPRequest {}/{}", ctx.namespace_or_all(), name);
            registry.delete_external_ip_request(&ctx, &name).await?;
            Ok(status::success())
        })
    }
}

#[async_trait::async_trait]
impl ResourceWatcher for ExternalIPRequestRest {
    async fn watch(
        &self,
        ctx: &RequestContext,
        label: &Selector,
        field: &Selector,
        resource_version: &str,
    ) -> Result<WatchStream, ApiError> {
        debug!(
            "Watching ExternalIPRequests in {:?} from version {:?}",
            ctx.namespace_or_all(),
            resource_version
        );
        Ok(self
            .registry
            .watch_external_ip_requests(ctx, label, field, resource_version)
            .await?)
    }
}
