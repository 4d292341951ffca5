//! Request context carried through every registry and REST call.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

/// Namespace used when none is specified by the user.
pub const NAMESPACE_DEFAULT: &str = "default";

/// Namespace value meaning "all namespaces" for list and watch.
pub const NAMESPACE_ALL: &str = "";

/// Per-request context.
///
/// Only the namespace is carried today; it may be absent, in which case
/// mutating calls are rejected and list/watch span all namespaces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    namespace: Option<String>,
}

impl RequestContext {
    /// Context without a namespace
    pub fn new() -> Self {
        Self::default()
    }

    /// Context scoped to `namespace`
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
        }
    }

    /// The namespace this request is scoped to, if any
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Namespace for list/watch scoping, `NAMESPACE_ALL` when absent
    pub fn namespace_or_all(&self) -> &str {
        self.namespace().unwrap_or(NAMESPACE_ALL)
    }
}

/// Checks that an object's namespace agrees with the request context.
///
/// An object without a namespace adopts the one from the context. Returns
/// false when the context has no namespace or the two differ.
pub fn valid_namespace(ctx: &RequestContext, meta: &mut ObjectMeta) -> bool {
    let Some(ns) = ctx.namespace() else {
        return false;
    };

    if meta.namespace.as_deref().is_none_or(str::is_empty) {
        meta.namespace = Some(ns.to_string());
    }

    meta.namespace.as_deref() == Some(ns)
}
