//! In-memory ExternalIPRequest registry
//!
//! Implements [`ExternalIPRequestRegistry`] without a backing store so the
//! adapter can be exercised in unit tests and dry runs. It keeps every call it
//! receives and can be told to fail the next call of a given kind.

use crate::predicate;
use crds::{ExternalIPRequest, ExternalIPRequestList};
use futures::stream::{self, StreamExt};
use registry::{
    ExternalIPRequestRegistry, RegistryError, RequestContext, RequestFilter, Selector, WatchEvent,
    WatchStream,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

const WATCH_CHANNEL_CAPACITY: usize = 256;

/// Registry operation, used for call recording and error injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `list_external_ip_requests`
    List,
    /// `list_external_ip_requests_predicate`
    ListPredicate,
    /// `watch_external_ip_requests`
    Watch,
    /// `get_external_ip_request`
    Get,
    /// `create_external_ip_request`
    Create,
    /// `update_external_ip_request`
    Update,
    /// `delete_external_ip_request`
    Delete,
}

/// A call received by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCall {
    /// Which operation was called
    pub operation: Operation,
    /// Namespace from the request context
    pub namespace: Option<String>,
    /// Object name, for single-object operations
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
enum Change {
    Added(ExternalIPRequest),
    Modified(ExternalIPRequest),
    Deleted(ExternalIPRequest),
}

impl Change {
    fn object(&self) -> &ExternalIPRequest {
        match self {
            Self::Added(o) | Self::Modified(o) | Self::Deleted(o) => o,
        }
    }

    fn into_event(self) -> WatchEvent {
        match self {
            Self::Added(o) => WatchEvent::Added(o),
            Self::Modified(o) => WatchEvent::Modified(o),
            Self::Deleted(o) => WatchEvent::Deleted(o),
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    // Keyed by (namespace, name) so listings come back in that order
    items: BTreeMap<(String, String), ExternalIPRequest>,
    resource_version: u64,
    history: Vec<(u64, Change)>,
    calls: Vec<RegistryCall>,
    failures: HashMap<Operation, RegistryError>,
}

impl Store {
    fn next_version(&mut self) -> u64 {
        self.resource_version += 1;
        self.resource_version
    }
}

/// In-memory registry.
///
/// Clones share the same store.
#[derive(Debug, Clone)]
pub struct MemoryRegistry {
    store: Arc<Mutex<Store>>,
    changes: broadcast::Sender<Change>,
}

impl Default for MemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            store: Arc::new(Mutex::new(Store::default())),
            changes,
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next call of `operation` fail with `error`
    pub fn fail_next(&self, operation: Operation, error: RegistryError) {
        self.store().failures.insert(operation, error);
    }

    /// Calls received so far, oldest first
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.store().calls.clone()
    }

    /// Forgets recorded calls
    pub fn clear_calls(&self) {
        self.store().calls.clear();
    }

    /// Number of stored requests
    pub fn len(&self) -> usize {
        self.store().items.len()
    }

    /// Whether the registry holds no requests
    pub fn is_empty(&self) -> bool {
        self.store().items.is_empty()
    }

    /// Current resource version of the store
    pub fn resource_version(&self) -> u64 {
        self.store().resource_version
    }

    /// Stores `request` directly, bypassing call recording (for test setup)
    pub fn insert(&self, request: ExternalIPRequest) {
        let mut store = self.store();
        let version = store.next_version();
        let mut request = request;
        request.metadata.resource_version = Some(version.to_string());
        let key = (
            request.metadata.namespace.clone().unwrap_or_default(),
            request.metadata.name.clone().unwrap_or_default(),
        );
        store.items.insert(key, request.clone());
        self.publish(&mut store, version, Change::Added(request));
    }

    /// Logs the call and returns any error injected for it.
    fn record(
        store: &mut Store,
        operation: Operation,
        ctx: &RequestContext,
        name: Option<&str>,
    ) -> Result<(), RegistryError> {
        store.calls.push(RegistryCall {
            operation,
            namespace: ctx.namespace().map(str::to_string),
            name: name.map(str::to_string),
        });
        match store.failures.remove(&operation) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    // Called with the store locked so watchers subscribing under the same
    // lock see every change exactly once.
    fn publish(&self, store: &mut Store, version: u64, change: Change) {
        store.history.push((version, change.clone()));
        // No receivers just means nobody is watching
        let _ = self.changes.send(change);
    }

    fn list_matching(&self, ctx: &RequestContext, keep: impl Fn(&ExternalIPRequest) -> bool) -> ExternalIPRequestList {
        let store = self.store();
        Self::collect_matching(&store, ctx, keep)
    }

    fn collect_matching(
        store: &Store,
        ctx: &RequestContext,
        keep: impl Fn(&ExternalIPRequest) -> bool,
    ) -> ExternalIPRequestList {
        let items = store
            .items
            .iter()
            .filter(|((ns, _), _)| ctx.namespace().is_none_or(|want| want == ns.as_str()))
            .map(|(_, request)| request)
            .filter(|request| keep(*request))
            .cloned()
            .collect();
        let mut list = ExternalIPRequestList::from_items(items);
        list.metadata.resource_version = Some(store.resource_version.to_string());
        list
    }
}

fn namespace_required(ctx: &RequestContext) -> Result<String, RegistryError> {
    ctx.namespace()
        .map(str::to_string)
        .ok_or_else(|| RegistryError::InvalidRequest("namespace parameter required".to_string()))
}

fn name_required(request: &ExternalIPRequest) -> Result<String, RegistryError> {
    request
        .metadata
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RegistryError::InvalidRequest("name is required".to_string()))
}

fn parse_resource_version(resource_version: &str) -> Result<Option<u64>, RegistryError> {
    if resource_version.is_empty() {
        return Ok(None);
    }
    resource_version
        .parse()
        .map(Some)
        .map_err(|_| RegistryError::InvalidRequest(format!("invalid resource version {:?}", resource_version)))
}

#[async_trait::async_trait]
impl ExternalIPRequestRegistry for MemoryRegistry {
    async fn list_external_ip_requests(
        &self,
        ctx: &RequestContext,
        selector: &Selector,
    ) -> Result<ExternalIPRequestList, RegistryError> {
        Self::record(&mut self.store(), Operation::List, ctx, None)?;
        Ok(self.list_matching(ctx, |request| {
            predicate::matches(selector, &Selector::everything(), request)
        }))
    }

    async fn list_external_ip_requests_predicate(
        &self,
        ctx: &RequestContext,
        filter: &RequestFilter<'_>,
    ) -> Result<ExternalIPRequestList, RegistryError> {
        Self::record(&mut self.store(), Operation::ListPredicate, ctx, None)?;
        Ok(self.list_matching(ctx, filter))
    }

    async fn watch_external_ip_requests(
        &self,
        ctx: &RequestContext,
        label: &Selector,
        field: &Selector,
        resource_version: &str,
    ) -> Result<WatchStream, RegistryError> {
        let mut store = self.store();
        Self::record(&mut store, Operation::Watch, ctx, None)?;
        let since = parse_resource_version(resource_version)?;

        let backlog: Vec<Change> = match since {
            Some(since) => store
                .history
                .iter()
                .filter(|(version, _)| *version > since)
                .map(|(_, change)| change.clone())
                .collect(),
            None => Vec::new(),
        };
        let receiver = self.changes.subscribe();
        drop(store);

        debug!(
            "Watch started in {:?} with {} replayed events",
            ctx.namespace_or_all(),
            backlog.len()
        );

        let namespace = ctx.namespace().map(str::to_string);
        let label = label.clone();
        let field = field.clone();
        let accept = move |change: &Change| {
            let object = change.object();
            namespace
                .as_deref()
                .is_none_or(|ns| object.metadata.namespace.as_deref() == Some(ns))
                && predicate::matches(&label, &field, object)
        };

        let live = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(change) => Some((Ok(change), receiver)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => Some((
                    Err(RegistryError::Watch(format!("watcher fell behind by {} events", skipped))),
                    receiver,
                )),
                Err(broadcast::error::RecvError::Closed) => None,
            }
        });

        Ok(stream::iter(backlog.into_iter().map(Ok))
            .chain(live)
            .filter(move |item| {
                let keep = match item {
                    Ok(change) => accept(change),
                    Err(_) => true,
                };
                futures::future::ready(keep)
            })
            .map(|item| item.map(Change::into_event))
            .boxed())
    }

    async fn get_external_ip_request(
        &self,
        ctx: &RequestContext,
        name: &str,
    ) -> Result<Option<ExternalIPRequest>, RegistryError> {
        let mut store = self.store();
        Self::record(&mut store, Operation::Get, ctx, Some(name))?;
        let namespace = namespace_required(ctx)?;
        Ok(store.items.get(&(namespace, name.to_string())).cloned())
    }

    async fn create_external_ip_request(
        &self,
        ctx: &RequestContext,
        request: &ExternalIPRequest,
    ) -> Result<(), RegistryError> {
        let mut store = self.store();
        Self::record(&mut store, Operation::Create, ctx, request.metadata.name.as_deref())?;
        let namespace = namespace_required(ctx)?;
        let name = name_required(request)?;

        let key = (namespace.clone(), name.clone());
        if store.items.contains_key(&key) {
            return Err(RegistryError::AlreadyExists(name));
        }

        let version = store.next_version();
        let mut stored = request.clone();
        stored.metadata.namespace = Some(namespace);
        stored.metadata.resource_version = Some(version.to_string());
        store.items.insert(key, stored.clone());
        self.publish(&mut store, version, Change::Added(stored));
        Ok(())
    }

    async fn update_external_ip_request(
        &self,
        ctx: &RequestContext,
        request: &ExternalIPRequest,
    ) -> Result<(), RegistryError> {
        let mut store = self.store();
        Self::record(&mut store, Operation::Update, ctx, request.metadata.name.as_deref())?;
        let namespace = namespace_required(ctx)?;
        let name = name_required(request)?;

        let key = (namespace.clone(), name.clone());
        let Some(existing) = store.items.get(&key) else {
            return Err(RegistryError::NotFound(name));
        };

        let current = existing.metadata.resource_version.clone().unwrap_or_default();
        if let Some(expected) = request.metadata.resource_version.as_deref().filter(|v| !v.is_empty()) {
            if expected != current {
                return Err(RegistryError::Conflict {
                    name,
                    message: format!(
                        "resource version {} does not match stored version {}",
                        expected, current
                    ),
                });
            }
        }

        let mut stored = request.clone();
        stored.metadata.uid = existing.metadata.uid.clone();
        stored.metadata.creation_timestamp = existing.metadata.creation_timestamp.clone();
        stored.metadata.namespace = Some(namespace);
        let version = store.next_version();
        stored.metadata.resource_version = Some(version.to_string());
        store.items.insert(key, stored.clone());
        self.publish(&mut store, version, Change::Modified(stored));
        Ok(())
    }

    async fn delete_external_ip_request(&self, ctx: &RequestContext, name: &str) -> Result<(), RegistryError> {
        let mut store = self.store();
        Self::record(&mut store, Operation::Delete, ctx, Some(name))?;
        let namespace = namespace_required(ctx)?;

        let Some(mut removed) = store.items.remove(&(namespace, name.to_string())) else {
            return Err(RegistryError::NotFound(name.to_string()));
        };
        let version = store.next_version();
        removed.metadata.resource_version = Some(version.to_string());
        self.publish(&mut store, version, Change::Deleted(removed));
        Ok(())
    }
}
