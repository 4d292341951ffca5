//! ExternalIPRequest dry run
//!
//! Loads ExternalIPRequest manifests and runs them through the REST adapter
//! against an in-memory registry: every manifest is created (validated and
//! defaulted exactly as the API would), then the stored requests are listed
//! with the configured selectors and printed as YAML.

mod error;
mod manifest;

use crate::error::ControllerError;
use apiserver::{ExternalIPRequestRest, MemoryRegistry, ResourceWatcher, RestStorage};
use futures::StreamExt;
use registry::{RequestContext, Selector, WatchEvent, NAMESPACE_DEFAULT};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const WATCH_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting ExternalIPRequest dry run");

    // Load configuration from environment variables
    let manifest_path = env::var("MANIFEST_PATH")
        .map(PathBuf::from)
        .map_err(|_| ControllerError::InvalidConfig(
            "MANIFEST_PATH environment variable is required".to_string()
        ))?;
    let namespace = env::var("WATCH_NAMESPACE")
        .unwrap_or_else(|_| NAMESPACE_DEFAULT.to_string());
    let label_selector: Selector = env::var("LABEL_SELECTOR")
        .unwrap_or_default()
        .parse()?;
    let field_selector = Selector::parse_fields(&env::var("FIELD_SELECTOR").unwrap_or_default())?;
    let watch_events = match env::var("WATCH_EVENTS") {
        Ok(value) => value.parse::<usize>().map_err(|e| ControllerError::InvalidConfig(
            format!("WATCH_EVENTS must be a number: {}", e)
        ))?,
        Err(_) => 0,
    };

    info!("Configuration:");
    info!("  Manifests: {}", manifest_path.display());
    info!("  Namespace: {}", namespace);
    info!("  Label selector: {:?}", label_selector.to_string());
    info!("  Field selector: {:?}", field_selector.to_string());

    let registry = MemoryRegistry::new();
    let rest = ExternalIPRequestRest::new(Arc::new(registry.clone()));
    let ctx = RequestContext::with_namespace(namespace.as_str());

    // Subscribe before applying so the watch sees the creates
    let stream = if watch_events > 0 {
        Some(rest.watch(&ctx, &label_selector, &field_selector, "").await?)
    } else {
        None
    };

    let requests = manifest::load_manifests(&manifest_path).await?;
    info!("Loaded {} manifests", requests.len());

    let mut failed = 0usize;
    for request in requests {
        let request_ctx = match request.metadata.namespace.as_deref() {
            Some(ns) if !ns.is_empty() => RequestContext::with_namespace(ns),
            _ => ctx.clone(),
        };
        let display_name = request.metadata.name.clone().unwrap_or_else(|| "<generated>".to_string());

        let result = match rest.create(&request_ctx, request) {
            Ok(pending) => pending.await,
            Err(e) => Err(e),
        };
        match result {
            Ok(created) => info!(
                "Created ExternalIPRequest {}/{}",
                created.metadata.namespace.as_deref().unwrap_or_default(),
                created.metadata.name.as_deref().unwrap_or_default()
            ),
            Err(e) => {
                failed += 1;
                error!("Failed to create ExternalIPRequest {}: {}", display_name, e);
            }
        }
    }

    let list = rest.list(&ctx, &label_selector, &field_selector).await?;
    info!("{} ExternalIPRequests match in namespace {}", list.len(), namespace);
    print!("{}", serde_yaml::to_string(&list.items)?);

    if let Some(mut stream) = stream {
        for _ in 0..watch_events {
            match tokio::time::timeout(WATCH_TIMEOUT, stream.next()).await {
                Ok(Some(Ok(event))) => log_event(&event),
                Ok(Some(Err(e))) => warn!("Watch error: {}", e),
                Ok(None) => break,
                Err(_) => {
                    warn!("No watch event within {:?}", WATCH_TIMEOUT);
                    break;
                }
            }
        }
    }

    if failed > 0 {
        warn!("{} of the manifests were rejected", failed);
    }
    info!("Registry at resource version {}", registry.resource_version());

    Ok(())
}

fn log_event(event: &WatchEvent) {
    let (verb, request) = match event {
        WatchEvent::Added(r) => ("ADDED", r),
        WatchEvent::Modified(r) => ("MODIFIED", r),
        WatchEvent::Deleted(r) => ("DELETED", r),
        _ => return,
    };
    info!(
        "Watch {} {}/{}",
        verb,
        request.metadata.namespace.as_deref().unwrap_or_default(),
        request.metadata.name.as_deref().unwrap_or_default()
    );
}
