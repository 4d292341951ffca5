//! System-managed object metadata.

use chrono::{SecondsFormat, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use registry::RequestContext;
use std::fmt;
use uuid::Uuid;

/// Fills the metadata fields the system owns on create.
pub trait ObjectMetaFiller: Send + Sync + fmt::Debug {
    /// Populates system fields on `meta` for a request made under `ctx`
    fn fill(&self, ctx: &RequestContext, meta: &mut ObjectMeta);
}

/// Default filler: creation timestamp of now and a random v4 UID.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFields;

impl ObjectMetaFiller for SystemFields {
    fn fill(&self, _ctx: &RequestContext, meta: &mut ObjectMeta) {
        fill_object_meta_system_fields(meta);
    }
}

/// Sets `creation_timestamp` and `uid`, overwriting client-supplied values.
pub fn fill_object_meta_system_fields(meta: &mut ObjectMeta) {
    meta.creation_timestamp = now();
    meta.uid = Some(Uuid::new_v4().to_string());
}

// Time goes through its RFC 3339 wire form so this works whatever time crate backs it
fn now() -> Option<Time> {
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    serde_json::from_value(serde_json::Value::String(stamp)).ok()
}
