//! ExternalIPRequest REST adapter
//!
//! Translates API-level create/get/list/update/delete/watch calls for
//! `ExternalIPRequest` objects into calls against an
//! [`ExternalIPRequestRegistry`](registry::ExternalIPRequestRegistry).
//!
//! # Example
//!
//! ```no_run
//! use apiserver::{ExternalIPRequestRest, RestStorage};
//! use registry::{ExternalIPRequestRegistry, RequestContext, Selector};
//! use std::sync::Arc;
//!
//! # async fn example(store: Arc<dyn ExternalIPRequestRegistry>) -> Result<(), Box<dyn std::error::Error>> {
//! let rest = ExternalIPRequestRest::new(store);
//! let ctx = RequestContext::with_namespace("default");
//!
//! // Mutations are validated up front and run on a spawned task
//! let created = rest.create(&ctx, rest.new_object())?.await?;
//!
//! // Reads are awaited inline
//! let infra = rest.list(&ctx, &"team=infra".parse()?, &Selector::everything()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `test-util`: in-memory [`mock::MemoryRegistry`] for tests and dry runs

pub mod async_result;
pub mod error;
pub mod meta;
pub mod predicate;
pub mod rest;
pub mod status;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;

#[cfg(test)]
mod rest_test;

pub use async_result::{make_async, RestResult};
pub use error::ApiError;
pub use meta::{ObjectMetaFiller, SystemFields};
pub use rest::{ExternalIPRequestRest, ResourceWatcher, RestStorage};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MemoryRegistry;
