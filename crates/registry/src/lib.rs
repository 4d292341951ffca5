//! ExternalIPRequest Registry
//!
//! The storage contract consumed by the ExternalIPRequest REST adapter, plus the
//! request context and selector types every registry call is expressed in.
//!
//! # Example
//!
//! ```
//! use registry::{RequestContext, Selector};
//! use std::collections::BTreeMap;
//!
//! let ctx = RequestContext::with_namespace("default");
//! assert_eq!(ctx.namespace(), Some("default"));
//!
//! let selector: Selector = "team=infra,tier!=edge".parse().unwrap();
//! let labels = BTreeMap::from([("team".to_string(), "infra".to_string())]);
//! assert!(selector.matches(&labels));
//! ```

pub mod context;
pub mod error;
pub mod labels;
#[path = "trait.rs"]
pub mod registry_trait;
pub mod watch;

pub use context::{RequestContext, valid_namespace, NAMESPACE_ALL, NAMESPACE_DEFAULT};
pub use error::RegistryError;
pub use labels::{Requirement, Selector, SelectorError, Set};
pub use registry_trait::{ExternalIPRequestRegistry, RequestFilter};
pub use watch::{WatchEvent, WatchStream};
