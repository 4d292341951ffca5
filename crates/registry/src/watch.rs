//! Change stream types returned by registry watches.

use crate::error::RegistryError;
use crds::ExternalIPRequest;
use futures::stream::BoxStream;

/// A single added/modified/deleted notification for an ExternalIPRequest.
pub type WatchEvent = kube::api::WatchEvent<ExternalIPRequest>;

/// Long-lived stream of watch events.
///
/// The stream runs until the registry closes it or the consumer drops it;
/// dropping is the only way to cancel a watch.
pub type WatchStream = BoxStream<'static, Result<WatchEvent, RegistryError>>;
