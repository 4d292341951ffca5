//! Label and field filtering for ExternalIPRequests.
//!
//! Field selectors are evaluated against a projection of the object rather
//! than the object itself; [`selectable_fields`] is the only place that
//! decides which fields can be selected on.

use crds::ExternalIPRequest;
use registry::{Selector, Set};

/// Field selector key for the object name
pub const FIELD_NAME: &str = "name";

/// Fields of a request that field selectors can match on.
pub fn selectable_fields(request: &ExternalIPRequest) -> Set {
    Set::from([(
        FIELD_NAME.to_string(),
        request.metadata.name.clone().unwrap_or_default(),
    )])
}

/// True iff `label` matches the request labels and `field` matches its selectable fields.
pub fn matches(label: &Selector, field: &Selector, request: &ExternalIPRequest) -> bool {
    let empty = Set::new();
    let labels = request.metadata.labels.as_ref().unwrap_or(&empty);
    label.matches(labels) && field.matches(&selectable_fields(request))
}

/// Returns a predicate based on label and field selectors.
pub fn filter_func<'a>(
    label: &'a Selector,
    field: &'a Selector,
) -> impl Fn(&ExternalIPRequest) -> bool + Send + Sync + 'a {
    move |request: &ExternalIPRequest| matches(label, field, request)
}
