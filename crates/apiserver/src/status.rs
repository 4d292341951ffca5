//! API status objects returned by delete.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Status;

/// `Status.status` for a completed operation
pub const STATUS_SUCCESS: &str = "Success";

/// `Status.status` for an operation that could not be carried out
pub const STATUS_FAILURE: &str = "Failure";

/// A success status
pub fn success() -> Status {
    Status {
        status: Some(STATUS_SUCCESS.to_string()),
        ..Default::default()
    }
}

/// A failure status with no further detail
pub fn failure() -> Status {
    Status {
        status: Some(STATUS_FAILURE.to_string()),
        ..Default::default()
    }
}

/// Whether `status` reports success
pub fn is_success(status: &Status) -> bool {
    status.status.as_deref() == Some(STATUS_SUCCESS)
}
