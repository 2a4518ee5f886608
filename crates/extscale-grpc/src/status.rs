//! Mapping of fetch failures onto gRPC status codes.

use tonic::{Code, Status};

use extscale_core::FetchError;

/// Status returned to the controller when a fetch fails closed.
///
/// An unreachable or unreadable source is `UNAVAILABLE` (the controller
/// may try again on its next poll); a malformed payload is `INTERNAL`.
pub fn fetch_status(err: &FetchError) -> Status {
    let code = match err {
        FetchError::Connect { .. } | FetchError::Read { .. } => Code::Unavailable,
        FetchError::Decode { .. } => Code::Internal,
    };
    Status::new(code, err.to_string())
}
