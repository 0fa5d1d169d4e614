//! Exit codes of the verifier process.
//!
//! The exit code is the only machine-readable verdict the container runtime
//! consumes, so both binaries map every outcome through here.

/// Verification succeeded, or was skipped (out of scope, engine not
/// configured).
pub const SUCCESS: i32 = 0;

/// Verification ran and failed, a required flag was missing, or an
/// unrecoverable error occurred.
pub const FAILURE: i32 = 1;

/// Map a success flag to an exit code.
pub fn from_success(ok: bool) -> i32 {
    if ok {
        SUCCESS
    } else {
        FAILURE
    }
}
