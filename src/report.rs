// The (ok, message) pair every controller and config operation hands back.

use std::fmt;

/// Outcome of one service or config operation.
///
/// `ok` says whether the call itself succeeded. For `is-active` queries that
/// is the subcommand's exit code, not whether the unit is running; inspect
/// `message` ("active", "inactive", "failed") for the real state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub ok: bool,
    pub message: String,
}

impl StatusReport {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

impl<E: fmt::Display> From<Result<String, E>> for StatusReport {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(message) => Self::success(message),
            Err(e) => Self::failure(e.to_string()),
        }
    }
}
