// SPDX-License-Identifier: MIT OR Apache-2.0

use super::Status;
use core::fmt::{Display, Formatter};

/// An error reported by a boot-API operation.
///
/// Wraps the non-success [`Status`] that the operation resolved to. The
/// status is what ultimately gets written back into the caller's parameter
/// block; inside the engine it travels as this error type so that `?`
/// propagation works layer to layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Error {
    status: Status,
}

impl Error {
    /// Create an `Error` from a non-success status.
    #[must_use]
    pub const fn new(status: Status) -> Self {
        Self { status }
    }

    /// Get the error [`Status`].
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}

impl From<Status> for Error {
    fn from(status: Status) -> Self {
        Self { status }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "boot API error: {}", self.status())
    }
}

impl core::error::Error for Error {}
