// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Error, Result};

pub use pxenv_raw::Status;

/// Extension trait which provides some convenience methods for [`Status`].
pub trait StatusExt {
    /// Converts this status word into a [`Result`].
    ///
    /// If the status does not indicate success, it is embedded into the
    /// `Err` variant as an [`Error`].
    fn to_result(self) -> Result;

    /// Converts this status word into a [`Result`] with a given `Ok` value.
    ///
    /// If the status does not indicate success, it is embedded into the
    /// `Err` variant as an [`Error`].
    fn to_result_with_val<T>(self, val: impl FnOnce() -> T) -> Result<T>;
}

impl StatusExt for Status {
    #[inline]
    fn to_result(self) -> Result {
        if self.is_success() {
            Ok(())
        } else {
            Err(self.into())
        }
    }

    #[inline]
    fn to_result_with_val<T>(self, val: impl FnOnce() -> T) -> Result<T> {
        if self.is_success() {
            Ok(val())
        } else {
            Err(self.into())
        }
    }
}
