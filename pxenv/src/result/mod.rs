// SPDX-License-Identifier: MIT OR Apache-2.0

//! Facilities for dealing with boot-API operation results.

use core::fmt::Debug;

mod error;
pub use self::error::Error;

mod status;
pub use self::status::{Status, StatusExt};

/// Return type of most engine operations.
///
/// Every operation of the boot API resolves to a status word which indicates
/// either success or a categorized failure. This type alias maps
/// [`Status::SUCCESS`] to the `Ok` variant (with optional `Output` data) and
/// every other status to the `Err` variant.
///
/// Some convenience methods are provided by the [`ResultExt`] trait.
pub type Result<Output = ()> = core::result::Result<Output, Error>;

/// Extension trait which provides some convenience methods for [`Result`].
pub trait ResultExt<Output> {
    /// Extract the status word from this result.
    fn status(&self) -> Status;
}

impl<Output: Debug> ResultExt<Output> for Result<Output> {
    fn status(&self) -> Status {
        match self {
            Ok(_) => Status::SUCCESS,
            Err(e) => e.status(),
        }
    }
}
