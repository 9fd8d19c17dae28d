// SPDX-License-Identifier: MIT OR Apache-2.0

//! This optional feature adds support for the `log` crate, providing
//! a custom logger implementation which writes to a caller-supplied
//! console writer.
//!
//! The main export of this module is the [`Logger`] structure, which
//! implements the `log` crate's trait `Log`.
//!
//! # Implementation details
//!
//! The implementation is not the most efficient, since there is no
//! buffering done; every record goes to the console writer as it is
//! formatted. On a boot console that is the behaviour you want anyway,
//! since a crash loses nothing.

use core::fmt::{self, Write};
use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

/// Logging implementation which writes to a console writer owned by the
/// embedding.
///
/// If this logger is used as a global logger, you must disable it using
/// the [`disable`] method before the writer it points at goes away, in
/// order to prevent undefined behaviour from inadvertent logging.
///
/// [`disable`]: Self::disable
#[derive(Debug)]
pub struct Logger<W> {
    writer: AtomicPtr<W>,
}

impl<W: fmt::Write> Logger<W> {
    /// Creates a new logger.
    ///
    /// The logger is initially disabled. Call [`set_output`] to enable it.
    ///
    /// [`set_output`]: Self::set_output
    #[must_use]
    pub const fn new() -> Self {
        Self {
            writer: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Get the output pointer (may be null).
    #[must_use]
    fn output(&self) -> *mut W {
        self.writer.load(Ordering::Acquire)
    }

    /// Set the writer to which the logger will write.
    ///
    /// If a null pointer is passed for `output`, this method is equivalent
    /// to calling [`disable`].
    ///
    /// # Safety
    ///
    /// The `output` pointer must either be null or point to a valid writer.
    /// That writer must remain valid until the logger is either disabled,
    /// or `set_output` is called with a different `output`.
    ///
    /// [`disable`]: Self::disable
    pub unsafe fn set_output(&self, output: *mut W) {
        self.writer.store(output, Ordering::Release);
    }

    /// Disable the logger.
    pub fn disable(&self) {
        unsafe { self.set_output(ptr::null_mut()) }
    }
}

impl<W: fmt::Write> Default for Logger<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: fmt::Write> log::Log for Logger<W> {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        // Filtering already happened through `log`'s max-level gate.
        true
    }

    fn log(&self, record: &log::Record) {
        if let Some(writer) = unsafe { self.output().as_mut() } {
            // An error has nowhere to be reported from inside the
            // logger, and a panic over a lost message is a bad trade.
            let _ = LineDecorator::write(
                writer,
                record.level(),
                record.args(),
                record.file().unwrap_or("<unknown file>"),
                record.line().unwrap_or(0),
            );
        }
    }

    fn flush(&self) {
        // This simple logger does not buffer output.
    }
}

// The logger is not thread-safe, but the preboot environment only uses one
// processor.
unsafe impl<W> Sync for Logger<W> {}
unsafe impl<W> Send for Logger<W> {}

/// Writer adapter that puts the level and source location in front of
/// every line of a record.
///
/// `fmt::Arguments` can only be rendered straight into an `fmt::Write`
/// sink, and without allocation there is no staging buffer to
/// post-process. So the adapter sits between the formatting machinery
/// and the real writer and watches for line boundaries as the pieces
/// stream through.
struct LineDecorator<'w, 'r, W: fmt::Write> {
    writer: &'w mut W,
    level: log::Level,
    at_line_start: bool,
    file: &'r str,
    line: u32,
}

impl<'w, 'r, W: fmt::Write> LineDecorator<'w, 'r, W> {
    fn write(
        writer: &'w mut W,
        level: log::Level,
        args: &fmt::Arguments,
        file: &'r str,
        line: u32,
    ) -> fmt::Result {
        let mut decorator = Self {
            writer,
            level,
            at_line_start: true,
            file,
            line,
        };
        writeln!(decorator, "{}", *args)
    }
}

impl<W: fmt::Write> fmt::Write for LineDecorator<'_, '_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        // One piece may carry several line breaks, and one line may
        // arrive split across several pieces. Only a piece that truly
        // starts a line gets the prefix.
        for piece in s.split_inclusive('\n') {
            if self.at_line_start {
                write!(
                    self.writer,
                    "[{:>5}]: {:>12}@{:03}: ",
                    self.level, self.file, self.line
                )?;
            }
            self.writer.write_str(piece)?;
            self.at_line_start = piece.ends_with('\n');
        }
        Ok(())
    }
}
