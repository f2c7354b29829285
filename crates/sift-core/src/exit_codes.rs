//! Exit codes for the sift-core CLI.
//!
//! Exit codes communicate the outcome of a run without requiring output
//! parsing. Values are stable.

use sift_common::Error;

/// Exit codes for sift-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean run, nothing extracted
    Clean = 0,

    /// Events were extracted
    EventsProduced = 1,

    /// Some plugin run failed or skipped rows
    PartialFail = 3,

    /// Configuration error
    ConfigError = 10,

    /// A container could not be read
    ContainerUnreadable = 11,

    /// Unknown plugin or invalid plugin declaration
    PluginError = 12,

    /// I/O error
    IoError = 13,

    /// Internal/unknown error
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Clean | ExitCode::EventsProduced)
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Exit code for a fatal error surfaced to the CLI.
    pub fn for_error(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidConfig(_) => ExitCode::ConfigError,
            Error::ContainerUnreadable { .. } => ExitCode::ContainerUnreadable,
            Error::DuplicateIdentity { .. }
            | Error::InvalidPluginDeclaration { .. }
            | Error::PluginNotFound { .. } => ExitCode::PluginError,
            Error::Io(_) | Error::Sink(_) => ExitCode::IoError,
            _ => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}
