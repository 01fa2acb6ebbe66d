//! Exit code definitions for the bm binary
//!
//! A mirror daemon normally exits only on interrupt (0). Non-zero codes are
//! reserved for failures before or during the startup sweep.

use bm_core::Error;

/// Exit codes for the bm process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Clean shutdown after an interrupt
    Success = 0,

    /// General/unspecified error
    GeneralError = 1,

    /// User input error: bad directory, malformed endpoint, bad settings
    UsageError = 2,

    /// Object store failure (startup sweep could not complete)
    NetworkError = 3,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Classify an engine error into the code the process exits with
    pub fn from_error(error: &Error) -> Self {
        match error {
            Error::Network(_) => Self::NetworkError,
            Error::Config(_) | Error::InvalidUrl(_) | Error::TomlParse(_) => Self::UsageError,
            _ => Self::GeneralError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::NetworkError.as_i32(), 3);
    }

    #[test]
    fn test_error_classification() {
        assert_eq!(
            ExitCode::from_error(&Error::Network("503".into())),
            ExitCode::NetworkError
        );
        assert_eq!(
            ExitCode::from_error(&Error::Config("bad".into())),
            ExitCode::UsageError
        );
        assert_eq!(
            ExitCode::from_error(&Error::General("other".into())),
            ExitCode::GeneralError
        );
    }

    #[test]
    fn test_exit_code_into_i32() {
        let code: i32 = ExitCode::NetworkError.into();
        assert_eq!(code, 3);
    }
}
