//! Error taxonomy for shared memory operations
//!
//! Every failure the platform backends observe is translated into one of the
//! closed [`ErrorCode`] values before it reaches the caller. OS failures keep
//! the original [`std::io::Error`] as their source so diagnostics are not lost.

use std::fmt;
use std::io;

/// Result alias used throughout shmem
pub type ShmResult<T> = Result<T, ShmError>;

/// Closed set of semantic error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    #[default]
    Success,
    AlreadyExists,
    NotFound,
    PermissionDenied,
    InvalidArgument,
    SizeMismatch,
    MappingFailed,
    InvalidSize,
    InvalidName,
    Unknown,
}

impl ErrorCode {
    /// Category name shared by every code
    pub const CATEGORY: &'static str = "shmem";

    /// Stable numeric value of the code
    pub fn value(self) -> i32 {
        match self {
            ErrorCode::Success => 0,
            ErrorCode::AlreadyExists => 1,
            ErrorCode::NotFound => 2,
            ErrorCode::PermissionDenied => 3,
            ErrorCode::InvalidArgument => 4,
            ErrorCode::SizeMismatch => 5,
            ErrorCode::MappingFailed => 6,
            ErrorCode::InvalidSize => 7,
            ErrorCode::InvalidName => 8,
            ErrorCode::Unknown => 9,
        }
    }

    /// Human-readable description of the code
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::Success => "success",
            ErrorCode::AlreadyExists => "shared memory already exists",
            ErrorCode::NotFound => "shared memory not found",
            ErrorCode::PermissionDenied => "permission denied",
            ErrorCode::InvalidArgument => "invalid argument",
            ErrorCode::SizeMismatch => "size mismatch",
            ErrorCode::MappingFailed => "memory mapping failed",
            ErrorCode::InvalidSize => "invalid size (must be greater than zero)",
            ErrorCode::InvalidName => "invalid shared memory name",
            ErrorCode::Unknown => "unknown error",
        }
    }

    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }

    /// Translate an OS error into the taxonomy.
    ///
    /// Platform-specific codes are checked first, then the portable
    /// [`io::ErrorKind`]. Anything left over is [`ErrorCode::Unknown`].
    pub fn from_os_error(err: &io::Error) -> ErrorCode {
        if let Some(code) = err.raw_os_error().and_then(platform_code) {
            return code;
        }

        match err.kind() {
            io::ErrorKind::AlreadyExists => ErrorCode::AlreadyExists,
            io::ErrorKind::NotFound => ErrorCode::NotFound,
            io::ErrorKind::PermissionDenied => ErrorCode::PermissionDenied,
            io::ErrorKind::InvalidInput => ErrorCode::InvalidArgument,
            _ => ErrorCode::Unknown,
        }
    }
}

#[cfg(unix)]
fn platform_code(code: i32) -> Option<ErrorCode> {
    match code {
        libc::EEXIST => Some(ErrorCode::AlreadyExists),
        libc::ENOENT => Some(ErrorCode::NotFound),
        libc::EACCES | libc::EPERM => Some(ErrorCode::PermissionDenied),
        libc::EINVAL => Some(ErrorCode::InvalidArgument),
        libc::ENAMETOOLONG => Some(ErrorCode::InvalidName),
        libc::EFBIG => Some(ErrorCode::InvalidSize),
        _ => None,
    }
}

#[cfg(windows)]
fn platform_code(code: i32) -> Option<ErrorCode> {
    use windows_sys::Win32::Foundation::{
        ERROR_ACCESS_DENIED, ERROR_ALREADY_EXISTS, ERROR_COMMITMENT_LIMIT, ERROR_FILENAME_EXCED_RANGE,
        ERROR_FILE_NOT_FOUND, ERROR_INVALID_NAME, ERROR_INVALID_PARAMETER, ERROR_NOT_ENOUGH_MEMORY,
    };

    match code as u32 {
        ERROR_ALREADY_EXISTS => Some(ErrorCode::AlreadyExists),
        ERROR_FILE_NOT_FOUND => Some(ErrorCode::NotFound),
        ERROR_ACCESS_DENIED => Some(ErrorCode::PermissionDenied),
        ERROR_INVALID_PARAMETER => Some(ErrorCode::InvalidArgument),
        ERROR_INVALID_NAME | ERROR_FILENAME_EXCED_RANGE => Some(ErrorCode::InvalidName),
        ERROR_NOT_ENOUGH_MEMORY | ERROR_COMMITMENT_LIMIT => Some(ErrorCode::InvalidSize),
        _ => None,
    }
}

#[cfg(not(any(unix, windows)))]
fn platform_code(_code: i32) -> Option<ErrorCode> {
    None
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Error type for shared memory operations
#[derive(Debug, thiserror::Error)]
pub enum ShmError {
    /// Failure detected by shmem itself, before or without an OS call
    #[error("{message}")]
    Shm { code: ErrorCode, message: String },

    /// Failure reported by the operating system
    #[error("{context}: {source}")]
    Os {
        code: ErrorCode,
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ShmError {
    /// Error carrying only a taxonomy code and its default message
    pub fn new(code: ErrorCode) -> Self {
        ShmError::Shm {
            code,
            message: code.message().to_string(),
        }
    }

    /// Error carrying a taxonomy code and a descriptive message
    pub fn with_message<S: Into<String>>(code: ErrorCode, message: S) -> Self {
        ShmError::Shm {
            code,
            message: message.into(),
        }
    }

    /// Translate an OS error, classifying it through [`ErrorCode::from_os_error`]
    pub fn os<S: Into<String>>(context: S, source: io::Error) -> Self {
        ShmError::Os {
            code: ErrorCode::from_os_error(&source),
            context: context.into(),
            source,
        }
    }

    /// Wrap an OS error under an explicit code
    pub fn os_with_code<S: Into<String>>(code: ErrorCode, context: S, source: io::Error) -> Self {
        ShmError::Os {
            code,
            context: context.into(),
            source,
        }
    }

    /// Translate the calling thread's last OS error
    pub fn last_os_error<S: Into<String>>(context: S) -> Self {
        Self::os(context, io::Error::last_os_error())
    }

    pub fn invalid_name(name: &str) -> Self {
        Self::with_message(
            ErrorCode::InvalidName,
            format!("{}: {:?}", ErrorCode::InvalidName.message(), name),
        )
    }

    pub fn invalid_size(size: usize) -> Self {
        Self::with_message(
            ErrorCode::InvalidSize,
            format!("{}: got {}", ErrorCode::InvalidSize.message(), size),
        )
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::with_message(ErrorCode::InvalidArgument, message)
    }

    /// Taxonomy code of this error
    pub fn code(&self) -> ErrorCode {
        match self {
            ShmError::Shm { code, .. } | ShmError::Os { code, .. } => *code,
        }
    }

    /// Underlying platform error code, if this error came from the OS
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            ShmError::Os { source, .. } => source.raw_os_error(),
            ShmError::Shm { .. } => None,
        }
    }
}

impl PartialEq<ErrorCode> for ShmError {
    fn eq(&self, other: &ErrorCode) -> bool {
        self.code() == *other
    }
}

impl From<ErrorCode> for ShmError {
    fn from(code: ErrorCode) -> Self {
        ShmError::new(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(ErrorCode::Success.message(), "success");
        assert_eq!(
            ErrorCode::AlreadyExists.message(),
            "shared memory already exists"
        );
        assert_eq!(ErrorCode::NotFound.message(), "shared memory not found");
        assert_eq!(
            ErrorCode::InvalidSize.message(),
            "invalid size (must be greater than zero)"
        );
        assert_eq!(ErrorCode::InvalidName.message(), "invalid shared memory name");
        assert_eq!(ErrorCode::Unknown.to_string(), "unknown error");
    }

    #[test]
    fn test_error_values_are_stable() {
        assert_eq!(ErrorCode::Success.value(), 0);
        assert_eq!(ErrorCode::AlreadyExists.value(), 1);
        assert_eq!(ErrorCode::Unknown.value(), 9);
        assert!(ErrorCode::default().is_success());
    }

    #[test]
    fn test_error_compares_with_code() {
        let err = ShmError::new(ErrorCode::AlreadyExists);
        assert_eq!(err, ErrorCode::AlreadyExists);
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(err.to_string(), "shared memory already exists");
        assert!(err.raw_os_error().is_none());
    }

    #[test]
    fn test_os_error_translation() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert_eq!(ErrorCode::from_os_error(&not_found), ErrorCode::NotFound);

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(
            ErrorCode::from_os_error(&denied),
            ErrorCode::PermissionDenied
        );

        let other = io::Error::new(io::ErrorKind::Other, "boom");
        assert_eq!(ErrorCode::from_os_error(&other), ErrorCode::Unknown);
    }

    #[cfg(unix)]
    #[test]
    fn test_errno_translation() {
        let exists = io::Error::from_raw_os_error(libc::EEXIST);
        let err = ShmError::os("shm_open", exists);
        assert_eq!(err.code(), ErrorCode::AlreadyExists);
        assert_eq!(err.raw_os_error(), Some(libc::EEXIST));

        let too_long = io::Error::from_raw_os_error(libc::ENAMETOOLONG);
        assert_eq!(ErrorCode::from_os_error(&too_long), ErrorCode::InvalidName);
    }

    #[test]
    fn test_unanticipated_os_error_keeps_source() {
        use std::error::Error as _;

        let err = ShmError::os("mmap", io::Error::new(io::ErrorKind::Other, "boom"));
        assert_eq!(err.code(), ErrorCode::Unknown);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("mmap"));
    }
}
