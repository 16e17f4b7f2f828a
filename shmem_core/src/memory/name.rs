//! Segment name validation and platform formatting
//!
//! Validation is purely syntactic; nothing here touches the OS.
//!
//! - POSIX: identities live in a filesystem-like namespace. A single leading
//!   `/` is accepted (and stripped from the user-facing name), any other `/`
//!   is rejected, and so is a name that is only `/`.
//! - Windows: identities live in the kernel object namespace, where
//!   `\ / : * ? " < > |` are rejected.
//!
//! Names longer than [`PORTABLE_NAME_LENGTH`] are accepted but will not work
//! on macOS, which caps identities at 31 bytes including the leading `/`.

use crate::backend::Platform;
use crate::error::{ShmError, ShmResult};
use std::fmt;

/// Longest name accepted on any platform
pub const MAX_NAME_LENGTH: usize = 255;

/// Longest name that works on every supported platform
pub const PORTABLE_NAME_LENGTH: usize = 30;

const WINDOWS_FORBIDDEN: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Check a name against the rules of the platform this crate was built for
pub fn validate(name: &str) -> bool {
    validate_for(name, Platform::current())
}

/// Check a name against the rules of a given platform
pub fn validate_for(name: &str, platform: Platform) -> bool {
    // NUL cannot cross the OS boundary; it plays the role of a null name
    if name.is_empty() || name.len() > MAX_NAME_LENGTH || name.contains('\0') {
        return false;
    }

    match platform {
        Platform::Windows => !name.contains(&WINDOWS_FORBIDDEN[..]),
        Platform::Posix => {
            if name == "/" {
                return false;
            }
            !name.bytes().skip(1).any(|b| b == b'/')
        }
    }
}

/// A validated segment identity
///
/// Holds the user-facing name, which never carries the POSIX `/` prefix.
/// The OS-facing form is derived on demand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SegmentName {
    name: String,
}

impl SegmentName {
    pub fn new(name: &str) -> ShmResult<Self> {
        if !validate(name) {
            return Err(ShmError::invalid_name(name));
        }

        let name = name.strip_prefix('/').unwrap_or(name);
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// User-facing name
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn is_portable(&self) -> bool {
        self.name.len() <= PORTABLE_NAME_LENGTH
    }

    /// Name as handed to the OS
    pub fn os_name(&self) -> String {
        match Platform::current() {
            Platform::Posix => format!("/{}", self.name),
            Platform::Windows => self.name.clone(),
        }
    }

    #[cfg(unix)]
    pub(crate) fn to_c_string(&self) -> ShmResult<std::ffi::CString> {
        std::ffi::CString::new(self.os_name()).map_err(|_| ShmError::invalid_name(&self.name))
    }

    #[cfg(windows)]
    pub(crate) fn to_wide(&self) -> Vec<u16> {
        self.os_name()
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect()
    }
}

impl fmt::Display for SegmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl AsRef<str> for SegmentName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_rejects_empty_and_oversized_names() {
        for platform in [Platform::Posix, Platform::Windows] {
            assert!(!validate_for("", platform));
            assert!(!validate_for(&"a".repeat(MAX_NAME_LENGTH + 1), platform));
            assert!(validate_for(&"a".repeat(MAX_NAME_LENGTH), platform));
            assert!(!validate_for("bad\0name", platform));
        }
    }

    #[test]
    fn test_posix_slash_rules() {
        assert!(validate_for("/leading", Platform::Posix));
        assert!(validate_for("plain_name", Platform::Posix));
        assert!(!validate_for("/", Platform::Posix));
        assert!(!validate_for("test/name", Platform::Posix));
        assert!(!validate_for("//double", Platform::Posix));
        assert!(!validate_for("trailing/", Platform::Posix));
    }

    #[test]
    fn test_windows_forbidden_characters() {
        for bad in [
            "test\\name",
            "test/name",
            "test:name",
            "test*name",
            "test?name",
            "test\"name",
            "test<name",
            "test>name",
            "test|name",
        ] {
            assert!(!validate_for(bad, Platform::Windows), "{} accepted", bad);
        }
        assert!(validate_for("Local_segment-1", Platform::Windows));
    }

    #[test]
    fn test_segment_name_strips_posix_prefix() {
        #[cfg(unix)]
        {
            let name = SegmentName::new("/ipc_test").unwrap();
            assert_eq!(name.as_str(), "ipc_test");
            assert_eq!(name.os_name(), "/ipc_test");
        }

        let name = SegmentName::new("ipc_test").unwrap();
        assert_eq!(name.to_string(), "ipc_test");
        assert!(name.is_portable());
    }

    #[test]
    fn test_segment_name_rejections_carry_invalid_name() {
        let err = SegmentName::new("").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidName);

        let err = SegmentName::new("/").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidName);
    }

    #[test]
    fn test_portability_hint() {
        let long = SegmentName::new(&"n".repeat(PORTABLE_NAME_LENGTH + 1)).unwrap();
        assert!(!long.is_portable());
    }
}
