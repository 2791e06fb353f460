// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in Casement return `error::Result<T>`.  Failures are
// resolved at the controller or window call that produced them; none of them
// unwind through a window procedure.

use thiserror::Error;

use crate::{
    message::WindowHandle,
    settings::WindowArchetype,
    view::ViewId,
};

/// Every error that Casement can produce.
#[derive(Debug, Error)]
pub enum CasementError {
    /// A substrate call returned a failure code.
    #[error("{function} failed (error {code:#010x})")]
    Win32 {
        /// The name of the failing function, for display purposes.
        function: &'static str,
        /// The raw Win32 error code (`GetLastError()` value) or HRESULT.
        code: u32,
    },

    /// The native window or its view could not be created.  Nothing from the
    /// attempt stays registered.
    #[error("window not created: {reason}")]
    Creation { reason: String },

    /// The view subsystem refused to bind, resize or destroy a view.
    #[error("view {view_id} failed: {reason}")]
    View { view_id: ViewId, reason: String },

    #[error("no live window with handle {0}")]
    UnknownHandle(WindowHandle),

    #[error("no live window for view {0}")]
    UnknownView(ViewId),

    #[error("no windowing engine registered with id {0}")]
    UnknownEngine(i64),

    /// The owner handle given for a dialog or popup is stale, untracked, or
    /// would close an ownership cycle.
    #[error("invalid owner window {0}")]
    InvalidOwner(WindowHandle),

    /// The operation does not apply to windows of this archetype.
    #[error("{operation} is not supported for {archetype:?} windows")]
    InvalidOperation {
        operation: &'static str,
        archetype: WindowArchetype,
    },

    /// A request parameter failed validation.
    #[error("invalid value for '{key}': {reason}")]
    InvalidArgument { key: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// The failure classes a caller can tell apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Native window or view creation failed.
    Construction,
    /// A handle, view id, engine id or owner does not resolve to a live window.
    InvalidReference,
    /// The window exists but the operation does not apply to its archetype.
    InvalidOperation,
    /// A request was malformed.
    InvalidArgument,
    /// A substrate or I/O call failed outside of creation.
    Platform,
}

impl CasementError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Creation { .. } => ErrorKind::Construction,
            Self::UnknownHandle(_)
            | Self::UnknownView(_)
            | Self::UnknownEngine(_)
            | Self::InvalidOwner(_) => ErrorKind::InvalidReference,
            Self::InvalidOperation { .. } => ErrorKind::InvalidOperation,
            Self::InvalidArgument { .. } | Self::Json(_) => ErrorKind::InvalidArgument,
            Self::Win32 { .. } | Self::View { .. } | Self::Io(_) => ErrorKind::Platform,
        }
    }

    pub(crate) fn invalid_argument(key: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            key,
            reason: reason.into(),
        }
    }
}

// Convert a windows-crate error (HRESULT) directly into a CasementError so that
// `?` can be used on `windows::core::Result<T>` throughout the Win32 platform.
#[cfg(windows)]
impl From<windows::core::Error> for CasementError {
    fn from(e: windows::core::Error) -> Self {
        // HRESULT.0 is i32; reinterpret bits as u32 for display purposes.
        // Win32 errors appear as 0x8007xxxx HRESULTs.
        Self::Win32 {
            function: "windows",
            code: e.code().0 as u32,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CasementError>;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win32_display_shows_function_and_hex_code() {
        let e = CasementError::Win32 {
            function: "CreateWindowExW",
            code: 0x578,
        };
        assert_eq!(e.to_string(), "CreateWindowExW failed (error 0x00000578)");
    }

    #[test]
    fn reference_and_operation_failures_are_distinct() {
        let stale = CasementError::UnknownHandle(WindowHandle(0x42));
        let wrong_kind = CasementError::InvalidOperation {
            operation: "get_state",
            archetype: WindowArchetype::Dialog,
        };
        assert_eq!(stale.kind(), ErrorKind::InvalidReference);
        assert_eq!(wrong_kind.kind(), ErrorKind::InvalidOperation);
        assert_ne!(stale.kind(), wrong_kind.kind());
    }

    #[test]
    fn invalid_owner_is_a_reference_failure() {
        let e = CasementError::InvalidOwner(WindowHandle(7));
        assert_eq!(e.kind(), ErrorKind::InvalidReference);
        assert_eq!(e.to_string(), "invalid owner window 0x7");
    }

    #[test]
    fn io_errors_convert_with_question_mark() {
        fn read() -> Result<()> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"))?;
            Ok(())
        }
        let e = read().unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Platform);
        assert!(e.to_string().contains("gone"));
    }
}
