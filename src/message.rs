// ── Window messages ───────────────────────────────────────────────────────────
//
// The host speaks Win32's message vocabulary.  Identifiers are mirrored here as
// plain integers so that the window tree compiles on every target; the Win32
// platform passes them through unchanged and the headless platform emits the
// same values.

use std::fmt;

use crate::{
    geometry::{PhysicalRect, PhysicalSize},
    view::ViewId,
};

// ── Message identifiers ───────────────────────────────────────────────────────

pub const WM_CREATE: u32 = 0x0001;
pub const WM_DESTROY: u32 = 0x0002;
pub const WM_MOVE: u32 = 0x0003;
pub const WM_SIZE: u32 = 0x0005;
pub const WM_ACTIVATE: u32 = 0x0006;
pub const WM_ENABLE: u32 = 0x000A;
pub const WM_CLOSE: u32 = 0x0010;
pub const WM_GETMINMAXINFO: u32 = 0x0024;
pub const WM_NCCREATE: u32 = 0x0081;
pub const WM_NCDESTROY: u32 = 0x0082;
pub const WM_NCACTIVATE: u32 = 0x0086;
pub const WM_DPICHANGED: u32 = 0x02E0;

// `WM_SIZE` wparam values.
pub const SIZE_RESTORED: usize = 0;
pub const SIZE_MINIMIZED: usize = 1;
pub const SIZE_MAXIMIZED: usize = 2;

// `WM_ACTIVATE` low-word values.
pub const WA_INACTIVE: usize = 0;
pub const WA_ACTIVE: usize = 1;
pub const WA_CLICKACTIVE: usize = 2;

/// Messages that always reach the window tree, whatever the embedder's
/// message callback decides.
pub fn is_lifecycle(message: u32) -> bool {
    matches!(message, WM_NCCREATE | WM_CREATE | WM_DESTROY | WM_NCDESTROY)
}

// ── Word helpers ──────────────────────────────────────────────────────────────

pub fn loword(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

pub fn hiword(value: usize) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/// Pack two 16-bit values the way `MAKELPARAM` does.
pub fn make_lparam(low: i32, high: i32) -> isize {
    (((high as u32 & 0xFFFF) << 16) | (low as u32 & 0xFFFF)) as isize
}

/// Signed low/high words of an lparam, as `GET_X_LPARAM`/`GET_Y_LPARAM`.
pub fn split_lparam(lparam: isize) -> (i32, i32) {
    let low = (lparam & 0xFFFF) as u16 as i16;
    let high = ((lparam >> 16) & 0xFFFF) as u16 as i16;
    (i32::from(low), i32::from(high))
}

// ── Handles ───────────────────────────────────────────────────────────────────

/// An opaque native window identifier (the raw `HWND` value on Windows).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub const NULL: WindowHandle = WindowHandle(0);

    pub fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// Tracking sizes offered by `WM_GETMINMAXINFO`, in physical frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinMaxInfo {
    pub min_track_size: PhysicalSize,
    pub max_track_size: PhysicalSize,
}

/// Structured data that travels behind an lparam pointer.  The platform
/// decodes it before dispatch and writes it back afterwards, so handlers never
/// dereference raw pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    None,
    /// `WM_GETMINMAXINFO`; handlers may edit the tracking sizes.
    MinMaxInfo(MinMaxInfo),
    /// `WM_DPICHANGED`; the suggested new window rectangle.
    SuggestedRect(PhysicalRect),
}

/// One message addressed to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowMessage {
    pub handle: WindowHandle,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub payload: Payload,
}

impl WindowMessage {
    pub fn new(handle: WindowHandle, message: u32, wparam: usize, lparam: isize) -> Self {
        Self {
            handle,
            message,
            wparam,
            lparam,
            payload: Payload::None,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}

/// The record handed to the embedder's message callback.
///
/// Layout is part of the C ABI: setting `handled` makes the host return
/// `result` instead of running its own handler (lifecycle messages excepted).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsMessage {
    pub view_id: ViewId,
    pub hwnd: WindowHandle,
    pub message: u32,
    pub wparam: usize,
    pub lparam: isize,
    pub result: isize,
    pub handled: bool,
}

impl WindowsMessage {
    pub(crate) fn observe(view_id: ViewId, msg: &WindowMessage) -> Self {
        Self {
            view_id,
            hwnd: msg.handle,
            message: msg.message,
            wparam: msg.wparam,
            lparam: msg.lparam,
            result: 0,
            handled: false,
        }
    }
}

/// Receiver of messages dispatched by a platform.  Implemented by the window
/// controller; called synchronously and possibly re-entrantly.
pub trait MessageSink {
    fn dispatch(&self, msg: &mut WindowMessage) -> isize;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lparam_packing_round_trips_signed_words() {
        let packed = make_lparam(-8, 1200);
        assert_eq!(split_lparam(packed), (-8, 1200));
    }

    #[test]
    fn words_of_dpi_changed_wparam() {
        let wparam = 144 | (144 << 16);
        assert_eq!(loword(wparam), 144);
        assert_eq!(hiword(wparam), 144);
    }

    #[test]
    fn lifecycle_messages() {
        assert!(is_lifecycle(WM_NCCREATE));
        assert!(is_lifecycle(WM_NCDESTROY));
        assert!(!is_lifecycle(WM_SIZE));
        assert!(!is_lifecycle(WM_CLOSE));
    }

    #[test]
    fn handle_display_is_hex() {
        assert_eq!(WindowHandle(0x1f0).to_string(), "0x1f0");
        assert!(WindowHandle::NULL.is_null());
    }
}
