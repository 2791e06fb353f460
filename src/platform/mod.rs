// ── Platform abstraction layer ────────────────────────────────────────────────
//
// This module defines the interface the window tree uses to talk to the
// windowing substrate.  No `unsafe` lives here; all Win32 FFI is confined to the
// `win32` sub-module and never leaks outward.  `headless` emulates the same
// message traffic in-process.
//
// Every call may synchronously deliver further messages to the attached
// `MessageSink` before it returns.  Callers must not hold borrows of shared
// state across a platform call.

use std::rc::Weak;

use bitflags::bitflags;

use crate::{
    error::Result,
    geometry::{PhysicalPoint, PhysicalRect, PhysicalSize},
    message::{MessageSink, WindowHandle, WindowMessage},
    settings::WindowState,
};

pub mod headless;

#[cfg(windows)]
pub mod win32;

// ── Styles ────────────────────────────────────────────────────────────────────

bitflags! {
    /// `WS_*` window styles (same bit values as Win32).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WindowStyle: u32 {
        const OVERLAPPED   = 0x0000_0000;
        const POPUP        = 0x8000_0000;
        const CLIPCHILDREN = 0x0200_0000;
        const CAPTION      = 0x00C0_0000;
        const SYSMENU      = 0x0008_0000;
        const THICKFRAME   = 0x0004_0000;
        const MINIMIZEBOX  = 0x0002_0000;
        const MAXIMIZEBOX  = 0x0001_0000;
        const OVERLAPPEDWINDOW = Self::CAPTION.bits()
            | Self::SYSMENU.bits()
            | Self::THICKFRAME.bits()
            | Self::MINIMIZEBOX.bits()
            | Self::MAXIMIZEBOX.bits();
    }
}

bitflags! {
    /// `WS_EX_*` extended window styles (same bit values as Win32).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ExtendedStyle: u32 {
        const DLGMODALFRAME = 0x0000_0001;
        const TOOLWINDOW    = 0x0000_0080;
        const NOACTIVATE    = 0x0800_0000;
    }
}

impl WindowStyle {
    /// Styles that carry a title bar and sizing frame.
    pub fn has_frame(self) -> bool {
        self.contains(WindowStyle::CAPTION)
    }
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Parameters for one native top-level window.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeWindowParams {
    pub title: String,
    pub style: WindowStyle,
    pub ex_style: ExtendedStyle,
    /// Screen position of the frame; `None` lets the system choose.
    pub origin: Option<PhysicalPoint>,
    /// Frame size, borders included.
    pub frame_size: PhysicalSize,
    /// Native owner (`hwndParent` of a top-level window).
    pub owner: Option<WindowHandle>,
}

/// `ShowWindow` commands the host issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowCommand {
    Hide,
    /// Show, activate and restore (`SW_SHOWNORMAL`).
    Normal,
    /// Show without activating (`SW_SHOWNOACTIVATE`).
    NoActivate,
    Maximize,
    Minimize,
    Restore,
}

impl ShowCommand {
    /// Command that puts a window into `state`.
    pub fn for_state(state: WindowState) -> Self {
        match state {
            WindowState::Restored => Self::Restore,
            WindowState::Maximized => Self::Maximize,
            WindowState::Minimized => Self::Minimize,
        }
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// The native windowing substrate.
///
/// Geometry is physical.  Query methods on a handle that is not a live window
/// return an error or a neutral value; they never panic.
pub trait Platform {
    /// Route every message of windows created through this platform to `sink`.
    fn attach(&self, sink: Weak<dyn MessageSink>);

    /// `CreateWindowExW`.  `WM_NCCREATE` reaches the sink before this returns.
    fn create_window(&self, params: &NativeWindowParams) -> Result<WindowHandle>;

    /// `DestroyWindow`.  `WM_DESTROY` and `WM_NCDESTROY` reach the sink before
    /// this returns.
    fn destroy_window(&self, handle: WindowHandle) -> Result<()>;

    /// Ask the window to close (`WM_CLOSE`).  May complete later.
    fn request_close(&self, handle: WindowHandle) -> Result<()>;

    fn is_window(&self, handle: WindowHandle) -> bool;

    /// `DefWindowProcW`.
    fn default_window_proc(&self, msg: &WindowMessage) -> isize;

    /// `EnableNonClientDpiScaling`; only meaningful during `WM_NCCREATE`.
    fn enable_non_client_dpi_scaling(&self, handle: WindowHandle) -> Result<()>;

    fn system_dpi(&self) -> u32;

    fn dpi_for_window(&self, handle: WindowHandle) -> u32;

    /// Frame size whose client area is `client` (`AdjustWindowRectExForDpi`).
    fn frame_size_for_client(
        &self,
        client: PhysicalSize,
        style: WindowStyle,
        ex_style: ExtendedStyle,
        dpi: u32,
    ) -> Result<PhysicalSize>;

    /// Window rectangle in screen coordinates.
    fn window_rect(&self, handle: WindowHandle) -> Result<PhysicalRect>;

    fn client_size(&self, handle: WindowHandle) -> Result<PhysicalSize>;

    /// Screen position of the client area's top-left corner.
    fn client_origin(&self, handle: WindowHandle) -> Result<PhysicalPoint>;

    /// Work area of the monitor the window is on.
    fn work_area(&self, handle: WindowHandle) -> Result<PhysicalRect>;

    /// `SetWindowPos` without z-order change; `None` keeps that component.
    fn set_window_pos(
        &self,
        handle: WindowHandle,
        origin: Option<PhysicalPoint>,
        frame_size: Option<PhysicalSize>,
    ) -> Result<()>;

    fn show_window(&self, handle: WindowHandle, command: ShowCommand);

    /// Current placement (`IsZoomed` / `IsIconic`).
    fn placement(&self, handle: WindowHandle) -> WindowState;

    fn enable_window(&self, handle: WindowHandle, enabled: bool);

    fn is_window_enabled(&self, handle: WindowHandle) -> bool;

    /// Activate and focus the window.
    fn set_focus(&self, handle: WindowHandle);

    /// Native owner (`GetWindow(GW_OWNER)`).
    fn owner_of(&self, handle: WindowHandle) -> Option<WindowHandle>;

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<()>;

    /// Re-parent a child content window into `parent`'s client area.
    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> Result<()>;
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapped_window_matches_win32_value() {
        assert_eq!(WindowStyle::OVERLAPPEDWINDOW.bits(), 0x00CF_0000);
        assert!(WindowStyle::OVERLAPPEDWINDOW.has_frame());
        assert!(!WindowStyle::POPUP.has_frame());
    }

    #[test]
    fn show_command_per_state() {
        assert_eq!(ShowCommand::for_state(WindowState::Maximized), ShowCommand::Maximize);
        assert_eq!(ShowCommand::for_state(WindowState::Restored), ShowCommand::Restore);
    }
}
