// ── Win32 DPI queries ─────────────────────────────────────────────────────────
//
// Process awareness and the two DPI sources the host sizes against: the
// window's current monitor, and the system DPI for windows not yet created.
// Zero from either query means "unknown" and reads as the 96 DPI reference.

#![allow(unsafe_code)]

use tracing::debug;
use windows::Win32::{
    Foundation::HWND,
    UI::HiDpi::{
        GetDpiForSystem, GetDpiForWindow, SetProcessDpiAwarenessContext,
        DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2,
    },
};

use crate::dpi::BASE_DPI;

/// Switch the process to per-monitor v2 awareness, so `WM_DPICHANGED`
/// arrives and non-client areas scale.  No window may exist yet.
pub(crate) fn enable_per_monitor_awareness() {
    // SAFETY: no pointers involved; a process whose awareness is already
    // fixed gets ERROR_ACCESS_DENIED back.
    let result =
        unsafe { SetProcessDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2) };
    if let Err(e) = result {
        debug!(error = %e, "DPI awareness already set");
    }
}

pub(crate) fn window_dpi(hwnd: HWND) -> u32 {
    // SAFETY: GetDpiForWindow reports 0 for a stale handle.
    or_base(unsafe { GetDpiForWindow(hwnd) })
}

/// DPI an owner-less window is created at.
pub(crate) fn system_dpi() -> u32 {
    // SAFETY: no arguments; available on every per-monitor-v2 capable system.
    or_base(unsafe { GetDpiForSystem() })
}

fn or_base(dpi: u32) -> u32 {
    if dpi == 0 {
        BASE_DPI
    } else {
        dpi
    }
}
