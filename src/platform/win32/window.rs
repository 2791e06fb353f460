// ── Win32 windows ─────────────────────────────────────────────────────────────
//
// Responsibilities in this file (unsafe confined here):
//   • Register the host window class.
//   • Implement `Platform` over the real window manager.
//   • Route every message of our windows to the attached `MessageSink`,
//     decoding pointer payloads before dispatch and writing them back after.
//   • Run the Win32 message loop and expose the fatal-error dialog.
//
// The sink lives behind a `Box<Shared>` whose address is passed through
// `CreateWindowExW` and stored in `GWLP_USERDATA` on `WM_NCCREATE`.

#![allow(unsafe_code)]

use std::{
    cell::RefCell,
    collections::HashSet,
    ffi::c_void,
    rc::{Rc, Weak},
};

use tracing::{trace, warn};
use windows::{
    core::{HSTRING, PCWSTR},
    Win32::{
        Foundation::{
            GetLastError, BOOL, FALSE, HINSTANCE, HWND, LPARAM, LRESULT, POINT, RECT, WPARAM,
        },
        Graphics::Gdi::{
            ClientToScreen, GetMonitorInfoW, MonitorFromWindow, MONITORINFO,
            MONITOR_DEFAULTTONEAREST,
        },
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            HiDpi::{AdjustWindowRectExForDpi, EnableNonClientDpiScaling},
            Input::KeyboardAndMouse::{EnableWindow, IsWindowEnabled, SetFocus},
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, GetClientRect,
                GetMessageW, GetWindow, GetWindowLongPtrW, GetWindowRect, IsIconic, IsWindow,
                IsZoomed, LoadCursorW, MessageBoxW, PostMessageW, PostQuitMessage,
                RegisterClassExW, SetParent, SetWindowLongPtrW, SetWindowPos, SetWindowTextW,
                ShowWindow, TranslateMessage, CREATESTRUCTW, CS_HREDRAW, CS_VREDRAW,
                CW_USEDEFAULT, GWLP_USERDATA, GW_OWNER, HMENU, IDC_ARROW, MB_ICONERROR, MB_OK,
                MINMAXINFO, MSG, SHOW_WINDOW_CMD, SWP_NOACTIVATE, SWP_NOMOVE, SWP_NOSIZE,
                SWP_NOZORDER, SW_HIDE, SW_MINIMIZE, SW_RESTORE, SW_SHOWMAXIMIZED,
                SW_SHOWNOACTIVATE, SW_SHOWNORMAL, WINDOW_EX_STYLE, WINDOW_STYLE, WM_CLOSE,
                WNDCLASSEXW,
            },
        },
    },
};

use super::dpi;
use crate::{
    config::HostConfig,
    error::{CasementError, Result},
    geometry::{PhysicalPoint, PhysicalRect, PhysicalSize},
    message::{
        MessageSink, MinMaxInfo, Payload, WindowHandle, WindowMessage, WM_DPICHANGED,
        WM_GETMINMAXINFO, WM_NCCREATE, WM_NCDESTROY,
    },
    platform::{ExtendedStyle, NativeWindowParams, Platform, ShowCommand, WindowStyle},
    settings::WindowState,
};

fn hwnd(handle: WindowHandle) -> HWND {
    HWND(handle.0 as *mut c_void)
}

fn handle_of(hwnd: HWND) -> WindowHandle {
    WindowHandle(hwnd.0 as isize)
}

// ── Shared routing state ──────────────────────────────────────────────────────

#[derive(Default)]
struct Shared {
    sink: RefCell<Option<Weak<dyn MessageSink>>>,
    /// Windows whose `GWLP_USERDATA` points at this `Shared`.
    live: RefCell<HashSet<isize>>,
}

impl Shared {
    fn sink(&self) -> Option<Rc<dyn MessageSink>> {
        self.sink.borrow().as_ref().and_then(Weak::upgrade)
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

/// The real window manager.
pub struct Win32Platform {
    shared: Box<Shared>,
    hinstance: HINSTANCE,
    class_name: HSTRING,
}

impl Win32Platform {
    /// Opt into per-monitor DPI awareness and register the window class named
    /// in `config`.  Call once, before any window exists.
    pub fn new(config: &HostConfig) -> Result<Self> {
        dpi::enable_per_monitor_awareness();

        // SAFETY: GetModuleHandleW(None) returns the .exe's own HMODULE, which is
        // valid for the process lifetime.
        let hmodule = unsafe { GetModuleHandleW(None) }?;
        let hinstance = HINSTANCE(hmodule.0);
        let class_name = HSTRING::from(config.window_class_name.as_str());
        register_class(hinstance, &class_name)?;

        Ok(Self {
            shared: Box::default(),
            hinstance,
            class_name,
        })
    }

    fn shared_ptr(&self) -> *const c_void {
        (&*self.shared as *const Shared).cast()
    }
}

impl Drop for Win32Platform {
    fn drop(&mut self) {
        for raw in self.shared.live.borrow_mut().drain() {
            // SAFETY: `raw` names a window that still points at our `Shared`;
            // clearing the slot stops `wnd_proc` from reading freed memory.
            unsafe {
                SetWindowLongPtrW(HWND(raw as *mut c_void), GWLP_USERDATA, 0);
            }
        }
    }
}

impl Platform for Win32Platform {
    fn attach(&self, sink: Weak<dyn MessageSink>) {
        *self.shared.sink.borrow_mut() = Some(sink);
    }

    fn create_window(&self, params: &NativeWindowParams) -> Result<WindowHandle> {
        let (x, y) = params
            .origin
            .map_or((CW_USEDEFAULT, CW_USEDEFAULT), |p| (p.x, p.y));
        let owner = params.owner.map_or_else(HWND::default, hwnd);
        let title = HSTRING::from(params.title.as_str());

        // SAFETY: the class was registered in `new`; `title` and `class_name`
        // outlive the call.  The `Shared` pointer stays valid until `Drop`
        // clears every window that holds it.
        let created = unsafe {
            CreateWindowExW(
                WINDOW_EX_STYLE(params.ex_style.bits()),
                &self.class_name,
                &title,
                WINDOW_STYLE(params.style.bits()),
                x,
                y,
                params.frame_size.width,
                params.frame_size.height,
                owner,
                HMENU::default(),
                self.hinstance,
                Some(self.shared_ptr()),
            )
        };
        match created {
            Ok(h) if !h.is_invalid() => Ok(handle_of(h)),
            Ok(_) => Err(last_error("CreateWindowExW")),
            Err(e) => Err(CasementError::Win32 {
                function: "CreateWindowExW",
                code: e.code().0 as u32,
            }),
        }
    }

    fn destroy_window(&self, handle: WindowHandle) -> Result<()> {
        // SAFETY: DestroyWindow validates the handle and fails for a stale one.
        unsafe { DestroyWindow(hwnd(handle)) }?;
        Ok(())
    }

    fn request_close(&self, handle: WindowHandle) -> Result<()> {
        // SAFETY: posting to a stale handle fails without side effects.
        unsafe { PostMessageW(hwnd(handle), WM_CLOSE, WPARAM(0), LPARAM(0)) }?;
        Ok(())
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        // SAFETY: IsWindow accepts any value.
        unsafe { IsWindow(hwnd(handle)) }.as_bool()
    }

    fn default_window_proc(&self, msg: &WindowMessage) -> isize {
        // SAFETY: the message came from our window procedure with its original
        // parameters; any lparam pointer is still live for this dispatch.
        unsafe {
            DefWindowProcW(
                hwnd(msg.handle),
                msg.message,
                WPARAM(msg.wparam),
                LPARAM(msg.lparam),
            )
        }
        .0
    }

    fn enable_non_client_dpi_scaling(&self, handle: WindowHandle) -> Result<()> {
        // SAFETY: called during WM_NCCREATE for a live window.
        unsafe { EnableNonClientDpiScaling(hwnd(handle)) }?;
        Ok(())
    }

    fn system_dpi(&self) -> u32 {
        dpi::system_dpi()
    }

    fn dpi_for_window(&self, handle: WindowHandle) -> u32 {
        dpi::window_dpi(hwnd(handle))
    }

    fn frame_size_for_client(
        &self,
        client: PhysicalSize,
        style: WindowStyle,
        ex_style: ExtendedStyle,
        dpi: u32,
    ) -> Result<PhysicalSize> {
        let mut rect = RECT {
            left: 0,
            top: 0,
            right: client.width,
            bottom: client.height,
        };
        // SAFETY: `rect` is a valid, writable RECT.
        unsafe {
            AdjustWindowRectExForDpi(
                &mut rect,
                WINDOW_STYLE(style.bits()),
                FALSE,
                WINDOW_EX_STYLE(ex_style.bits()),
                dpi,
            )
        }?;
        Ok(PhysicalSize::new(
            rect.right.saturating_sub(rect.left),
            rect.bottom.saturating_sub(rect.top),
        ))
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<PhysicalRect> {
        let mut rect = RECT::default();
        // SAFETY: `rect` is writable; a stale handle makes the call fail.
        unsafe { GetWindowRect(hwnd(handle), &mut rect) }?;
        Ok(from_win32_rect(rect))
    }

    fn client_size(&self, handle: WindowHandle) -> Result<PhysicalSize> {
        let mut rect = RECT::default();
        // SAFETY: as for `window_rect`.
        unsafe { GetClientRect(hwnd(handle), &mut rect) }?;
        Ok(PhysicalSize::new(rect.right - rect.left, rect.bottom - rect.top))
    }

    fn client_origin(&self, handle: WindowHandle) -> Result<PhysicalPoint> {
        let mut point = POINT::default();
        // SAFETY: `point` is writable; a stale handle returns FALSE.
        if !unsafe { ClientToScreen(hwnd(handle), &mut point) }.as_bool() {
            return Err(last_error("ClientToScreen"));
        }
        Ok(PhysicalPoint::new(point.x, point.y))
    }

    fn work_area(&self, handle: WindowHandle) -> Result<PhysicalRect> {
        let mut info = MONITORINFO {
            cbSize: std::mem::size_of::<MONITORINFO>() as u32,
            ..Default::default()
        };
        // SAFETY: MonitorFromWindow never fails with MONITOR_DEFAULTTONEAREST;
        // `info` is writable with `cbSize` set.
        let found = unsafe {
            let monitor = MonitorFromWindow(hwnd(handle), MONITOR_DEFAULTTONEAREST);
            GetMonitorInfoW(monitor, &mut info)
        };
        if !found.as_bool() {
            return Err(last_error("GetMonitorInfoW"));
        }
        Ok(from_win32_rect(info.rcWork))
    }

    fn set_window_pos(
        &self,
        handle: WindowHandle,
        origin: Option<PhysicalPoint>,
        frame_size: Option<PhysicalSize>,
    ) -> Result<()> {
        let mut flags = SWP_NOZORDER | SWP_NOACTIVATE;
        if origin.is_none() {
            flags |= SWP_NOMOVE;
        }
        if frame_size.is_none() {
            flags |= SWP_NOSIZE;
        }
        let origin = origin.unwrap_or_default();
        let size = frame_size.unwrap_or_default();
        // SAFETY: plain handle call; z-order is left untouched.
        unsafe {
            SetWindowPos(
                hwnd(handle),
                HWND::default(),
                origin.x,
                origin.y,
                size.width,
                size.height,
                flags,
            )
        }?;
        Ok(())
    }

    fn show_window(&self, handle: WindowHandle, command: ShowCommand) {
        let command: SHOW_WINDOW_CMD = match command {
            ShowCommand::Hide => SW_HIDE,
            ShowCommand::Normal => SW_SHOWNORMAL,
            ShowCommand::NoActivate => SW_SHOWNOACTIVATE,
            ShowCommand::Maximize => SW_SHOWMAXIMIZED,
            ShowCommand::Minimize => SW_MINIMIZE,
            ShowCommand::Restore => SW_RESTORE,
        };
        // SAFETY: the return value is the previous visibility, not an error.
        unsafe {
            let _ = ShowWindow(hwnd(handle), command);
        }
    }

    fn placement(&self, handle: WindowHandle) -> WindowState {
        // SAFETY: both queries accept any handle.
        let (iconic, zoomed) =
            unsafe { (IsIconic(hwnd(handle)).as_bool(), IsZoomed(hwnd(handle)).as_bool()) };
        if iconic {
            WindowState::Minimized
        } else if zoomed {
            WindowState::Maximized
        } else {
            WindowState::Restored
        }
    }

    fn enable_window(&self, handle: WindowHandle, enabled: bool) {
        // SAFETY: the return value is the previous state, not an error.
        unsafe {
            let _ = EnableWindow(hwnd(handle), BOOL::from(enabled));
        }
    }

    fn is_window_enabled(&self, handle: WindowHandle) -> bool {
        // SAFETY: accepts any handle.
        unsafe { IsWindowEnabled(hwnd(handle)) }.as_bool()
    }

    fn set_focus(&self, handle: WindowHandle) {
        // SAFETY: SetFocus activates a top-level window of this thread; a stale
        // handle just fails.
        unsafe {
            let _ = SetFocus(hwnd(handle));
        }
    }

    fn owner_of(&self, handle: WindowHandle) -> Option<WindowHandle> {
        // SAFETY: GetWindow fails cleanly for windows without an owner.
        unsafe { GetWindow(hwnd(handle), GW_OWNER) }
            .ok()
            .filter(|h| !h.is_invalid())
            .map(handle_of)
    }

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<()> {
        let title = HSTRING::from(title);
        // SAFETY: `title` is null-terminated and outlives the call.
        unsafe { SetWindowTextW(hwnd(handle), &title) }?;
        Ok(())
    }

    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> Result<()> {
        // SAFETY: both handles are checked by the system.
        unsafe { SetParent(hwnd(child), hwnd(parent)) }?;
        Ok(())
    }
}

fn from_win32_rect(rect: RECT) -> PhysicalRect {
    PhysicalRect::new(rect.left, rect.top, rect.right, rect.bottom)
}

// ── Window class registration ─────────────────────────────────────────────────

fn register_class(hinstance: HINSTANCE, class_name: &HSTRING) -> Result<()> {
    // SAFETY: IDC_ARROW is a built-in cursor resource.
    let cursor = unsafe { LoadCursorW(None, IDC_ARROW) }?;

    let wndclass = WNDCLASSEXW {
        cbSize: std::mem::size_of::<WNDCLASSEXW>() as u32,
        style: CS_HREDRAW | CS_VREDRAW,
        lpfnWndProc: Some(wnd_proc),
        hInstance: hinstance,
        hCursor: cursor,
        lpszClassName: PCWSTR(class_name.as_ptr()),
        ..Default::default()
    };

    // SAFETY: wndclass is fully initialised; `class_name` outlives the call.
    let atom = unsafe { RegisterClassExW(&wndclass) };
    if atom == 0 {
        return Err(last_error("RegisterClassExW"));
    }
    Ok(())
}

// ── Window procedure ──────────────────────────────────────────────────────────

/// Decode the structure `lparam` points at for messages that carry one.
///
/// # Safety
/// `lparam` must be the unmodified parameter of `message`.
unsafe fn read_payload(message: u32, lparam: LPARAM) -> Payload {
    match message {
        WM_GETMINMAXINFO => {
            // SAFETY: WM_GETMINMAXINFO's lparam points to a live MINMAXINFO.
            let info = unsafe { &*(lparam.0 as *const MINMAXINFO) };
            Payload::MinMaxInfo(MinMaxInfo {
                min_track_size: PhysicalSize::new(info.ptMinTrackSize.x, info.ptMinTrackSize.y),
                max_track_size: PhysicalSize::new(info.ptMaxTrackSize.x, info.ptMaxTrackSize.y),
            })
        }
        WM_DPICHANGED => {
            // SAFETY: WM_DPICHANGED's lparam points to the suggested RECT.
            let rect = unsafe { &*(lparam.0 as *const RECT) };
            Payload::SuggestedRect(from_win32_rect(*rect))
        }
        _ => Payload::None,
    }
}

/// # Safety
/// As for [`read_payload`].
unsafe fn write_payload(lparam: LPARAM, payload: &Payload) {
    if let Payload::MinMaxInfo(edited) = payload {
        // SAFETY: only WM_GETMINMAXINFO decodes to this payload, and its
        // MINMAXINFO is writable for the duration of the message.
        let info = unsafe { &mut *(lparam.0 as *mut MINMAXINFO) };
        info.ptMinTrackSize = POINT {
            x: edited.min_track_size.width,
            y: edited.min_track_size.height,
        };
        info.ptMaxTrackSize = POINT {
            x: edited.max_track_size.width,
            y: edited.max_track_size.height,
        };
    }
}

// SAFETY: wnd_proc is registered as lpfnWndProc in WNDCLASSEXW.
// Windows guarantees that hwnd, msg, wparam, and lparam are valid for the
// lifetime of this call; we must not store hwnd beyond the message handler.
unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    let shared = if msg == WM_NCCREATE {
        // SAFETY: WM_NCCREATE's lparam points to the CREATESTRUCTW whose
        // lpCreateParams is the `Shared` pointer passed to CreateWindowExW.
        let create = unsafe { &*(lparam.0 as *const CREATESTRUCTW) };
        let shared = create.lpCreateParams as *const Shared;
        // SAFETY: storing a pointer-sized value in our own window.
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, shared as isize) };
        // SAFETY: the platform is alive while it is creating a window.
        if let Some(shared) = unsafe { shared.as_ref() } {
            shared.live.borrow_mut().insert(hwnd.0 as isize);
        }
        shared
    } else {
        // SAFETY: reads the slot written above, or 0.
        unsafe { GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const Shared }
    };

    // SAFETY: the slot is cleared on WM_NCDESTROY and when the platform drops,
    // so a non-null pointer refers to a live `Shared`.
    let Some(shared) = (unsafe { shared.as_ref() }) else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };
    let Some(sink) = shared.sink() else {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    };

    trace!(hwnd = ?hwnd.0, msg = %format_args!("{msg:#06x}"), "wnd_proc");
    // SAFETY: parameters are the ones Windows handed us.
    let payload = unsafe { read_payload(msg, lparam) };
    let mut message =
        WindowMessage::new(handle_of(hwnd), msg, wparam.0, lparam.0).with_payload(payload);
    let result = sink.dispatch(&mut message);
    // SAFETY: as for `read_payload`.
    unsafe { write_payload(lparam, &message.payload) };

    if msg == WM_NCDESTROY {
        shared.live.borrow_mut().remove(&(hwnd.0 as isize));
        // SAFETY: the window is going away; detach it from `Shared`.
        unsafe { SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0) };
    }
    LRESULT(result)
}

// ── Message loop ──────────────────────────────────────────────────────────────

/// Pump messages until `WM_QUIT`.
pub fn message_loop() -> Result<()> {
    let mut msg = MSG::default();

    loop {
        // SAFETY: &mut msg is a valid MSG pointer; HWND::default() retrieves
        // messages for all windows on this thread; 0,0 filter accepts all.
        let ret = unsafe { GetMessageW(&mut msg, HWND::default(), 0, 0) };

        match ret.0 {
            -1 => return Err(last_error("GetMessageW")),
            0 => break,
            _ => unsafe {
                // SAFETY: msg was populated by a successful GetMessageW call.
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            },
        }
    }

    Ok(())
}

/// Ask the message loop to return.
pub fn post_quit() {
    // SAFETY: posts WM_QUIT to this thread's queue; always safe.
    unsafe { PostQuitMessage(0) };
}

/// Show a modal error dialog with the given message.
pub fn show_error_dialog(message: &str) {
    let text = HSTRING::from(message);
    let title = HSTRING::from("Casement: fatal error");

    // SAFETY: both strings are null-terminated and outlive the call; a null
    // owner makes the dialog top-level.
    unsafe {
        let _ = MessageBoxW(HWND::default(), &text, &title, MB_OK | MB_ICONERROR);
    }
}

// ── Error helpers ─────────────────────────────────────────────────────────────

/// Capture the current Win32 last-error code.
///
/// Call immediately after the failing function; `GetLastError` reads
/// thread-local state that any later API call can overwrite.
fn last_error(function: &'static str) -> CasementError {
    // SAFETY: GetLastError reads thread-local state set by the last Win32 call.
    let code = unsafe { GetLastError() };
    warn!(function, code = code.0, "Win32 call failed");
    CasementError::Win32 {
        function,
        code: code.0,
    }
}
