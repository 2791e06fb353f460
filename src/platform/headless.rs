// ── Headless platform ─────────────────────────────────────────────────────────
//
// An in-process stand-in for the Win32 window manager.  It keeps rectangles,
// placement, enablement, activation and per-window DPI, and delivers the same
// messages Win32 would, synchronously and re-entrantly, to the attached sink.
//
// Differences from Win32 that callers may rely on:
//   • Owned windows are not destroyed implicitly with their owner; child
//     content windows (see `set_parent`) are.
//   • `request_close` delivers `WM_CLOSE` immediately instead of posting it.
//   • Frames are a fixed 8px border plus a 23px caption at 96 DPI.
//
// No `unsafe`.  State borrows never span a dispatch.

use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::Weak,
};

use tracing::{trace, warn};

use crate::{
    dpi,
    error::{CasementError, Result},
    geometry::{PhysicalPoint, PhysicalRect, PhysicalSize},
    message::{
        make_lparam, MessageSink, MinMaxInfo, Payload, WindowHandle, WindowMessage, SIZE_MAXIMIZED,
        SIZE_MINIMIZED, SIZE_RESTORED, WA_ACTIVE, WA_CLICKACTIVE, WA_INACTIVE, WM_ACTIVATE,
        WM_CLOSE, WM_CREATE, WM_DESTROY, WM_DPICHANGED, WM_ENABLE, WM_GETMINMAXINFO, WM_MOVE,
        WM_NCACTIVATE, WM_NCCREATE, WM_NCDESTROY, WM_SIZE,
    },
    platform::{ExtendedStyle, NativeWindowParams, Platform, ShowCommand, WindowStyle},
    settings::WindowState,
};

// Win32 error codes reported by the emulation.
const ERROR_NOT_ENOUGH_MEMORY: u32 = 8;
const ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;
const ERROR_CANNOT_FIND_WND_CLASS: u32 = 1407;

/// Frame border and caption height at 96 DPI.
const BORDER: i32 = 8;
const CAPTION: i32 = 23;

/// Largest frame extent offered in `WM_GETMINMAXINFO`.
const MAX_TRACK: i32 = 32_767;

/// Cascade step for windows created without an explicit origin.
const CASCADE: i32 = 32;

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct NativeWindow {
    title: String,
    style: WindowStyle,
    owner: Option<WindowHandle>,
    parent: Option<WindowHandle>,
    rect: PhysicalRect,
    restored_rect: PhysicalRect,
    placement: WindowState,
    enabled: bool,
    visible: bool,
    dpi: u32,
    destroying: bool,
    non_client_dpi_scaling: bool,
}

impl NativeWindow {
    /// (left, top, right, bottom) frame thickness.
    fn insets(&self) -> (i32, i32, i32, i32) {
        frame_insets(self.style, self.dpi)
    }

    fn client_size(&self) -> PhysicalSize {
        if self.placement == WindowState::Minimized {
            return PhysicalSize::default();
        }
        let (l, t, r, b) = self.insets();
        let frame = self.rect.size();
        PhysicalSize::new(
            (frame.width - l - r).max(0),
            (frame.height - t - b).max(0),
        )
    }

    fn client_origin(&self) -> PhysicalPoint {
        let (l, t, _, _) = self.insets();
        PhysicalPoint::new(self.rect.left + l, self.rect.top + t)
    }
}

fn frame_insets(style: WindowStyle, dpi: u32) -> (i32, i32, i32, i32) {
    if style.has_frame() {
        let border = dpi::scale(BORDER, dpi);
        (border, border + dpi::scale(CAPTION, dpi), border, border)
    } else {
        (0, 0, 0, 0)
    }
}

#[derive(Debug)]
struct State {
    next_handle: isize,
    windows: BTreeMap<WindowHandle, NativeWindow>,
    active: Option<WindowHandle>,
    system_dpi: u32,
    work_area: PhysicalRect,
    next_origin: PhysicalPoint,
    fail_next_create: bool,
    log: Vec<(WindowHandle, u32)>,
}

impl State {
    fn live(&self, handle: WindowHandle) -> Result<&NativeWindow> {
        self.windows
            .get(&handle)
            .ok_or_else(|| invalid_handle("headless"))
    }

    fn live_mut(&mut self, handle: WindowHandle) -> Result<&mut NativeWindow> {
        self.windows
            .get_mut(&handle)
            .ok_or_else(|| invalid_handle("headless"))
    }

    fn cascade_origin(&mut self) -> PhysicalPoint {
        let origin = self.next_origin;
        self.next_origin = PhysicalPoint::new(origin.x + CASCADE, origin.y + CASCADE);
        if self.next_origin.y > self.work_area.bottom / 2 {
            self.next_origin = PhysicalPoint::new(self.work_area.left + CASCADE, self.work_area.top + CASCADE);
        }
        origin
    }
}

fn invalid_handle(function: &'static str) -> CasementError {
    CasementError::Win32 {
        function,
        code: ERROR_INVALID_WINDOW_HANDLE,
    }
}

// ── HeadlessPlatform ──────────────────────────────────────────────────────────

/// In-process window manager emulation.
pub struct HeadlessPlatform {
    state: RefCell<State>,
    sink: RefCell<Option<Weak<dyn MessageSink>>>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// A single 1920×1080 monitor at 96 DPI with a 40px taskbar.
    pub fn new() -> Self {
        Self::with_system_dpi(dpi::BASE_DPI)
    }

    pub fn with_system_dpi(system_dpi: u32) -> Self {
        Self {
            state: RefCell::new(State {
                next_handle: 0x1_0000,
                windows: BTreeMap::new(),
                active: None,
                system_dpi,
                work_area: PhysicalRect::new(0, 0, 1920, 1040),
                next_origin: PhysicalPoint::new(CASCADE, CASCADE),
                fail_next_create: false,
                log: Vec::new(),
            }),
            sink: RefCell::new(None),
        }
    }

    // ── Test hooks ────────────────────────────────────────────────────────────

    /// Make the next `create_window` fail as if the system were out of memory.
    pub fn fail_next_create(&self) {
        self.state.borrow_mut().fail_next_create = true;
    }

    /// Activate `handle` as a mouse click would, even if it is disabled.
    pub fn simulate_click(&self, handle: WindowHandle) {
        self.activate(handle, WA_CLICKACTIVE);
    }

    /// Move `handle` to a monitor with `new_dpi`, delivering `WM_DPICHANGED`
    /// with a suggested rectangle scaled from the current one.
    pub fn move_to_dpi(&self, handle: WindowHandle, new_dpi: u32) {
        let suggested = {
            let mut st = self.state.borrow_mut();
            let Ok(window) = st.live_mut(handle) else {
                return;
            };
            if window.dpi == new_dpi {
                return;
            }
            let old = window.rect;
            let size = old.size();
            let factor = f64::from(new_dpi) / f64::from(window.dpi);
            window.dpi = new_dpi;
            PhysicalRect::from_origin_size(
                old.origin(),
                PhysicalSize::new(
                    (f64::from(size.width) * factor).round() as i32,
                    (f64::from(size.height) * factor).round() as i32,
                ),
            )
        };
        let wparam = (new_dpi as usize) | ((new_dpi as usize) << 16);
        let mut msg = WindowMessage::new(handle, WM_DPICHANGED, wparam, 0)
            .with_payload(Payload::SuggestedRect(suggested));
        self.dispatch(&mut msg);
    }

    pub fn active_window(&self) -> Option<WindowHandle> {
        self.state.borrow().active
    }

    pub fn is_visible(&self, handle: WindowHandle) -> bool {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .is_some_and(|w| w.visible)
    }

    pub fn title(&self, handle: WindowHandle) -> Option<String> {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .map(|w| w.title.clone())
    }

    pub fn parent_of(&self, handle: WindowHandle) -> Option<WindowHandle> {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .and_then(|w| w.parent)
    }

    pub fn has_non_client_dpi_scaling(&self, handle: WindowHandle) -> bool {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .is_some_and(|w| w.non_client_dpi_scaling)
    }

    /// Number of native windows that exist, content children included.
    pub fn window_count(&self) -> usize {
        self.state.borrow().windows.len()
    }

    /// Every message delivered so far, in order.
    pub fn message_log(&self) -> Vec<(WindowHandle, u32)> {
        self.state.borrow().log.clone()
    }

    /// Messages of one kind, in delivery order.
    pub fn handles_receiving(&self, message: u32) -> Vec<WindowHandle> {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|&&(_, m)| m == message)
            .map(|&(h, _)| h)
            .collect()
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    fn dispatch(&self, msg: &mut WindowMessage) -> isize {
        self.state.borrow_mut().log.push((msg.handle, msg.message));
        trace!(handle = %msg.handle, message = msg.message, "headless dispatch");
        let sink = self.sink.borrow().as_ref().and_then(Weak::upgrade);
        match sink {
            Some(sink) => sink.dispatch(msg),
            None => self.default_window_proc(msg),
        }
    }

    fn send(&self, handle: WindowHandle, message: u32, wparam: usize, lparam: isize) -> isize {
        let mut msg = WindowMessage::new(handle, message, wparam, lparam);
        self.dispatch(&mut msg)
    }

    fn send_size(&self, handle: WindowHandle) {
        let Some((placement, client)) = self
            .state
            .borrow()
            .windows
            .get(&handle)
            .map(|w| (w.placement, w.client_size()))
        else {
            return;
        };
        let kind = match placement {
            WindowState::Restored => SIZE_RESTORED,
            WindowState::Maximized => SIZE_MAXIMIZED,
            WindowState::Minimized => SIZE_MINIMIZED,
        };
        self.send(handle, WM_SIZE, kind, make_lparam(client.width, client.height));
    }

    fn send_move(&self, handle: WindowHandle) {
        let Some(origin) = self
            .state
            .borrow()
            .windows
            .get(&handle)
            .map(NativeWindow::client_origin)
        else {
            return;
        };
        self.send(handle, WM_MOVE, 0, make_lparam(origin.x, origin.y));
    }

    /// Make `handle` the active window, notifying the previous one.
    fn activate(&self, handle: WindowHandle, how: usize) {
        let previous = {
            let mut st = self.state.borrow_mut();
            match st.windows.get(&handle) {
                Some(w) if !w.destroying => {}
                _ => return,
            }
            if st.active == Some(handle) {
                return;
            }
            st.active.replace(handle)
        };
        if let Some(previous) = previous.filter(|&p| self.is_window(p)) {
            self.send(previous, WM_NCACTIVATE, 0, handle.0);
            self.send(previous, WM_ACTIVATE, WA_INACTIVE, handle.0);
        }
        // A nested activation may already have moved focus elsewhere.
        if self.state.borrow().active != Some(handle) {
            return;
        }
        self.send(handle, WM_NCACTIVATE, 1, 0);
        self.send(handle, WM_ACTIVATE, how, previous.map_or(0, |p| p.0));
    }

    fn deactivate(&self, handle: WindowHandle) {
        let was_active = {
            let mut st = self.state.borrow_mut();
            if st.active == Some(handle) {
                st.active = None;
                true
            } else {
                false
            }
        };
        if was_active {
            self.send(handle, WM_NCACTIVATE, 0, 0);
            self.send(handle, WM_ACTIVATE, WA_INACTIVE, 0);
        }
    }

    /// Tear down a window whose `WM_DESTROY` has been delivered.
    fn finish_destroy(&self, handle: WindowHandle) {
        let children: Vec<WindowHandle> = self
            .state
            .borrow()
            .windows
            .iter()
            .filter(|(_, w)| w.parent == Some(handle))
            .map(|(&h, _)| h)
            .collect();
        for child in children {
            if let Err(e) = self.destroy_window(child) {
                warn!(%child, error = %e, "failed to destroy child window");
            }
        }
        self.send(handle, WM_NCDESTROY, 0, 0);
        self.state.borrow_mut().windows.remove(&handle);
    }
}

// ── Platform ──────────────────────────────────────────────────────────────────

impl Platform for HeadlessPlatform {
    fn attach(&self, sink: Weak<dyn MessageSink>) {
        *self.sink.borrow_mut() = Some(sink);
    }

    fn create_window(&self, params: &NativeWindowParams) -> Result<WindowHandle> {
        let (handle, origin) = {
            let mut st = self.state.borrow_mut();
            if std::mem::take(&mut st.fail_next_create) {
                return Err(CasementError::Win32 {
                    function: "CreateWindowExW",
                    code: ERROR_NOT_ENOUGH_MEMORY,
                });
            }
            let dpi = match params.owner {
                Some(owner) => st.live(owner).map_err(|_| invalid_handle("CreateWindowExW"))?.dpi,
                None => st.system_dpi,
            };
            let origin = match params.origin {
                Some(origin) => origin,
                None => st.cascade_origin(),
            };
            let handle = WindowHandle(st.next_handle);
            st.next_handle += 0x10;
            let rect = PhysicalRect::from_origin_size(origin, params.frame_size);
            st.windows.insert(
                handle,
                NativeWindow {
                    title: params.title.clone(),
                    style: params.style,
                    owner: params.owner,
                    parent: None,
                    rect,
                    restored_rect: rect,
                    placement: WindowState::Restored,
                    enabled: true,
                    visible: false,
                    dpi,
                    destroying: false,
                    non_client_dpi_scaling: false,
                },
            );
            (handle, origin)
        };

        if self.send(handle, WM_NCCREATE, 0, 0) == 0 {
            self.finish_destroy(handle);
            return Err(CasementError::Win32 {
                function: "CreateWindowExW",
                code: ERROR_CANNOT_FIND_WND_CLASS,
            });
        }
        if self.send(handle, WM_CREATE, 0, 0) == -1 {
            if let Err(e) = self.destroy_window(handle) {
                warn!(%handle, error = %e, "failed to destroy rejected window");
            }
            return Err(CasementError::Creation {
                reason: "WM_CREATE rejected the window".to_owned(),
            });
        }
        self.send_size(handle);
        self.send_move(handle);
        trace!(%handle, x = origin.x, y = origin.y, "headless window created");
        Ok(handle)
    }

    fn destroy_window(&self, handle: WindowHandle) -> Result<()> {
        {
            let mut st = self.state.borrow_mut();
            let window = st.live_mut(handle).map_err(|_| invalid_handle("DestroyWindow"))?;
            if window.destroying {
                return Ok(());
            }
            window.destroying = true;
            window.visible = false;
        }
        let owner = self.owner_of(handle);
        let was_active = {
            let mut st = self.state.borrow_mut();
            let was_active = st.active == Some(handle);
            if was_active {
                st.active = None;
            }
            was_active
        };

        self.send(handle, WM_DESTROY, 0, 0);
        self.finish_destroy(handle);

        // Activation falls back to the owner, as Win32 does.
        if was_active {
            if let Some(owner) = owner.filter(|&o| self.is_window(o)) {
                self.activate(owner, WA_ACTIVE);
            }
        }
        Ok(())
    }

    fn request_close(&self, handle: WindowHandle) -> Result<()> {
        if !self.is_window(handle) {
            return Err(invalid_handle("PostMessageW"));
        }
        self.send(handle, WM_CLOSE, 0, 0);
        Ok(())
    }

    fn is_window(&self, handle: WindowHandle) -> bool {
        self.state.borrow().windows.contains_key(&handle)
    }

    fn default_window_proc(&self, msg: &WindowMessage) -> isize {
        match msg.message {
            WM_NCCREATE | WM_NCACTIVATE => 1,
            WM_CLOSE => {
                if let Err(e) = self.destroy_window(msg.handle) {
                    warn!(handle = %msg.handle, error = %e, "WM_CLOSE could not destroy the window");
                }
                0
            }
            _ => 0,
        }
    }

    fn enable_non_client_dpi_scaling(&self, handle: WindowHandle) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.live_mut(handle)
            .map_err(|_| invalid_handle("EnableNonClientDpiScaling"))?
            .non_client_dpi_scaling = true;
        Ok(())
    }

    fn system_dpi(&self) -> u32 {
        self.state.borrow().system_dpi
    }

    fn dpi_for_window(&self, handle: WindowHandle) -> u32 {
        let st = self.state.borrow();
        st.windows.get(&handle).map_or(st.system_dpi, |w| w.dpi)
    }

    fn frame_size_for_client(
        &self,
        client: PhysicalSize,
        style: WindowStyle,
        _ex_style: ExtendedStyle,
        dpi: u32,
    ) -> Result<PhysicalSize> {
        let (l, t, r, b) = frame_insets(style, dpi);
        Ok(PhysicalSize::new(
            client.width.saturating_add(l + r),
            client.height.saturating_add(t + b),
        ))
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<PhysicalRect> {
        Ok(self.state.borrow().live(handle)?.rect)
    }

    fn client_size(&self, handle: WindowHandle) -> Result<PhysicalSize> {
        Ok(self.state.borrow().live(handle)?.client_size())
    }

    fn client_origin(&self, handle: WindowHandle) -> Result<PhysicalPoint> {
        Ok(self.state.borrow().live(handle)?.client_origin())
    }

    fn work_area(&self, handle: WindowHandle) -> Result<PhysicalRect> {
        let st = self.state.borrow();
        st.live(handle)?;
        Ok(st.work_area)
    }

    fn set_window_pos(
        &self,
        handle: WindowHandle,
        origin: Option<PhysicalPoint>,
        frame_size: Option<PhysicalSize>,
    ) -> Result<()> {
        let old = self.window_rect(handle).map_err(|_| invalid_handle("SetWindowPos"))?;

        let mut size = old.size();
        if let Some(requested) = frame_size {
            let mut msg = WindowMessage::new(handle, WM_GETMINMAXINFO, 0, 0).with_payload(
                Payload::MinMaxInfo(MinMaxInfo {
                    min_track_size: PhysicalSize::new(1, 1),
                    max_track_size: PhysicalSize::new(MAX_TRACK, MAX_TRACK),
                }),
            );
            self.dispatch(&mut msg);
            size = requested;
            if let Payload::MinMaxInfo(info) = msg.payload {
                size.width = size
                    .width
                    .clamp(info.min_track_size.width, info.max_track_size.width.max(info.min_track_size.width));
                size.height = size
                    .height
                    .clamp(info.min_track_size.height, info.max_track_size.height.max(info.min_track_size.height));
            }
        }
        let origin = origin.unwrap_or(old.origin());
        let rect = PhysicalRect::from_origin_size(origin, size);
        {
            let mut st = self.state.borrow_mut();
            let window = st.live_mut(handle).map_err(|_| invalid_handle("SetWindowPos"))?;
            window.rect = rect;
            if window.placement == WindowState::Restored {
                window.restored_rect = rect;
            }
        }
        if rect.origin() != old.origin() {
            self.send_move(handle);
        }
        if rect.size() != old.size() {
            self.send_size(handle);
        }
        Ok(())
    }

    fn show_window(&self, handle: WindowHandle, command: ShowCommand) {
        let (placement, work_area) = {
            let st = self.state.borrow();
            match st.windows.get(&handle) {
                Some(w) => (w.placement, st.work_area),
                None => return,
            }
        };
        let update = |f: &dyn Fn(&mut NativeWindow)| {
            if let Some(w) = self.state.borrow_mut().windows.get_mut(&handle) {
                f(w);
            }
        };
        match command {
            ShowCommand::Hide => {
                update(&|w| w.visible = false);
                self.deactivate(handle);
            }
            ShowCommand::NoActivate => update(&|w| w.visible = true),
            ShowCommand::Normal | ShowCommand::Restore => {
                update(&|w| {
                    w.visible = true;
                    if w.placement != WindowState::Restored {
                        w.placement = WindowState::Restored;
                        w.rect = w.restored_rect;
                    }
                });
                if placement != WindowState::Restored {
                    self.send_size(handle);
                }
                self.activate(handle, WA_ACTIVE);
            }
            ShowCommand::Maximize => {
                update(&|w| {
                    if w.placement == WindowState::Restored {
                        w.restored_rect = w.rect;
                    }
                    w.visible = true;
                    w.placement = WindowState::Maximized;
                    // The frame hangs past the work area so the client fills it.
                    let (l, t, r, b) = w.insets();
                    w.rect = PhysicalRect::new(
                        work_area.left - l,
                        work_area.top - t,
                        work_area.right + r,
                        work_area.bottom + b,
                    );
                });
                if placement != WindowState::Maximized {
                    self.send_size(handle);
                }
                self.activate(handle, WA_ACTIVE);
            }
            ShowCommand::Minimize => {
                update(&|w| {
                    if w.placement == WindowState::Restored {
                        w.restored_rect = w.rect;
                    }
                    w.visible = true;
                    w.placement = WindowState::Minimized;
                });
                if placement != WindowState::Minimized {
                    self.send_size(handle);
                }
                self.deactivate(handle);
            }
        }
    }

    fn placement(&self, handle: WindowHandle) -> WindowState {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .map_or(WindowState::Restored, |w| w.placement)
    }

    fn enable_window(&self, handle: WindowHandle, enabled: bool) {
        let changed = {
            let mut st = self.state.borrow_mut();
            match st.windows.get_mut(&handle) {
                Some(w) if w.enabled != enabled => {
                    w.enabled = enabled;
                    true
                }
                _ => false,
            }
        };
        if changed {
            self.send(handle, WM_ENABLE, usize::from(enabled), 0);
        }
    }

    fn is_window_enabled(&self, handle: WindowHandle) -> bool {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .is_some_and(|w| w.enabled)
    }

    fn set_focus(&self, handle: WindowHandle) {
        self.activate(handle, WA_ACTIVE);
    }

    fn owner_of(&self, handle: WindowHandle) -> Option<WindowHandle> {
        self.state
            .borrow()
            .windows
            .get(&handle)
            .and_then(|w| w.owner)
    }

    fn set_title(&self, handle: WindowHandle, title: &str) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.live_mut(handle)
            .map_err(|_| invalid_handle("SetWindowTextW"))?
            .title = title.to_owned();
        Ok(())
    }

    fn set_parent(&self, child: WindowHandle, parent: WindowHandle) -> Result<()> {
        let mut st = self.state.borrow_mut();
        st.live(parent).map_err(|_| invalid_handle("SetParent"))?;
        st.live_mut(child)
            .map_err(|_| invalid_handle("SetParent"))?
            .parent = Some(parent);
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    /// Records every message and defers to the default procedure.
    struct Recorder {
        platform: Rc<HeadlessPlatform>,
        seen: RefCell<Vec<u32>>,
    }

    impl MessageSink for Recorder {
        fn dispatch(&self, msg: &mut WindowMessage) -> isize {
            self.seen.borrow_mut().push(msg.message);
            self.platform.default_window_proc(msg)
        }
    }

    fn attached() -> (Rc<HeadlessPlatform>, Rc<Recorder>) {
        let platform = Rc::new(HeadlessPlatform::new());
        let recorder = Rc::new(Recorder {
            platform: Rc::clone(&platform),
            seen: RefCell::new(Vec::new()),
        });
        let sink: Rc<dyn MessageSink> = recorder.clone();
        platform.attach(Rc::downgrade(&sink));
        (platform, recorder)
    }

    fn params(frame: PhysicalSize) -> NativeWindowParams {
        NativeWindowParams {
            title: "t".to_owned(),
            style: WindowStyle::OVERLAPPEDWINDOW,
            ex_style: ExtendedStyle::empty(),
            origin: Some(PhysicalPoint::new(100, 100)),
            frame_size: frame,
            owner: None,
        }
    }

    #[test]
    fn creation_sends_nccreate_first() {
        let (platform, recorder) = attached();
        platform.create_window(&params(PhysicalSize::new(416, 339))).unwrap();
        let seen = recorder.seen.borrow();
        assert_eq!(seen[0], WM_NCCREATE);
        assert_eq!(seen[1], WM_CREATE);
        assert!(seen.contains(&WM_SIZE));
    }

    #[test]
    fn client_area_excludes_frame() {
        let (platform, _) = attached();
        let client = PhysicalSize::new(400, 300);
        let frame = platform
            .frame_size_for_client(client, WindowStyle::OVERLAPPEDWINDOW, ExtendedStyle::empty(), 96)
            .unwrap();
        let h = platform.create_window(&params(frame)).unwrap();
        assert_eq!(platform.client_size(h).unwrap(), client);
        assert_eq!(platform.client_origin(h).unwrap(), PhysicalPoint::new(108, 131));
    }

    #[test]
    fn frame_for_an_oversized_client_saturates() {
        let (platform, _) = attached();
        let frame = platform
            .frame_size_for_client(
                PhysicalSize::new(i32::MAX, 300),
                WindowStyle::OVERLAPPEDWINDOW,
                ExtendedStyle::empty(),
                96,
            )
            .unwrap();
        assert_eq!(frame, PhysicalSize::new(i32::MAX, 339));
        let h = platform.create_window(&params(frame)).unwrap();
        assert_eq!(platform.window_rect(h).unwrap().right, i32::MAX);
    }

    #[test]
    fn close_destroys_through_default_proc() {
        let (platform, recorder) = attached();
        let h = platform.create_window(&params(PhysicalSize::new(100, 100))).unwrap();
        platform.request_close(h).unwrap();
        assert!(!platform.is_window(h));
        let seen = recorder.seen.borrow();
        let tail: Vec<u32> = seen.iter().rev().take(3).rev().copied().collect();
        assert_eq!(tail, vec![WM_CLOSE, WM_DESTROY, WM_NCDESTROY]);
    }

    #[test]
    fn failed_creation_leaves_nothing_behind() {
        let (platform, _) = attached();
        platform.fail_next_create();
        assert!(platform.create_window(&params(PhysicalSize::new(1, 1))).is_err());
        assert_eq!(platform.window_count(), 0);
    }

    #[test]
    fn maximize_and_restore_round_trip_the_rect() {
        let (platform, _) = attached();
        let h = platform.create_window(&params(PhysicalSize::new(416, 339))).unwrap();
        let before = platform.window_rect(h).unwrap();
        platform.show_window(h, ShowCommand::Maximize);
        assert_eq!(platform.placement(h), WindowState::Maximized);
        assert_eq!(platform.client_size(h).unwrap(), PhysicalSize::new(1920, 1040));
        platform.show_window(h, ShowCommand::Restore);
        assert_eq!(platform.placement(h), WindowState::Restored);
        assert_eq!(platform.window_rect(h).unwrap(), before);
    }

    #[test]
    fn activation_notifies_both_windows() {
        let (platform, recorder) = attached();
        let a = platform.create_window(&params(PhysicalSize::new(100, 100))).unwrap();
        let b = platform.create_window(&params(PhysicalSize::new(100, 100))).unwrap();
        platform.set_focus(a);
        recorder.seen.borrow_mut().clear();
        platform.simulate_click(b);
        assert_eq!(platform.active_window(), Some(b));
        assert_eq!(
            *recorder.seen.borrow(),
            vec![WM_NCACTIVATE, WM_ACTIVATE, WM_NCACTIVATE, WM_ACTIVATE]
        );
    }
}
