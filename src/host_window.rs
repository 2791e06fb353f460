// ── Host window ───────────────────────────────────────────────────────────────
//
// One native top-level window and the view that fills its client area.
//
// A `HostWindow` knows its own geometry constraints, its place in the
// ownership tree and how to react to the messages addressed to its handle.
// Cross-window policy (modal layers, registry, events) lives in the
// controller, which owns every `HostWindow` through its registry; the tree
// links here are all `Weak`.
//
// Everything is interior-mutable because messages re-enter while the window is
// in the middle of an operation.  No `RefCell` borrow is held across a platform
// or view call.

use std::{
    cell::{Cell, RefCell},
    rc::{Rc, Weak},
};

use tracing::{debug, trace, warn};

use crate::{
    dpi,
    error::{CasementError, Result},
    geometry::{PhysicalPoint, PhysicalSize, Point, Size},
    message::{
        loword, Payload, WindowHandle, WindowMessage, SIZE_MAXIMIZED, SIZE_MINIMIZED, WA_INACTIVE,
        WM_ACTIVATE, WM_DESTROY, WM_DPICHANGED, WM_GETMINMAXINFO, WM_MOVE, WM_NCACTIVATE,
        WM_NCCREATE, WM_NCDESTROY, WM_SIZE,
    },
    platform::{ExtendedStyle, Platform, ShowCommand, WindowStyle},
    settings::{WindowArchetype, WindowSizing, WindowState},
    view::{ViewBinding, ViewId, ViewProvider},
};

/// A native window hosting one view.
pub struct HostWindow {
    platform: Rc<dyn Platform>,
    views: Rc<dyn ViewProvider>,

    archetype: WindowArchetype,
    view_id: ViewId,
    /// Position in the controller's creation order; orders modal layers.
    creation_seq: u64,
    style: WindowStyle,
    ex_style: ExtendedStyle,

    /// Bound while the native window exists.
    handle: Cell<Option<WindowHandle>>,
    owner: RefCell<Weak<HostWindow>>,
    owned: RefCell<Vec<Weak<HostWindow>>>,
    view: RefCell<Option<ViewBinding>>,

    min_size: Cell<Option<Size>>,
    max_size: Cell<Option<Size>>,
    /// Last client size in logical units.  Kept exact while the physical size
    /// still rounds from it, so DPI changes do not drift the logical size.
    content_size: Cell<Size>,
    /// `Regular` windows only.
    state: Cell<Option<WindowState>>,
    /// Popups: offset of this window's frame from the owner's frame, in
    /// physical pixels.
    offset_from_owner: Cell<Option<PhysicalPoint>>,

    is_being_destroyed: Cell<bool>,
    /// Cleared while owned popups are being closed so the owner's caption
    /// does not flash inactive.
    redraw_non_client_as_inactive: Cell<bool>,
    quit_on_close: Cell<bool>,
}

/// Construction parameters resolved by the controller.
pub(crate) struct HostWindowParams {
    pub archetype: WindowArchetype,
    pub view_id: ViewId,
    pub creation_seq: u64,
    pub style: WindowStyle,
    pub ex_style: ExtendedStyle,
    pub sizing: WindowSizing,
}

impl HostWindow {
    pub(crate) fn new(
        platform: Rc<dyn Platform>,
        views: Rc<dyn ViewProvider>,
        params: HostWindowParams,
    ) -> Self {
        Self {
            platform,
            views,
            archetype: params.archetype,
            view_id: params.view_id,
            creation_seq: params.creation_seq,
            style: params.style,
            ex_style: params.ex_style,
            handle: Cell::new(None),
            owner: RefCell::new(Weak::new()),
            owned: RefCell::new(Vec::new()),
            view: RefCell::new(None),
            min_size: Cell::new(params.sizing.min_size),
            max_size: Cell::new(params.sizing.max_size),
            content_size: Cell::new(params.sizing.constrained_size()),
            state: Cell::new(
                (params.archetype == WindowArchetype::Regular).then_some(WindowState::Restored),
            ),
            offset_from_owner: Cell::new(None),
            is_being_destroyed: Cell::new(false),
            redraw_non_client_as_inactive: Cell::new(true),
            quit_on_close: Cell::new(false),
        }
    }

    /// Wrap a window the runner created, with its view already bound.
    pub(crate) fn adopt(
        platform: Rc<dyn Platform>,
        views: Rc<dyn ViewProvider>,
        handle: WindowHandle,
        binding: ViewBinding,
        creation_seq: u64,
    ) -> Self {
        let dpi = platform.dpi_for_window(handle);
        let client = platform.client_size(handle).unwrap_or_default();
        let state = platform.placement(handle);
        let window = Self::new(
            platform,
            views,
            HostWindowParams {
                archetype: WindowArchetype::Regular,
                view_id: binding.view_id,
                creation_seq,
                style: WindowStyle::OVERLAPPEDWINDOW,
                ex_style: ExtendedStyle::empty(),
                sizing: WindowSizing::new(dpi::to_logical(client, dpi)),
            },
        );
        window.handle.set(Some(handle));
        window.state.set(Some(state));
        *window.view.borrow_mut() = Some(binding);
        window
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn archetype(&self) -> WindowArchetype {
        self.archetype
    }

    pub fn view_id(&self) -> ViewId {
        self.view_id
    }

    pub(crate) fn creation_seq(&self) -> u64 {
        self.creation_seq
    }

    /// The native handle, or `None` before creation and after destruction.
    pub fn handle(&self) -> Option<WindowHandle> {
        self.handle.get()
    }

    pub(crate) fn bind_handle(&self, handle: WindowHandle) {
        self.handle.set(Some(handle));
    }

    fn live_handle(&self) -> Result<WindowHandle> {
        self.handle
            .get()
            .ok_or(CasementError::UnknownView(self.view_id))
    }

    pub fn owner(&self) -> Option<Rc<HostWindow>> {
        self.owner.borrow().upgrade()
    }

    /// Live owned windows in creation order.
    pub fn owned_windows(&self) -> Vec<Rc<HostWindow>> {
        let mut owned: Vec<Rc<HostWindow>> =
            self.owned.borrow().iter().filter_map(Weak::upgrade).collect();
        owned.sort_by_key(|w| w.creation_seq);
        owned
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.is_being_destroyed.get()
    }

    pub(crate) fn quit_on_close(&self) -> bool {
        self.quit_on_close.get()
    }

    pub(crate) fn set_quit_on_close(&self, quit: bool) {
        self.quit_on_close.set(quit);
    }

    pub(crate) fn has_view(&self) -> bool {
        self.view.borrow().is_some()
    }

    pub(crate) fn set_view(&self, binding: ViewBinding) {
        *self.view.borrow_mut() = Some(binding);
    }

    pub fn min_size(&self) -> Option<Size> {
        self.min_size.get()
    }

    pub fn max_size(&self) -> Option<Size> {
        self.max_size.get()
    }

    /// Client-area size in logical units.
    pub fn content_size(&self) -> Size {
        self.content_size.get()
    }

    /// Placement state.  Only `Regular` windows have one.
    pub fn state(&self) -> Result<WindowState> {
        match self.state.get() {
            Some(state) if self.archetype == WindowArchetype::Regular => Ok(state),
            _ => Err(CasementError::InvalidOperation {
                operation: "get_state",
                archetype: self.archetype,
            }),
        }
    }

    /// Offset from the owner's frame in logical units, for popups.
    pub fn relative_position(&self) -> Option<Point> {
        let offset = self.offset_from_owner.get()?;
        let factor = match self.handle.get() {
            Some(handle) => dpi::scale_factor(self.platform.dpi_for_window(handle)),
            None => 1.0,
        };
        Some(Point::new(
            f64::from(offset.x) / factor,
            f64::from(offset.y) / factor,
        ))
    }

    pub(crate) fn set_offset_from_owner(&self, offset: PhysicalPoint) {
        self.offset_from_owner.set(Some(offset));
    }

    // ── Ownership tree ────────────────────────────────────────────────────────

    /// Link `self` under `owner`.  Both directions are updated together.
    pub(crate) fn link_owner(self: &Rc<Self>, owner: &Rc<HostWindow>) {
        *self.owner.borrow_mut() = Rc::downgrade(owner);
        owner.owned.borrow_mut().push(Rc::downgrade(self));
    }

    /// Remove `self` from its owner's owned set and forget the owner.
    fn unlink_owner(&self) {
        let owner = std::mem::take(&mut *self.owner.borrow_mut());
        if let Some(owner) = owner.upgrade() {
            owner
                .owned
                .borrow_mut()
                .retain(|w| w.upgrade().is_some_and(|w| !std::ptr::eq(&*w, self)));
        }
    }

    /// `true` when `candidate` is `self` or appears in `self`'s owner chain.
    pub(crate) fn is_self_or_ancestor(&self, candidate: &HostWindow) -> bool {
        if std::ptr::eq(self, candidate) {
            return true;
        }
        let mut next = self.owner();
        while let Some(window) = next {
            if std::ptr::eq(&*window, candidate) {
                return true;
            }
            next = window.owner();
        }
        false
    }

    /// The first window, this one included, that accepts input, searching
    /// owned dialogs depth-first.  Popups are not considered.
    pub fn find_first_enabled_descendant(&self) -> Option<WindowHandle> {
        let handle = self.handle.get()?;
        if self.platform.is_window_enabled(handle) {
            return Some(handle);
        }
        self.owned_windows()
            .iter()
            .filter(|w| w.archetype != WindowArchetype::Popup)
            .find_map(|w| w.find_first_enabled_descendant())
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        if let Some(handle) = self.handle.get() {
            self.platform.enable_window(handle, enabled);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle
            .get()
            .is_some_and(|h| self.platform.is_window_enabled(h))
    }

    /// Close every owned popup.  Returns how many were closed.
    pub fn close_owned_popups(&self) -> usize {
        let popups: Vec<Rc<HostWindow>> = self
            .owned_windows()
            .into_iter()
            .filter(|w| w.archetype == WindowArchetype::Popup && !w.is_being_destroyed())
            .collect();
        if popups.is_empty() {
            return 0;
        }

        self.redraw_non_client_as_inactive.set(false);
        for popup in &popups {
            if let Some(handle) = popup.handle() {
                if let Err(e) = self.platform.destroy_window(handle) {
                    warn!(%handle, error = %e, "failed to close popup");
                }
            }
        }
        self.redraw_non_client_as_inactive.set(true);
        debug!(view_id = self.view_id, count = popups.len(), "closed owned popups");
        popups.len()
    }

    fn is_own_popup(&self, handle: WindowHandle) -> bool {
        self.owned_windows()
            .iter()
            .any(|w| w.archetype == WindowArchetype::Popup && w.handle() == Some(handle))
    }

    // ── Geometry ──────────────────────────────────────────────────────────────

    /// Resize so that the client area is `sizing.size` (clamped to the new
    /// constraints) at the current DPI.  The constraints replace the previous
    /// ones.  Native failures are logged and leave the window as it was.
    pub(crate) fn set_content_size(&self, sizing: &WindowSizing) -> Result<()> {
        sizing.validate()?;
        let handle = self.live_handle()?;
        self.min_size.set(sizing.min_size);
        self.max_size.set(sizing.max_size);

        let target = sizing.constrained_size();
        let placement = self.platform.placement(handle);
        if target == self.content_size.get() && placement == WindowState::Restored {
            return Ok(());
        }
        if placement != WindowState::Restored {
            self.platform.show_window(handle, ShowCommand::Restore);
        }

        let previous = self.content_size.replace(target);
        let dpi = self.platform.dpi_for_window(handle);
        let resized = self
            .platform
            .frame_size_for_client(dpi::to_physical(target, dpi), self.style, self.ex_style, dpi)
            .and_then(|frame| self.platform.set_window_pos(handle, None, Some(frame)));
        if let Err(e) = resized {
            warn!(%handle, error = %e, "content resize failed");
            self.content_size.set(previous);
        }
        Ok(())
    }

    pub(crate) fn set_title(&self, title: &str) -> Result<()> {
        let handle = self.live_handle()?;
        if let Err(e) = self.platform.set_title(handle, title) {
            warn!(%handle, error = %e, "failed to set title");
        }
        Ok(())
    }

    pub(crate) fn set_state(&self, state: WindowState) -> Result<()> {
        if self.archetype != WindowArchetype::Regular {
            return Err(CasementError::InvalidOperation {
                operation: "set_state",
                archetype: self.archetype,
            });
        }
        let handle = self.live_handle()?;
        self.platform.show_window(handle, ShowCommand::for_state(state));
        self.state.set(Some(self.platform.placement(handle)));
        Ok(())
    }

    /// Frame size for a logical client size at `dpi`, or `None` if the
    /// platform cannot compute it.
    fn frame_for(&self, client: Size, dpi: u32) -> Option<PhysicalSize> {
        self.platform
            .frame_size_for_client(dpi::to_physical(client, dpi), self.style, self.ex_style, dpi)
            .ok()
    }

    // ── Messages ──────────────────────────────────────────────────────────────

    /// Handle one message addressed to this window.  Always returns a valid
    /// result for the message class.
    pub fn handle_message(&self, msg: &mut WindowMessage) -> isize {
        trace!(view_id = self.view_id, message = msg.message, "host window message");
        match msg.message {
            WM_NCCREATE => {
                if let Err(e) = self.platform.enable_non_client_dpi_scaling(msg.handle) {
                    warn!(handle = %msg.handle, error = %e, "non-client DPI scaling unavailable");
                }
                self.platform.default_window_proc(msg)
            }
            WM_GETMINMAXINFO => self.on_get_min_max_info(msg),
            WM_SIZE => {
                self.on_size(msg);
                0
            }
            WM_MOVE => {
                self.reposition_owned_popups();
                0
            }
            WM_DPICHANGED => {
                self.on_dpi_changed(msg);
                0
            }
            WM_ACTIVATE => self.on_activate(msg),
            WM_NCACTIVATE => {
                if msg.wparam == 0 && !self.redraw_non_client_as_inactive.get() {
                    1
                } else {
                    self.platform.default_window_proc(msg)
                }
            }
            WM_DESTROY => {
                self.on_destroy();
                0
            }
            WM_NCDESTROY => {
                self.on_nc_destroy();
                0
            }
            _ => self.platform.default_window_proc(msg),
        }
    }

    fn on_get_min_max_info(&self, msg: &mut WindowMessage) -> isize {
        let (min, max) = (self.min_size.get(), self.max_size.get());
        if min.is_none() && max.is_none() {
            return self.platform.default_window_proc(msg);
        }
        let dpi = self.platform.dpi_for_window(msg.handle);
        if let Payload::MinMaxInfo(info) = &mut msg.payload {
            if let Some(frame) = min.and_then(|min| self.frame_for(min, dpi)) {
                info.min_track_size = frame;
            }
            if let Some(frame) = max.and_then(|max| self.frame_for(max, dpi)) {
                info.max_track_size = frame;
            }
        }
        0
    }

    fn on_size(&self, msg: &WindowMessage) {
        if self.archetype == WindowArchetype::Regular {
            self.state.set(Some(match msg.wparam {
                SIZE_MAXIMIZED => WindowState::Maximized,
                SIZE_MINIMIZED => WindowState::Minimized,
                _ => WindowState::Restored,
            }));
        }
        if msg.wparam == SIZE_MINIMIZED {
            return;
        }

        let Ok(client) = self.platform.client_size(msg.handle) else {
            return;
        };
        let dpi = self.platform.dpi_for_window(msg.handle);
        if dpi::to_physical(self.content_size.get(), dpi) != client {
            self.content_size.set(dpi::to_logical(client, dpi));
        }

        let binding = self.view.borrow().clone();
        if let Some(binding) = binding {
            self.views.resize_view(&binding, client, dpi);
        }
    }

    /// Keep the logical client size on the new monitor.  The origin comes
    /// from the suggested rectangle; the size from the logical cache, which
    /// also keeps min/max in logical units.
    fn on_dpi_changed(&self, msg: &WindowMessage) {
        let new_dpi = u32::from(loword(msg.wparam));
        let suggested = match msg.payload {
            Payload::SuggestedRect(rect) => rect,
            _ => match self.platform.window_rect(msg.handle) {
                Ok(rect) => rect,
                Err(_) => return,
            },
        };
        let frame = self
            .frame_for(self.content_size.get(), new_dpi)
            .unwrap_or_else(|| suggested.size());
        debug!(view_id = self.view_id, new_dpi, ?frame, "dpi changed");
        if let Err(e) = self
            .platform
            .set_window_pos(msg.handle, Some(suggested.origin()), Some(frame))
        {
            warn!(handle = %msg.handle, error = %e, "failed to apply DPI change");
        }
    }

    fn on_activate(&self, msg: &WindowMessage) -> isize {
        if usize::from(loword(msg.wparam)) == WA_INACTIVE {
            let activated = WindowHandle(msg.lparam);
            if self.archetype == WindowArchetype::Popup {
                // Focus leaving the popup family closes the owner's popups.
                if let Some(owner) = self.owner() {
                    if owner.handle() != Some(activated) && !owner.is_own_popup(activated) {
                        owner.close_owned_popups();
                    }
                }
            } else if !self.is_own_popup(activated) {
                self.close_owned_popups();
            }
            return self.platform.default_window_proc(msg);
        }

        match self.find_first_enabled_descendant() {
            Some(target) if Some(target) != self.handle.get() => {
                trace!(view_id = self.view_id, %target, "redirecting focus to enabled descendant");
                self.platform.set_focus(target);
                0
            }
            _ => self.platform.default_window_proc(msg),
        }
    }

    fn reposition_owned_popups(&self) {
        let Some(handle) = self.handle.get() else {
            return;
        };
        let Ok(frame) = self.platform.window_rect(handle) else {
            return;
        };
        for popup in self.owned_windows() {
            let (Some(popup_handle), Some(offset)) = (popup.handle(), popup.offset_from_owner.get())
            else {
                continue;
            };
            let origin = PhysicalPoint::new(frame.left + offset.x, frame.top + offset.y);
            if let Err(e) = self.platform.set_window_pos(popup_handle, Some(origin), None) {
                warn!(handle = %popup_handle, error = %e, "failed to move popup with owner");
            }
        }
    }

    /// Owned windows go first, newest first, then the view.
    fn on_destroy(&self) {
        if self.is_being_destroyed.replace(true) {
            return;
        }
        debug!(view_id = self.view_id, "destroying host window");
        for window in self.owned_windows().into_iter().rev() {
            let Some(handle) = window.handle() else {
                continue;
            };
            if window.is_being_destroyed() || !self.platform.is_window(handle) {
                continue;
            }
            if let Err(e) = self.platform.destroy_window(handle) {
                warn!(%handle, error = %e, "failed to destroy owned window");
            }
        }
        self.release_view();
    }

    fn on_nc_destroy(&self) {
        self.is_being_destroyed.set(true);
        self.release_view();
        self.unlink_owner();
        for window in self.owned.take().iter().filter_map(Weak::upgrade) {
            *window.owner.borrow_mut() = Weak::new();
        }
        self.handle.set(None);
    }

    fn release_view(&self) {
        let binding = self.view.borrow_mut().take();
        if let Some(binding) = binding {
            self.views.destroy_view(binding);
        }
    }

    /// Tear down without message delivery, for when the controller is gone.
    pub(crate) fn destroy_detached(&self) {
        self.is_being_destroyed.set(true);
        self.release_view();
        if let Some(handle) = self.handle.take() {
            if self.platform.is_window(handle) {
                if let Err(e) = self.platform.destroy_window(handle) {
                    warn!(%handle, error = %e, "failed to destroy window during teardown");
                }
            }
        }
        self.unlink_owner();
        self.owned.borrow_mut().clear();
    }
}

impl std::fmt::Debug for HostWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostWindow")
            .field("view_id", &self.view_id)
            .field("archetype", &self.archetype)
            .field("handle", &self.handle.get())
            .field("content_size", &self.content_size.get())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// Windows are driven through a minimal sink that routes every message of a
// handle to one `HostWindow`; tree and modal policy are covered by the
// controller tests.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::{
        message::{MessageSink, MinMaxInfo},
        platform::{headless::HeadlessPlatform, NativeWindowParams},
        view::InertViews,
    };

    #[derive(Default)]
    struct Router {
        windows: RefCell<HashMap<WindowHandle, Rc<HostWindow>>>,
        pending: RefCell<Option<Rc<HostWindow>>>,
    }

    impl MessageSink for Router {
        fn dispatch(&self, msg: &mut WindowMessage) -> isize {
            let known = self.windows.borrow().get(&msg.handle).cloned();
            let window = known.or_else(|| {
                let pending = self.pending.borrow_mut().take()?;
                pending.bind_handle(msg.handle);
                self.windows.borrow_mut().insert(msg.handle, Rc::clone(&pending));
                Some(pending)
            });
            match window {
                Some(window) => window.handle_message(msg),
                None => 0,
            }
        }
    }

    struct Fixture {
        platform: Rc<HeadlessPlatform>,
        views: Rc<InertViews>,
        router: Rc<Router>,
        next_seq: Cell<u64>,
    }

    impl Fixture {
        fn new() -> Self {
            let platform = Rc::new(HeadlessPlatform::new());
            let router = Rc::new(Router::default());
            let sink: Rc<dyn MessageSink> = router.clone();
            platform.attach(Rc::downgrade(&sink));
            Self {
                platform,
                views: Rc::new(InertViews::new()),
                router,
                next_seq: Cell::new(0),
            }
        }

        fn create(&self, archetype: WindowArchetype, sizing: WindowSizing) -> Rc<HostWindow> {
            let seq = self.next_seq.get();
            self.next_seq.set(seq + 1);
            let style = WindowStyle::OVERLAPPEDWINDOW;
            let window = Rc::new(HostWindow::new(
                self.platform.clone(),
                self.views.clone(),
                HostWindowParams {
                    archetype,
                    view_id: seq as ViewId,
                    creation_seq: seq,
                    style,
                    ex_style: ExtendedStyle::empty(),
                    sizing,
                },
            ));
            let dpi = self.platform.system_dpi();
            let frame = self
                .platform
                .frame_size_for_client(
                    dpi::to_physical(sizing.constrained_size(), dpi),
                    style,
                    ExtendedStyle::empty(),
                    dpi,
                )
                .unwrap();
            *self.router.pending.borrow_mut() = Some(window.clone());
            let handle = self
                .platform
                .create_window(&NativeWindowParams {
                    title: "test".to_owned(),
                    style,
                    ex_style: ExtendedStyle::empty(),
                    origin: Some(PhysicalPoint::new(50, 50)),
                    frame_size: frame,
                    owner: None,
                })
                .unwrap();
            let binding = self
                .views
                .create_view(window.view_id(), handle, self.platform.client_size(handle).unwrap(), dpi)
                .unwrap();
            window.set_view(binding);
            window
        }
    }

    fn sizing(w: f64, h: f64) -> WindowSizing {
        WindowSizing::new(Size::new(w, h))
    }

    #[test]
    fn nccreate_enables_non_client_dpi_scaling() {
        let fx = Fixture::new();
        let window = fx.create(WindowArchetype::Regular, sizing(800.0, 600.0));
        assert!(fx.platform.has_non_client_dpi_scaling(window.handle().unwrap()));
    }

    #[test]
    fn content_size_matches_client_area() {
        let fx = Fixture::new();
        let window = fx.create(WindowArchetype::Regular, sizing(800.0, 600.0));
        let handle = window.handle().unwrap();
        assert_eq!(window.content_size(), Size::new(800.0, 600.0));
        assert_eq!(fx.platform.client_size(handle).unwrap(), PhysicalSize::new(800, 600));
    }

    #[test]
    fn set_content_size_is_idempotent() {
        let fx = Fixture::new();
        let window = fx.create(WindowArchetype::Regular, sizing(800.0, 600.0));
        window.set_content_size(&sizing(640.0, 480.0)).unwrap();
        let sizes_before = fx.platform.handles_receiving(WM_SIZE).len();
        window.set_content_size(&sizing(640.0, 480.0)).unwrap();
        assert_eq!(fx.platform.handles_receiving(WM_SIZE).len(), sizes_before);
        assert_eq!(window.content_size(), Size::new(640.0, 480.0));
    }

    #[test]
    fn content_size_survives_dpi_changes_exactly() {
        let fx = Fixture::new();
        let window = fx.create(WindowArchetype::Regular, sizing(333.3, 250.7));
        let handle = window.handle().unwrap();
        fx.platform.move_to_dpi(handle, 144);
        assert_eq!(window.content_size(), Size::new(333.3, 250.7));
        fx.platform.move_to_dpi(handle, 120);
        assert_eq!(window.content_size(), Size::new(333.3, 250.7));
        assert_eq!(fx.platform.client_size(handle).unwrap(), PhysicalSize::new(417, 313));
        assert_eq!(fx.views.metrics(window.view_id()), Some((PhysicalSize::new(417, 313), 120)));
    }

    #[test]
    fn min_max_constraints_reach_the_tracking_sizes() {
        let fx = Fixture::new();
        let window = fx.create(
            WindowArchetype::Regular,
            sizing(400.0, 300.0)
                .with_min(Size::new(200.0, 100.0))
                .with_max(Size::new(1000.0, 800.0)),
        );
        let handle = window.handle().unwrap();
        let tracking = || {
            let mut msg = WindowMessage::new(handle, WM_GETMINMAXINFO, 0, 0).with_payload(
                Payload::MinMaxInfo(MinMaxInfo {
                    min_track_size: PhysicalSize::new(1, 1),
                    max_track_size: PhysicalSize::new(9999, 9999),
                }),
            );
            assert_eq!(window.handle_message(&mut msg), 0);
            let Payload::MinMaxInfo(info) = msg.payload else {
                panic!("payload replaced");
            };
            (info.min_track_size, info.max_track_size)
        };

        // 8px borders, 31px top at 96 DPI.
        assert_eq!(
            tracking(),
            (PhysicalSize::new(216, 139), PhysicalSize::new(1016, 839))
        );

        // The logical limits follow the window: 16px borders, 62px top at 192 DPI.
        fx.platform.move_to_dpi(handle, 192);
        assert_eq!(
            tracking(),
            (PhysicalSize::new(432, 278), PhysicalSize::new(2032, 1678))
        );
        assert_eq!(window.content_size(), Size::new(400.0, 300.0));
    }

    #[test]
    fn resize_requests_are_clamped_by_constraints() {
        let fx = Fixture::new();
        let window = fx.create(
            WindowArchetype::Regular,
            sizing(400.0, 300.0).with_max(Size::new(500.0, 500.0)),
        );
        let handle = window.handle().unwrap();
        fx.platform
            .set_window_pos(handle, None, Some(PhysicalSize::new(2000, 2000)))
            .unwrap();
        assert_eq!(window.content_size(), Size::new(500.0, 500.0));
    }

    #[test]
    fn state_tracks_size_messages() {
        let fx = Fixture::new();
        let window = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        window.set_state(WindowState::Maximized).unwrap();
        assert_eq!(window.state().unwrap(), WindowState::Maximized);
        window.set_state(WindowState::Minimized).unwrap();
        assert_eq!(window.state().unwrap(), WindowState::Minimized);
        window.set_state(WindowState::Restored).unwrap();
        assert_eq!(window.state().unwrap(), WindowState::Restored);
        assert_eq!(window.content_size(), Size::new(400.0, 300.0));
    }

    #[test]
    fn dialogs_have_no_state() {
        let fx = Fixture::new();
        let dialog = fx.create(WindowArchetype::Dialog, sizing(300.0, 200.0));
        let err = dialog.state().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidOperation);
        assert!(dialog.set_state(WindowState::Maximized).is_err());
    }

    #[test]
    fn destroy_cascades_to_owned_and_unlinks() {
        let fx = Fixture::new();
        let owner = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        let dialog = fx.create(WindowArchetype::Dialog, sizing(200.0, 100.0));
        dialog.link_owner(&owner);
        assert_eq!(owner.owned_windows().len(), 1);
        assert!(Rc::ptr_eq(&dialog.owner().unwrap(), &owner));

        let dialog_handle = dialog.handle().unwrap();
        fx.platform.destroy_window(owner.handle().unwrap()).unwrap();
        assert!(!fx.platform.is_window(dialog_handle));
        assert!(owner.handle().is_none());
        assert!(dialog.handle().is_none());
        assert!(dialog.owner().is_none());
        assert_eq!(fx.views.live_count(), 0);
        assert_eq!(fx.views.destroyed(), vec![dialog.view_id(), owner.view_id()]);
    }

    #[test]
    fn deactivation_closes_popups_unless_a_popup_takes_focus() {
        let fx = Fixture::new();
        let owner = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        let popup = fx.create(WindowArchetype::Popup, sizing(100.0, 50.0));
        popup.link_owner(&owner);
        let other = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));

        fx.platform.set_focus(owner.handle().unwrap());
        fx.platform.simulate_click(popup.handle().unwrap());
        assert!(popup.handle().is_some());

        fx.platform.set_focus(owner.handle().unwrap());
        fx.platform.simulate_click(other.handle().unwrap());
        assert!(popup.handle().is_none());
        assert!(owner.owned_windows().is_empty());
    }

    #[test]
    fn owner_move_carries_popups() {
        let fx = Fixture::new();
        let owner = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        let popup = fx.create(WindowArchetype::Popup, sizing(100.0, 50.0));
        popup.link_owner(&owner);
        popup.set_offset_from_owner(PhysicalPoint::new(20, 40));

        let owner_handle = owner.handle().unwrap();
        fx.platform
            .set_window_pos(owner_handle, Some(PhysicalPoint::new(300, 200)), None)
            .unwrap();
        let popup_rect = fx.platform.window_rect(popup.handle().unwrap()).unwrap();
        assert_eq!(popup_rect.origin(), PhysicalPoint::new(320, 240));
        assert_eq!(popup.relative_position(), Some(Point::new(20.0, 40.0)));
    }

    #[test]
    fn non_client_inactive_redraw_is_suppressed_while_closing_popups() {
        let fx = Fixture::new();
        let owner = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        let handle = owner.handle().unwrap();
        owner.redraw_non_client_as_inactive.set(false);
        let mut msg = WindowMessage::new(handle, WM_NCACTIVATE, 0, 0);
        assert_eq!(owner.handle_message(&mut msg), 1);
        owner.redraw_non_client_as_inactive.set(true);
        assert_eq!(owner.handle_message(&mut msg), 1);
    }

    #[test]
    fn ownership_chain_detects_ancestors() {
        let fx = Fixture::new();
        let root = fx.create(WindowArchetype::Regular, sizing(400.0, 300.0));
        let child = fx.create(WindowArchetype::Dialog, sizing(200.0, 100.0));
        child.link_owner(&root);
        assert!(child.is_self_or_ancestor(&root));
        assert!(child.is_self_or_ancestor(&child));
        assert!(!root.is_self_or_ancestor(&child));
    }
}
