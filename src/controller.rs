// ── Window controller ─────────────────────────────────────────────────────────
//
// The registry of every live `HostWindow` and the single entry point for
// creating, querying and mutating them.  The controller is the platform's
// `MessageSink`: every message of a tracked window passes through `dispatch`,
// which runs the embedder's callback, keeps the registry and modal layers in
// step with native lifecycle, and hands the rest to the window.
//
// Registration happens on `WM_NCCREATE`, before `create_window` returns, so
// re-entrant setup messages already resolve to the new window.  Entries are
// removed on `WM_NCDESTROY` and nowhere else, except on controller teardown.

use std::{
    cell::{Cell, RefCell},
    cmp::Reverse,
    collections::HashMap,
    rc::Rc,
};

use tracing::{debug, info, warn};

use crate::{
    config::HostConfig,
    dpi,
    error::{CasementError, Result},
    geometry::{PhysicalPoint, PhysicalRect, PhysicalSize, Point, Rect, Size},
    host_window::{HostWindow, HostWindowParams},
    message::{
        is_lifecycle, MessageSink, WindowHandle, WindowMessage, WindowsMessage, WM_NCCREATE,
        WM_NCDESTROY, WM_SIZE,
    },
    platform::{ExtendedStyle, NativeWindowParams, Platform, ShowCommand, WindowStyle},
    positioner::{place_window, WindowPositioner},
    settings::{
        WindowArchetype, WindowCreationSettings, WindowMetadata, WindowModificationSettings,
        WindowSizing, WindowState,
    },
    view::{ViewBinding, ViewId, ViewProvider},
};

/// Notifications about tracked windows.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    /// The client area changed size.  `relative_position` is set for popups.
    Changed {
        view_id: ViewId,
        size: Size,
        relative_position: Option<Point>,
    },
    Destroyed { view_id: ViewId },
}

/// Observes every message of every tracked window before the host does.
pub type MessageCallback = Rc<dyn Fn(&mut WindowsMessage)>;

pub type EventListener = Rc<dyn Fn(&WindowEvent)>;

/// Owner of the window forest.
pub struct HostWindowController {
    platform: Rc<dyn Platform>,
    views: Rc<dyn ViewProvider>,
    config: HostConfig,

    windows: RefCell<HashMap<WindowHandle, Rc<HostWindow>>>,
    /// The window whose native creation is in flight.
    pending: RefCell<Option<Rc<HostWindow>>>,
    next_view_id: Cell<ViewId>,
    next_seq: Cell<u64>,

    message_callback: RefCell<Option<MessageCallback>>,
    event_listener: RefCell<Option<EventListener>>,
}

impl HostWindowController {
    /// Create a controller and attach it to `platform` as its message sink.
    pub fn new(
        platform: Rc<dyn Platform>,
        views: Rc<dyn ViewProvider>,
        config: HostConfig,
    ) -> Rc<Self> {
        let controller = Rc::new(Self {
            platform: Rc::clone(&platform),
            views,
            config,
            windows: RefCell::new(HashMap::new()),
            pending: RefCell::new(None),
            next_view_id: Cell::new(0),
            next_seq: Cell::new(0),
            message_callback: RefCell::new(None),
            event_listener: RefCell::new(None),
        });
        let sink: Rc<dyn MessageSink> = controller.clone();
        platform.attach(Rc::downgrade(&sink));
        controller
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn set_message_callback(&self, callback: Option<MessageCallback>) {
        *self.message_callback.borrow_mut() = callback;
    }

    pub fn set_event_listener(&self, listener: Option<EventListener>) {
        *self.event_listener.borrow_mut() = listener;
    }

    fn emit(&self, event: WindowEvent) {
        let listener = self.event_listener.borrow().clone();
        if let Some(listener) = listener {
            listener(&event);
        }
    }

    // ── Creation ──────────────────────────────────────────────────────────────

    /// Create a `Regular` window and return its view id.
    pub fn create_regular_window(&self, sizing: WindowSizing) -> Result<ViewId> {
        self.create_window(&WindowCreationSettings::regular(sizing))
            .map(|metadata| metadata.view_id)
    }

    /// Create a `Dialog`, owned by the window with handle `owner` if given.
    pub fn create_dialog_window(
        &self,
        sizing: WindowSizing,
        owner: Option<WindowHandle>,
    ) -> Result<ViewId> {
        sizing.validate()?;
        let owner = owner.map(|h| self.validate_owner(h)).transpose()?;
        self.create_host_window(&WindowCreationSettings::dialog(sizing, None), owner)
            .map(|metadata| metadata.view_id)
    }

    /// Create a window of any archetype.
    pub fn create_window(&self, settings: &WindowCreationSettings) -> Result<WindowMetadata> {
        settings.sizing.validate()?;
        let owner = match settings.archetype {
            WindowArchetype::Regular => {
                if settings.parent_view_id.is_some() {
                    return Err(CasementError::invalid_argument(
                        "parentViewId",
                        "regular windows cannot have an owner",
                    ));
                }
                None
            }
            WindowArchetype::Dialog => settings
                .parent_view_id
                .map(|id| self.owner_for_view(id))
                .transpose()?,
            WindowArchetype::Popup => {
                let parent = settings.parent_view_id.ok_or_else(|| {
                    CasementError::invalid_argument("parentViewId", "popups require a parent")
                })?;
                if settings.positioner.is_none() {
                    return Err(CasementError::invalid_argument(
                        "positioner",
                        "popups require a positioner",
                    ));
                }
                Some(self.owner_for_view(parent)?)
            }
        };
        self.create_host_window(settings, owner)
    }

    fn owner_for_view(&self, view_id: ViewId) -> Result<Rc<HostWindow>> {
        let handle = self.window_handle(view_id)?;
        self.validate_owner(handle)
    }

    /// An owner must be a tracked, live `Regular` or `Dialog` window.
    fn validate_owner(&self, handle: WindowHandle) -> Result<Rc<HostWindow>> {
        match self.window_for_handle(handle) {
            Some(owner)
                if !owner.is_being_destroyed()
                    && owner.archetype() != WindowArchetype::Popup
                    && self.platform.is_window(handle) =>
            {
                Ok(owner)
            }
            _ => Err(CasementError::InvalidOwner(handle)),
        }
    }

    fn styles_for(&self, archetype: WindowArchetype) -> (WindowStyle, ExtendedStyle) {
        match archetype {
            WindowArchetype::Regular => (
                WindowStyle::OVERLAPPEDWINDOW | WindowStyle::CLIPCHILDREN,
                ExtendedStyle::empty(),
            ),
            WindowArchetype::Dialog => {
                let mut style = WindowStyle::CAPTION | WindowStyle::SYSMENU | WindowStyle::CLIPCHILDREN;
                if self.config.resizable_dialogs {
                    style |= WindowStyle::THICKFRAME;
                }
                (style, ExtendedStyle::DLGMODALFRAME)
            }
            WindowArchetype::Popup => (
                WindowStyle::POPUP | WindowStyle::CLIPCHILDREN,
                ExtendedStyle::TOOLWINDOW | ExtendedStyle::NOACTIVATE,
            ),
        }
    }

    fn create_host_window(
        &self,
        settings: &WindowCreationSettings,
        owner: Option<Rc<HostWindow>>,
    ) -> Result<WindowMetadata> {
        let archetype = settings.archetype;
        let view_id = self.next_view_id.get();
        let creation_seq = self.next_seq.get();
        self.next_view_id.set(view_id + 1);
        self.next_seq.set(creation_seq + 1);

        let (style, ex_style) = self.styles_for(archetype);
        let window = Rc::new(HostWindow::new(
            Rc::clone(&self.platform),
            Rc::clone(&self.views),
            HostWindowParams {
                archetype,
                view_id,
                creation_seq,
                style,
                ex_style,
                sizing: settings.sizing,
            },
        ));
        let owner_handle = match &owner {
            Some(owner) => {
                if owner.is_self_or_ancestor(&window) {
                    return Err(CasementError::InvalidOwner(
                        owner.handle().unwrap_or(WindowHandle::NULL),
                    ));
                }
                Some(owner.handle().ok_or(CasementError::UnknownView(owner.view_id()))?)
            }
            None => None,
        };

        let dpi = owner_handle.map_or_else(
            || self.platform.system_dpi(),
            |h| self.platform.dpi_for_window(h),
        );
        let client = dpi::to_physical(window.content_size(), dpi);
        let mut frame = self
            .platform
            .frame_size_for_client(client, style, ex_style, dpi)
            .map_err(creation_failed)?;

        let origin = match (archetype, owner_handle, settings.positioner) {
            (WindowArchetype::Popup, Some(owner), Some(positioner)) => {
                let placed = self
                    .place_popup(owner, &positioner, frame, dpi)
                    .map_err(creation_failed)?;
                frame = placed.size();
                Some(placed.origin())
            }
            (WindowArchetype::Dialog, Some(owner), _) => self.centered_over(owner, frame),
            _ => None,
        };

        let params = NativeWindowParams {
            title: settings
                .title
                .clone()
                .unwrap_or_else(|| self.config.default_title.clone()),
            style,
            ex_style,
            origin,
            frame_size: frame,
            owner: owner_handle,
        };

        *self.pending.borrow_mut() = Some(Rc::clone(&window));
        let created = self.platform.create_window(&params);
        self.pending.borrow_mut().take();
        let handle = match created {
            Ok(handle) => handle,
            Err(e) => {
                if let Some(handle) = window.handle() {
                    self.windows.borrow_mut().remove(&handle);
                }
                warn!(view_id, error = %e, "native window creation failed");
                return Err(creation_failed(e));
            }
        };
        if window.handle().is_none() {
            window.bind_handle(handle);
            self.windows.borrow_mut().insert(handle, Rc::clone(&window));
        }

        let client = self.platform.client_size(handle).unwrap_or(client);
        let binding = match self
            .views
            .create_view(view_id, handle, client, self.platform.dpi_for_window(handle))
        {
            Ok(binding) => binding,
            Err(e) => {
                // Unregister first so the teardown messages are not treated as
                // the end of a live window.
                self.windows.borrow_mut().remove(&handle);
                if let Err(destroy) = self.platform.destroy_window(handle) {
                    warn!(%handle, error = %destroy, "failed to destroy window after view failure");
                }
                return Err(creation_failed(e));
            }
        };
        if let Some(content) = binding.content {
            if let Err(e) = self.platform.set_parent(content, handle) {
                warn!(%content, error = %e, "failed to parent view content");
            }
        }
        window.set_view(binding);

        if let Some(owner) = &owner {
            window.link_owner(owner);
            if archetype == WindowArchetype::Popup {
                if let (Ok(own), Ok(theirs)) = (
                    self.platform.window_rect(handle),
                    self.platform.window_rect(owner_handle.unwrap_or(handle)),
                ) {
                    window.set_offset_from_owner(PhysicalPoint::new(
                        own.left - theirs.left,
                        own.top - theirs.top,
                    ));
                }
            }
        }

        if self.config.quit_on_main_window_close && self.windows.borrow().len() == 1 {
            window.set_quit_on_close(true);
        }

        self.update_modal_state();

        let show = match archetype {
            WindowArchetype::Regular => match settings.state {
                None | Some(WindowState::Restored) => ShowCommand::Normal,
                Some(state) => ShowCommand::for_state(state),
            },
            WindowArchetype::Dialog => ShowCommand::Normal,
            WindowArchetype::Popup => ShowCommand::NoActivate,
        };
        self.platform.show_window(handle, show);

        info!(view_id, %handle, ?archetype, "window created");
        Ok(self.metadata_of(&window))
    }

    /// Popup frame rectangle in screen pixels.
    fn place_popup(
        &self,
        owner: WindowHandle,
        positioner: &WindowPositioner,
        frame: PhysicalSize,
        dpi: u32,
    ) -> Result<PhysicalRect> {
        let factor = dpi::scale_factor(dpi);
        let owner_frame = self.platform.window_rect(owner)?.to_rect();
        let client_origin = self.platform.client_origin(owner)?;
        let anchor = match positioner.anchor_rect {
            Some(r) => Rect::new(
                Point::new(
                    f64::from(client_origin.x) + r.origin.x * factor,
                    f64::from(client_origin.y) + r.origin.y * factor,
                ),
                Size::new(r.size.width * factor, r.size.height * factor),
            ),
            None => owner_frame,
        };
        let output = self.platform.work_area(owner)?.to_rect();
        let scaled = WindowPositioner {
            offset: Point::new(positioner.offset.x * factor, positioner.offset.y * factor),
            ..*positioner
        };
        let placed = place_window(
            &scaled,
            Size::new(f64::from(frame.width), f64::from(frame.height)),
            &anchor,
            &owner_frame,
            &output,
        );
        Ok(PhysicalRect::from_rect(&placed))
    }

    fn centered_over(&self, owner: WindowHandle, frame: PhysicalSize) -> Option<PhysicalPoint> {
        let rect = self.platform.window_rect(owner).ok()?;
        let size = rect.size();
        Some(PhysicalPoint::new(
            rect.left + (size.width - frame.width) / 2,
            rect.top + (size.height - frame.height) / 2,
        ))
    }

    /// Track a window the runner created, with its view already bound.
    pub fn adopt_window(&self, handle: WindowHandle, binding: ViewBinding) -> Result<ViewId> {
        if !self.platform.is_window(handle) {
            return Err(CasementError::UnknownHandle(handle));
        }
        if self.windows.borrow().contains_key(&handle) {
            return Err(CasementError::invalid_argument("hwnd", "window is already tracked"));
        }
        let view_id = binding.view_id;
        if self.window(view_id).is_some() {
            return Err(CasementError::invalid_argument(
                "viewId",
                format!("view {view_id} is already hosted"),
            ));
        }

        let creation_seq = self.next_seq.get();
        self.next_seq.set(creation_seq + 1);
        self.next_view_id.set(self.next_view_id.get().max(view_id + 1));

        let window = Rc::new(HostWindow::adopt(
            Rc::clone(&self.platform),
            Rc::clone(&self.views),
            handle,
            binding,
            creation_seq,
        ));
        self.windows.borrow_mut().insert(handle, Rc::clone(&window));
        if self.config.quit_on_main_window_close && self.windows.borrow().len() == 1 {
            window.set_quit_on_close(true);
        }
        self.update_modal_state();
        info!(view_id, %handle, "adopted runner window");
        Ok(view_id)
    }

    // ── Lookup ────────────────────────────────────────────────────────────────

    pub fn window(&self, view_id: ViewId) -> Option<Rc<HostWindow>> {
        self.windows
            .borrow()
            .values()
            .find(|w| w.view_id() == view_id)
            .cloned()
    }

    pub fn window_for_handle(&self, handle: WindowHandle) -> Option<Rc<HostWindow>> {
        self.windows.borrow().get(&handle).cloned()
    }

    fn tracked(&self, handle: WindowHandle) -> Result<Rc<HostWindow>> {
        self.window_for_handle(handle)
            .filter(|w| !w.is_being_destroyed())
            .ok_or(CasementError::UnknownHandle(handle))
    }

    pub fn window_handle(&self, view_id: ViewId) -> Result<WindowHandle> {
        self.window(view_id)
            .filter(|w| !w.is_being_destroyed())
            .and_then(|w| w.handle())
            .ok_or(CasementError::UnknownView(view_id))
    }

    /// Whether any tracked window is still alive.
    pub fn has_top_level_windows(&self) -> bool {
        self.windows
            .borrow()
            .values()
            .any(|w| !w.is_being_destroyed())
    }

    pub fn window_count(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn metadata(&self, view_id: ViewId) -> Result<WindowMetadata> {
        let window = self.window(view_id).ok_or(CasementError::UnknownView(view_id))?;
        Ok(self.metadata_of(&window))
    }

    fn metadata_of(&self, window: &HostWindow) -> WindowMetadata {
        WindowMetadata {
            view_id: window.view_id(),
            archetype: window.archetype(),
            size: window.content_size(),
            parent_id: window.owner().map(|o| o.view_id()),
            state: window.state().ok(),
            relative_position: window.relative_position(),
        }
    }

    // ── Geometry & state ──────────────────────────────────────────────────────

    /// Client-area size in logical units.
    pub fn content_size(&self, handle: WindowHandle) -> Result<Size> {
        Ok(self.tracked(handle)?.content_size())
    }

    pub fn set_content_size(&self, handle: WindowHandle, sizing: &WindowSizing) -> Result<()> {
        self.tracked(handle)?.set_content_size(sizing)
    }

    pub fn state(&self, handle: WindowHandle) -> Result<WindowState> {
        self.tracked(handle)?.state()
    }

    pub fn set_state(&self, handle: WindowHandle, state: WindowState) -> Result<()> {
        self.tracked(handle)?.set_state(state)
    }

    /// Apply `changes` to the window hosting `view_id`.  Everything is
    /// validated before anything is applied.
    pub fn modify_window(&self, view_id: ViewId, changes: &WindowModificationSettings) -> Result<()> {
        let handle = self.window_handle(view_id)?;
        let window = self.tracked(handle)?;
        let sizing = changes.size.map(|size| WindowSizing {
            size,
            min_size: window.min_size(),
            max_size: window.max_size(),
        });
        if let Some(sizing) = &sizing {
            sizing.validate()?;
        }
        if changes.state.is_some() && window.archetype() != WindowArchetype::Regular {
            return Err(CasementError::InvalidOperation {
                operation: "set_state",
                archetype: window.archetype(),
            });
        }

        if let Some(title) = &changes.title {
            window.set_title(title)?;
        }
        if let Some(sizing) = &sizing {
            window.set_content_size(sizing)?;
        }
        if let Some(state) = changes.state {
            window.set_state(state)?;
        }
        Ok(())
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Ask the window hosting `view_id` to close.  Its entry goes away when
    /// the native window is finally destroyed.
    pub fn destroy_window(&self, view_id: ViewId) -> Result<()> {
        let handle = self.window_handle(view_id)?;
        debug!(view_id, %handle, "close requested");
        self.platform.request_close(handle)
    }

    /// Destroy every tracked window, newest first.
    pub fn destroy_all_windows(&self) {
        let mut windows: Vec<Rc<HostWindow>> = self.windows.borrow().values().cloned().collect();
        windows.sort_by_key(|w| Reverse(w.creation_seq()));
        for window in windows {
            let Some(handle) = window.handle() else {
                continue;
            };
            if window.is_being_destroyed() || !self.platform.is_window(handle) {
                continue;
            }
            if let Err(e) = self.platform.destroy_window(handle) {
                warn!(%handle, error = %e, "failed to destroy window");
            }
        }
    }

    fn on_nc_destroy(&self, window: &Rc<HostWindow>, msg: &mut WindowMessage) -> isize {
        self.windows.borrow_mut().remove(&msg.handle);
        window.handle_message(msg);
        self.update_modal_state();

        let view_id = window.view_id();
        debug!(view_id, handle = %msg.handle, "window destroyed");
        self.emit(WindowEvent::Destroyed { view_id });

        if window.quit_on_close() {
            info!(view_id, "main window closed; destroying remaining windows");
            self.destroy_all_windows();
        }
        0
    }

    // ── Modal layers ──────────────────────────────────────────────────────────

    /// Recompute which windows accept input.  In each ownership layer only the
    /// newest dialog stays eligible, and a window that owns dialogs defers to
    /// its newest one, so exactly one window per ownership tree is enabled.
    fn update_modal_state(&self) {
        let mut roots: Vec<Rc<HostWindow>> = self
            .windows
            .borrow()
            .values()
            .filter(|w| w.owner().is_none())
            .cloned()
            .collect();
        roots.sort_by_key(|w| w.creation_seq());
        for root in roots {
            self.update_modal_layer(&root);
        }
    }

    fn update_modal_layer(&self, window: &HostWindow) {
        if window.archetype() == WindowArchetype::Popup || window.is_being_destroyed() {
            return;
        }
        let dialogs: Vec<Rc<HostWindow>> = window
            .owned_windows()
            .into_iter()
            .filter(|w| w.archetype() != WindowArchetype::Popup && !w.is_being_destroyed())
            .collect();
        match dialogs.split_last() {
            None => window.set_enabled(true),
            Some((newest, older)) => {
                window.set_enabled(false);
                for dialog in older {
                    Self::disable_recursively(dialog);
                }
                self.update_modal_layer(newest);
            }
        }
    }

    fn disable_recursively(window: &HostWindow) {
        if window.archetype() == WindowArchetype::Popup {
            return;
        }
        window.set_enabled(false);
        for owned in window.owned_windows() {
            Self::disable_recursively(&owned);
        }
    }

    // ── Runner integration ────────────────────────────────────────────────────

    /// Route a message of a runner-owned window.  `None` if the window is not
    /// tracked and the runner should handle the message itself.
    pub fn process_external_window_message(&self, msg: &mut WindowMessage) -> Option<isize> {
        if !self.windows.borrow().contains_key(&msg.handle) {
            return None;
        }
        Some(self.dispatch(msg))
    }

    /// Resolve the window for a message, binding the pending window on
    /// `WM_NCCREATE`.
    fn resolve(&self, msg: &WindowMessage) -> Option<Rc<HostWindow>> {
        let known = self.windows.borrow().get(&msg.handle).cloned();
        if known.is_some() {
            return known;
        }
        if msg.message != WM_NCCREATE {
            return None;
        }
        let pending = self.pending.borrow_mut().take()?;
        pending.bind_handle(msg.handle);
        self.windows
            .borrow_mut()
            .insert(msg.handle, Rc::clone(&pending));
        Some(pending)
    }
}

impl MessageSink for HostWindowController {
    fn dispatch(&self, msg: &mut WindowMessage) -> isize {
        let Some(window) = self.resolve(msg) else {
            return self.platform.default_window_proc(msg);
        };

        let callback = self.message_callback.borrow().clone();
        if let Some(callback) = callback {
            let mut record = WindowsMessage::observe(window.view_id(), msg);
            callback(&mut record);
            if record.handled && !is_lifecycle(msg.message) {
                return record.result;
            }
        }

        match msg.message {
            WM_SIZE => {
                let result = window.handle_message(msg);
                if window.has_view() {
                    self.emit(WindowEvent::Changed {
                        view_id: window.view_id(),
                        size: window.content_size(),
                        relative_position: window.relative_position(),
                    });
                }
                result
            }
            WM_NCDESTROY => self.on_nc_destroy(&window, msg),
            _ => window.handle_message(msg),
        }
    }
}

impl Drop for HostWindowController {
    fn drop(&mut self) {
        let mut windows: Vec<Rc<HostWindow>> =
            self.windows.get_mut().drain().map(|(_, w)| w).collect();
        if windows.is_empty() {
            return;
        }
        debug!(count = windows.len(), "tearing down remaining windows");
        // Owned windows are always newer than their owner.
        windows.sort_by_key(|w| Reverse(w.creation_seq()));
        for window in windows {
            window.destroy_detached();
        }
    }
}

fn creation_failed(e: CasementError) -> CasementError {
    match e {
        CasementError::Creation { .. } => e,
        other => CasementError::Creation {
            reason: other.to_string(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
