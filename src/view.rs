// ── Embedded view collaborator ────────────────────────────────────────────────
//
// The rendering subsystem is external.  The host only asks it to create a view
// bound to a window's client area, to resize it, and to destroy it, and hands it
// the window handle, client size and DPI.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
};

use tracing::debug;

use crate::{
    error::{CasementError, Result},
    geometry::PhysicalSize,
    message::WindowHandle,
};

/// Identifier correlating a window with the view it hosts.
pub type ViewId = i64;

/// Ownership of the view surface that fills a window's client area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewBinding {
    pub view_id: ViewId,
    /// Child window the view renders into, if it uses one.  The host parents it
    /// to the window on creation.
    pub content: Option<WindowHandle>,
}

/// Services consumed from the rendering subsystem.
pub trait ViewProvider {
    /// Create the view for `view_id`, bound to `window`'s client area.
    fn create_view(
        &self,
        view_id: ViewId,
        window: WindowHandle,
        client_size: PhysicalSize,
        dpi: u32,
    ) -> Result<ViewBinding>;

    /// The usable client region changed.
    fn resize_view(&self, binding: &ViewBinding, client_size: PhysicalSize, dpi: u32);

    /// Release the view.  Called before the window's native handle goes away.
    fn destroy_view(&self, binding: ViewBinding);
}

// ── InertViews ────────────────────────────────────────────────────────────────

/// A provider that renders nothing and remembers what it was told.
///
/// Used by the runner when no renderer is attached, and by tests to observe the
/// view lifecycle.
#[derive(Default)]
pub struct InertViews {
    live: RefCell<HashMap<ViewId, (WindowHandle, PhysicalSize, u32)>>,
    destroyed: RefCell<Vec<ViewId>>,
    fail_next: Cell<bool>,
}

impl InertViews {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_view` call fail.
    pub fn fail_next_create(&self) {
        self.fail_next.set(true);
    }

    pub fn is_live(&self, view_id: ViewId) -> bool {
        self.live.borrow().contains_key(&view_id)
    }

    pub fn live_count(&self) -> usize {
        self.live.borrow().len()
    }

    /// Last client size (physical) and DPI reported for `view_id`.
    pub fn metrics(&self, view_id: ViewId) -> Option<(PhysicalSize, u32)> {
        self.live
            .borrow()
            .get(&view_id)
            .map(|&(_, size, dpi)| (size, dpi))
    }

    pub fn window_of(&self, view_id: ViewId) -> Option<WindowHandle> {
        self.live.borrow().get(&view_id).map(|&(window, _, _)| window)
    }

    /// Views destroyed so far, in order.
    pub fn destroyed(&self) -> Vec<ViewId> {
        self.destroyed.borrow().clone()
    }
}

impl ViewProvider for InertViews {
    fn create_view(
        &self,
        view_id: ViewId,
        window: WindowHandle,
        client_size: PhysicalSize,
        dpi: u32,
    ) -> Result<ViewBinding> {
        if self.fail_next.replace(false) {
            return Err(CasementError::View {
                view_id,
                reason: "surface allocation refused".to_owned(),
            });
        }
        debug!(view_id, %window, ?client_size, dpi, "view bound");
        self.live
            .borrow_mut()
            .insert(view_id, (window, client_size, dpi));
        Ok(ViewBinding {
            view_id,
            content: None,
        })
    }

    fn resize_view(&self, binding: &ViewBinding, client_size: PhysicalSize, dpi: u32) {
        if let Some(entry) = self.live.borrow_mut().get_mut(&binding.view_id) {
            entry.1 = client_size;
            entry.2 = dpi;
        }
    }

    fn destroy_view(&self, binding: ViewBinding) {
        self.live.borrow_mut().remove(&binding.view_id);
        self.destroyed.borrow_mut().push(binding.view_id);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inert_views_track_lifecycle() {
        let views = InertViews::new();
        let binding = views
            .create_view(3, WindowHandle(0x10), PhysicalSize::new(800, 600), 96)
            .unwrap();
        assert!(views.is_live(3));
        views.resize_view(&binding, PhysicalSize::new(1200, 900), 144);
        assert_eq!(views.metrics(3), Some((PhysicalSize::new(1200, 900), 144)));
        views.destroy_view(binding);
        assert!(!views.is_live(3));
        assert_eq!(views.destroyed(), vec![3]);
    }

    #[test]
    fn fail_next_create_fails_once() {
        let views = InertViews::new();
        views.fail_next_create();
        assert!(views
            .create_view(0, WindowHandle(1), PhysicalSize::new(1, 1), 96)
            .is_err());
        assert!(views
            .create_view(0, WindowHandle(1), PhysicalSize::new(1, 1), 96)
            .is_ok());
    }
}
