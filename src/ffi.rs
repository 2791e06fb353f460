// ── Embedder C ABI ────────────────────────────────────────────────────────────
//
// `extern "C"` entry points for the embedding runtime.  Each engine registers
// its controller on the UI thread under an engine id; handle-based calls
// resolve the window across every registered engine.
//
// Pointer arguments are checked for null and otherwise trusted.  Errors never
// cross the boundary as panics: every entry point returns a `Status`.

#![allow(unsafe_code)]

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::{debug, warn};

use crate::{
    controller::HostWindowController,
    error::{CasementError, ErrorKind, Result},
    geometry::Size,
    message::{WindowHandle, WindowsMessage},
    settings::{WindowSizing, WindowState},
    view::ViewId,
};

pub type EngineId = i64;

thread_local! {
    static ENGINES: RefCell<HashMap<EngineId, Rc<HostWindowController>>> =
        RefCell::new(HashMap::new());
}

/// Make `controller` reachable through the C ABI as `engine_id`.
pub fn register_engine(engine_id: EngineId, controller: Rc<HostWindowController>) {
    debug!(engine_id, "engine registered");
    ENGINES.with(|engines| engines.borrow_mut().insert(engine_id, controller));
}

/// Remove an engine.  The returned controller tears down its windows when
/// the last reference goes.
pub fn unregister_engine(engine_id: EngineId) -> Option<Rc<HostWindowController>> {
    ENGINES.with(|engines| engines.borrow_mut().remove(&engine_id))
}

fn engine(engine_id: EngineId) -> Result<Rc<HostWindowController>> {
    ENGINES
        .with(|engines| engines.borrow().get(&engine_id).cloned())
        .ok_or(CasementError::UnknownEngine(engine_id))
}

fn engine_for_handle(handle: WindowHandle) -> Result<Rc<HostWindowController>> {
    ENGINES
        .with(|engines| {
            engines
                .borrow()
                .values()
                .find(|c| c.window_for_handle(handle).is_some())
                .cloned()
        })
        .ok_or(CasementError::UnknownHandle(handle))
}

// ── Wire types ────────────────────────────────────────────────────────────────

/// Outcome of every entry point.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    InvalidReference = 1,
    InvalidOperation = 2,
    CreationFailed = 3,
    InvalidArgument = 4,
    PlatformError = 5,
}

impl From<&CasementError> for Status {
    fn from(e: &CasementError) -> Self {
        match e.kind() {
            ErrorKind::Construction => Status::CreationFailed,
            ErrorKind::InvalidReference => Status::InvalidReference,
            ErrorKind::InvalidOperation => Status::InvalidOperation,
            ErrorKind::InvalidArgument => Status::InvalidArgument,
            ErrorKind::Platform => Status::PlatformError,
        }
    }
}

fn status(result: Result<()>) -> Status {
    match result {
        Ok(()) => Status::Ok,
        Err(e) => {
            warn!(error = %e, "windowing call failed");
            Status::from(&e)
        }
    }
}

pub type MessageCallbackFn = unsafe extern "C" fn(message: *mut WindowsMessage);

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WindowingInitRequest {
    /// Called with every message of a tracked window; null to uninstall.
    pub on_message: Option<MessageCallbackFn>,
}

/// Client-area size in logical units.  A zero min or max pair means "no
/// constraint".
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowSizingRequest {
    pub width: f64,
    pub height: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub max_width: f64,
    pub max_height: f64,
}

impl WindowSizingRequest {
    fn to_sizing(self) -> WindowSizing {
        let optional = |width: f64, height: f64| {
            (width != 0.0 || height != 0.0).then(|| Size::new(width, height))
        };
        WindowSizing {
            size: Size::new(self.width, self.height),
            min_size: optional(self.min_width, self.min_height),
            max_size: optional(self.max_width, self.max_height),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ContentSize {
    pub width: f64,
    pub height: f64,
}

/// # Safety
/// `ptr` is null or valid for reads of `T`.
unsafe fn read<T: Copy>(ptr: *const T, key: &'static str) -> Result<T> {
    // SAFETY: caller guarantees `ptr` is null or points to a readable `T`.
    unsafe { ptr.as_ref() }
        .copied()
        .ok_or_else(|| CasementError::invalid_argument(key, "null pointer"))
}

/// # Safety
/// `ptr` is null or valid for writes of `T`.
unsafe fn write<T>(ptr: *mut T, key: &'static str, value: T) -> Result<()> {
    // SAFETY: caller guarantees `ptr` is null or points to a writable `T`.
    let slot = unsafe { ptr.as_mut() }
        .ok_or_else(|| CasementError::invalid_argument(key, "null pointer"))?;
    *slot = value;
    Ok(())
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Install the message callback of engine `engine_id`.
///
/// # Safety
/// `request` must be null or point to a valid `WindowingInitRequest`.  The
/// callback must stay callable for as long as the engine is registered.
#[no_mangle]
pub unsafe extern "C" fn casement_windowing_initialize(
    engine_id: EngineId,
    request: *const WindowingInitRequest,
) -> Status {
    status((|| {
        let controller = engine(engine_id)?;
        // SAFETY: forwarded caller contract on `request`.
        let request = unsafe { read(request, "request") }?;
        let callback = request.on_message.map(|on_message| {
            Rc::new(move |message: &mut WindowsMessage| {
                // SAFETY: `message` is a live exclusive borrow for the call;
                // the embedder promised `on_message` stays callable.
                unsafe { on_message(message) }
            }) as Rc<dyn Fn(&mut WindowsMessage)>
        });
        controller.set_message_callback(callback);
        Ok(())
    })())
}

/// Create a Regular window; its view id is written to `view_id_out`.
///
/// # Safety
/// `request` must point to a valid `WindowSizingRequest` and `view_id_out`
/// to writable memory, or be null.
#[no_mangle]
pub unsafe extern "C" fn casement_create_regular_window(
    engine_id: EngineId,
    request: *const WindowSizingRequest,
    view_id_out: *mut ViewId,
) -> Status {
    status((|| {
        let controller = engine(engine_id)?;
        // SAFETY: forwarded caller contract on `request`.
        let sizing = unsafe { read(request, "request") }?.to_sizing();
        let view_id = controller.create_regular_window(sizing)?;
        // SAFETY: forwarded caller contract on `view_id_out`.
        unsafe { write(view_id_out, "viewId", view_id) }
    })())
}

/// Create a Dialog owned by `owner` (0 for none).
///
/// # Safety
/// As for [`casement_create_regular_window`].
#[no_mangle]
pub unsafe extern "C" fn casement_create_dialog_window(
    engine_id: EngineId,
    request: *const WindowSizingRequest,
    owner: isize,
    view_id_out: *mut ViewId,
) -> Status {
    status((|| {
        let controller = engine(engine_id)?;
        // SAFETY: forwarded caller contract on `request`.
        let sizing = unsafe { read(request, "request") }?.to_sizing();
        let owner = WindowHandle(owner);
        let owner = (!owner.is_null()).then_some(owner);
        let view_id = controller.create_dialog_window(sizing, owner)?;
        // SAFETY: forwarded caller contract on `view_id_out`.
        unsafe { write(view_id_out, "viewId", view_id) }
    })())
}

/// # Safety
/// `handle_out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn casement_get_window_handle(
    engine_id: EngineId,
    view_id: ViewId,
    handle_out: *mut isize,
) -> Status {
    status((|| {
        let handle = engine(engine_id)?.window_handle(view_id)?;
        // SAFETY: forwarded caller contract on `handle_out`.
        unsafe { write(handle_out, "handle", handle.0) }
    })())
}

/// # Safety
/// `size_out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn casement_get_window_size(
    handle: isize,
    size_out: *mut ContentSize,
) -> Status {
    status((|| {
        let handle = WindowHandle(handle);
        let size = engine_for_handle(handle)?.content_size(handle)?;
        let size = ContentSize {
            width: size.width,
            height: size.height,
        };
        // SAFETY: forwarded caller contract on `size_out`.
        unsafe { write(size_out, "size", size) }
    })())
}

/// # Safety
/// `request` must be null or point to a valid `WindowSizingRequest`.
#[no_mangle]
pub unsafe extern "C" fn casement_set_window_size(
    handle: isize,
    request: *const WindowSizingRequest,
) -> Status {
    status((|| {
        let handle = WindowHandle(handle);
        // SAFETY: forwarded caller contract on `request`.
        let sizing = unsafe { read(request, "request") }?.to_sizing();
        engine_for_handle(handle)?.set_content_size(handle, &sizing)
    })())
}

/// Writes 0 (restored), 1 (maximized) or 2 (minimized).
///
/// # Safety
/// `state_out` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn casement_get_window_state(handle: isize, state_out: *mut i64) -> Status {
    status((|| {
        let handle = WindowHandle(handle);
        let state = engine_for_handle(handle)?.state(handle)?;
        // SAFETY: forwarded caller contract on `state_out`.
        unsafe { write(state_out, "state", state.to_raw()) }
    })())
}

#[no_mangle]
pub extern "C" fn casement_set_window_state(handle: isize, state: i64) -> Status {
    status((|| {
        let handle = WindowHandle(handle);
        let state = WindowState::from_raw(state).ok_or_else(|| {
            CasementError::invalid_argument("state", format!("unknown state {state}"))
        })?;
        engine_for_handle(handle)?.set_state(handle, state)
    })())
}

/// Request the window showing `view_id` to close.
#[no_mangle]
pub extern "C" fn casement_destroy_window(engine_id: EngineId, view_id: ViewId) -> Status {
    status(engine(engine_id).and_then(|controller| controller.destroy_window(view_id)))
}

/// False for an unknown engine.
#[no_mangle]
pub extern "C" fn casement_windowing_has_top_level_windows(engine_id: EngineId) -> bool {
    engine(engine_id).is_ok_and(|controller| controller.has_top_level_windows())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{
        config::HostConfig,
        message::WM_SIZE,
        platform::headless::HeadlessPlatform,
        view::InertViews,
    };

    const ENGINE: EngineId = 7;

    fn setup() -> Rc<HeadlessPlatform> {
        let platform = Rc::new(HeadlessPlatform::new());
        let controller = HostWindowController::new(
            platform.clone(),
            Rc::new(InertViews::new()),
            HostConfig::default(),
        );
        register_engine(ENGINE, controller);
        platform
    }

    fn sizing(width: f64, height: f64) -> WindowSizingRequest {
        WindowSizingRequest {
            width,
            height,
            ..WindowSizingRequest::default()
        }
    }

    fn create_regular(width: f64, height: f64) -> (ViewId, isize) {
        let request = sizing(width, height);
        let mut view_id = -1;
        let mut handle = 0;
        unsafe {
            assert_eq!(
                casement_create_regular_window(ENGINE, &request, &mut view_id),
                Status::Ok
            );
            assert_eq!(casement_get_window_handle(ENGINE, view_id, &mut handle), Status::Ok);
        }
        (view_id, handle)
    }

    #[test]
    fn regular_window_round_trip_through_the_abi() {
        let _platform = setup();
        let (view_id, handle) = create_regular(800.0, 600.0);
        assert_eq!(view_id, 0);
        assert_ne!(handle, 0);

        let mut size = ContentSize::default();
        unsafe {
            assert_eq!(casement_get_window_size(handle, &mut size), Status::Ok);
        }
        assert_eq!(size, ContentSize { width: 800.0, height: 600.0 });

        let request = sizing(1024.0, 768.0);
        unsafe {
            assert_eq!(casement_set_window_size(handle, &request), Status::Ok);
            assert_eq!(casement_get_window_size(handle, &mut size), Status::Ok);
        }
        assert_eq!(size, ContentSize { width: 1024.0, height: 768.0 });
        assert!(casement_windowing_has_top_level_windows(ENGINE));
        unregister_engine(ENGINE);
    }

    #[test]
    fn state_uses_numeric_forms() {
        let _platform = setup();
        let (_, handle) = create_regular(400.0, 300.0);
        let mut state = -1;
        unsafe {
            assert_eq!(casement_get_window_state(handle, &mut state), Status::Ok);
        }
        assert_eq!(state, 0);

        assert_eq!(casement_set_window_state(handle, 1), Status::Ok);
        unsafe {
            assert_eq!(casement_get_window_state(handle, &mut state), Status::Ok);
        }
        assert_eq!(state, 1);
        assert_eq!(casement_set_window_state(handle, 9), Status::InvalidArgument);
        unregister_engine(ENGINE);
    }

    #[test]
    fn dialog_state_is_an_invalid_operation_not_an_invalid_reference() {
        let _platform = setup();
        let (_, owner) = create_regular(800.0, 600.0);
        let request = sizing(300.0, 200.0);
        let mut dialog_view = -1;
        let mut dialog = 0;
        let mut state = -1;
        unsafe {
            assert_eq!(
                casement_create_dialog_window(ENGINE, &request, owner, &mut dialog_view),
                Status::Ok
            );
            assert_eq!(
                casement_get_window_handle(ENGINE, dialog_view, &mut dialog),
                Status::Ok
            );
            assert_eq!(
                casement_get_window_state(dialog, &mut state),
                Status::InvalidOperation
            );
            assert_eq!(
                casement_get_window_state(0x7fff_0000, &mut state),
                Status::InvalidReference
            );
        }
        assert_eq!(state, -1);
        unregister_engine(ENGINE);
    }

    #[test]
    fn stale_owner_and_unknown_engine_are_invalid_references() {
        let _platform = setup();
        let request = sizing(300.0, 200.0);
        let mut view_id = -1;
        unsafe {
            assert_eq!(
                casement_create_dialog_window(ENGINE, &request, 0x4242, &mut view_id),
                Status::InvalidReference
            );
            assert_eq!(
                casement_create_regular_window(99, &request, &mut view_id),
                Status::InvalidReference
            );
        }
        assert_eq!(view_id, -1);
        assert!(!casement_windowing_has_top_level_windows(99));
        unregister_engine(ENGINE);
    }

    #[test]
    fn null_pointers_and_bad_sizes_are_invalid_arguments() {
        let _platform = setup();
        let mut view_id = -1;
        let bad = sizing(0.0, 100.0);
        unsafe {
            assert_eq!(
                casement_create_regular_window(ENGINE, std::ptr::null(), &mut view_id),
                Status::InvalidArgument
            );
            assert_eq!(
                casement_create_regular_window(ENGINE, &bad, &mut view_id),
                Status::InvalidArgument
            );
        }
        let (_, handle) = create_regular(200.0, 100.0);
        unsafe {
            assert_eq!(
                casement_get_window_size(handle, std::ptr::null_mut()),
                Status::InvalidArgument
            );
        }
        unregister_engine(ENGINE);
    }

    #[test]
    fn failed_creation_reports_creation_failed() {
        let platform = setup();
        platform.fail_next_create();
        let request = sizing(200.0, 100.0);
        let mut view_id = -1;
        unsafe {
            assert_eq!(
                casement_create_regular_window(ENGINE, &request, &mut view_id),
                Status::CreationFailed
            );
        }
        assert!(!casement_windowing_has_top_level_windows(ENGINE));
        unregister_engine(ENGINE);
    }

    thread_local! {
        static SIZE_MESSAGES: Cell<usize> = const { Cell::new(0) };
    }

    unsafe extern "C" fn count_sizes(message: *mut WindowsMessage) {
        // SAFETY: the controller passes a live exclusive record.
        if let Some(message) = unsafe { message.as_ref() } {
            if message.message == WM_SIZE {
                SIZE_MESSAGES.with(|count| count.set(count.get() + 1));
            }
        }
    }

    #[test]
    fn initialize_installs_the_message_callback() {
        let _platform = setup();
        let request = WindowingInitRequest {
            on_message: Some(count_sizes),
        };
        unsafe {
            assert_eq!(casement_windowing_initialize(ENGINE, &request), Status::Ok);
        }
        let (_, handle) = create_regular(320.0, 240.0);
        let before = SIZE_MESSAGES.with(Cell::get);
        assert!(before >= 1);

        let resize = sizing(640.0, 480.0);
        unsafe {
            assert_eq!(casement_set_window_size(handle, &resize), Status::Ok);
        }
        assert!(SIZE_MESSAGES.with(Cell::get) > before);
        unregister_engine(ENGINE);
    }

    #[test]
    fn destroy_by_view_id_empties_the_engine() {
        let _platform = setup();
        let (view_id, _) = create_regular(320.0, 240.0);
        assert_eq!(casement_destroy_window(ENGINE, view_id), Status::Ok);
        assert!(!casement_windowing_has_top_level_windows(ENGINE));
        assert_eq!(casement_destroy_window(ENGINE, view_id), Status::InvalidReference);
        unregister_engine(ENGINE);
    }
}
