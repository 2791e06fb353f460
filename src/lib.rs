// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `platform::win32` – Win32 / WinAPI FFI
//   • `ffi`             – the embedder C ABI (raw pointer arguments)
// Each unsafe block in those modules MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

// ── Casement ─────────────────────────────────────────────────────────────────
//
// A tree of native top-level windows hosting embedded views: regular windows,
// owned dialogs with modal input blocking, and anchored popups, all sized in
// DPI-independent units.

pub mod channel;
pub mod config;
pub mod controller;
pub mod dpi;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod host_window;
pub mod message;
pub mod platform;
pub mod positioner;
pub mod settings;
pub mod view;

pub use config::HostConfig;
pub use controller::{HostWindowController, WindowEvent};
pub use error::{CasementError, ErrorKind, Result};
pub use host_window::HostWindow;
pub use message::{WindowHandle, WindowsMessage};
pub use settings::{
    WindowArchetype, WindowCreationSettings, WindowMetadata, WindowModificationSettings,
    WindowSizing, WindowState,
};
pub use view::{ViewBinding, ViewId, ViewProvider};
