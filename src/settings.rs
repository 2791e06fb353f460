// ── Window settings ───────────────────────────────────────────────────────────
//
// Request and result records exchanged with the embedder: archetypes, states,
// sizing requests, creation and modification settings, and the metadata
// returned for a created window.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::{CasementError, Result},
    geometry::{Point, Size},
    positioner::WindowPositioner,
    view::ViewId,
};

// ── Archetype ─────────────────────────────────────────────────────────────────

/// The category of a window; decides which policies apply to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WindowArchetype {
    /// Top-level window that tracks a restored/maximized/minimized state.
    Regular,
    /// Optionally owned window; takes part in modal layers.
    Dialog,
    /// Owned transient surface placed by a positioner; never modal.
    Popup,
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Placement state of a `Regular` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowState {
    Restored,
    Maximized,
    Minimized,
}

impl WindowState {
    /// Framework string form, e.g. `"WindowState.maximized"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Restored => "WindowState.restored",
            Self::Maximized => "WindowState.maximized",
            Self::Minimized => "WindowState.minimized",
        }
    }

    /// Numeric form used across the C ABI.
    pub fn to_raw(self) -> i64 {
        match self {
            Self::Restored => 0,
            Self::Maximized => 1,
            Self::Minimized => 2,
        }
    }

    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            0 => Some(Self::Restored),
            1 => Some(Self::Maximized),
            2 => Some(Self::Minimized),
            _ => None,
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowState {
    type Err = CasementError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "WindowState.restored" => Ok(Self::Restored),
            "WindowState.maximized" => Ok(Self::Maximized),
            "WindowState.minimized" => Ok(Self::Minimized),
            other => Err(CasementError::invalid_argument(
                "state",
                format!("unknown window state {other:?}"),
            )),
        }
    }
}

// ── Sizing ────────────────────────────────────────────────────────────────────

/// Largest requested size or minimum size per dimension, in logical units.
/// Matches the largest frame Win32 will track.
pub const MAX_LOGICAL_EXTENT: f64 = 32_767.0;

/// Requested client-area size and optional constraints, in logical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSizing {
    pub size: Size,
    pub min_size: Option<Size>,
    pub max_size: Option<Size>,
}

impl WindowSizing {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            min_size: None,
            max_size: None,
        }
    }

    pub fn with_min(mut self, min: Size) -> Self {
        self.min_size = Some(min);
        self
    }

    pub fn with_max(mut self, max: Size) -> Self {
        self.max_size = Some(max);
        self
    }

    /// Sizes must be positive and finite; `size` and `min` may not exceed
    /// `MAX_LOGICAL_EXTENT`, and `min` may not exceed `max`, in either
    /// dimension.
    pub fn validate(&self) -> Result<()> {
        check_positive("size", self.size)?;
        check_extent("size", self.size)?;
        if let Some(min) = self.min_size {
            check_positive("minSize", min)?;
            check_extent("minSize", min)?;
        }
        if let Some(max) = self.max_size {
            check_positive("maxSize", max)?;
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min.width > max.width || min.height > max.height {
                return Err(CasementError::invalid_argument(
                    "minSize",
                    format!(
                        "({}, {}) exceeds maxSize ({}, {})",
                        min.width, min.height, max.width, max.height
                    ),
                ));
            }
        }
        Ok(())
    }

    /// The requested size after applying the constraints.
    pub fn constrained_size(&self) -> Size {
        self.size.clamp(self.min_size, self.max_size)
    }
}

fn check_positive(key: &'static str, size: Size) -> Result<()> {
    if size.is_positive() {
        Ok(())
    } else {
        Err(CasementError::invalid_argument(
            key,
            format!("({}, {}) must be positive", size.width, size.height),
        ))
    }
}

fn check_extent(key: &'static str, size: Size) -> Result<()> {
    if size.width <= MAX_LOGICAL_EXTENT && size.height <= MAX_LOGICAL_EXTENT {
        Ok(())
    } else {
        Err(CasementError::invalid_argument(
            key,
            format!(
                "({}, {}) exceeds {MAX_LOGICAL_EXTENT} in a dimension",
                size.width, size.height
            ),
        ))
    }
}

// ── Creation / modification ───────────────────────────────────────────────────

/// Everything needed to create a host window.
#[derive(Debug, Clone)]
pub struct WindowCreationSettings {
    pub archetype: WindowArchetype,
    pub sizing: WindowSizing,
    /// Falls back to the configured default title.
    pub title: Option<String>,
    /// Initial state; `Regular` only.
    pub state: Option<WindowState>,
    /// Required for popups; optional owner for dialogs.
    pub parent_view_id: Option<ViewId>,
    /// Required for popups.
    pub positioner: Option<WindowPositioner>,
}

impl WindowCreationSettings {
    pub fn regular(sizing: WindowSizing) -> Self {
        Self {
            archetype: WindowArchetype::Regular,
            sizing,
            title: None,
            state: None,
            parent_view_id: None,
            positioner: None,
        }
    }

    pub fn dialog(sizing: WindowSizing, owner: Option<ViewId>) -> Self {
        Self {
            archetype: WindowArchetype::Dialog,
            parent_view_id: owner,
            ..Self::regular(sizing)
        }
    }

    pub fn popup(sizing: WindowSizing, parent: ViewId, positioner: WindowPositioner) -> Self {
        Self {
            archetype: WindowArchetype::Popup,
            parent_view_id: Some(parent),
            positioner: Some(positioner),
            ..Self::regular(sizing)
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_state(mut self, state: WindowState) -> Self {
        self.state = Some(state);
        self
    }
}

/// Changes applied to an existing window; absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowModificationSettings {
    pub size: Option<Size>,
    pub title: Option<String>,
    pub state: Option<WindowState>,
}

/// Description of a freshly created window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowMetadata {
    pub view_id: ViewId,
    pub archetype: WindowArchetype,
    /// Client-area size in logical units.
    pub size: Size,
    pub parent_id: Option<ViewId>,
    /// `Regular` windows only.
    pub state: Option<WindowState>,
    /// Offset from the owner's top-left corner, logical units.  Popups only.
    pub relative_position: Option<Point>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn state_string_forms() {
        for state in [WindowState::Restored, WindowState::Maximized, WindowState::Minimized] {
            assert_eq!(state.as_str().parse::<WindowState>().unwrap(), state);
            assert_eq!(WindowState::from_raw(state.to_raw()), Some(state));
        }
        assert!("WindowState.fullscreen".parse::<WindowState>().is_err());
        assert_eq!(WindowState::from_raw(3), None);
    }

    #[test]
    fn sizing_rejects_min_above_max() {
        let sizing = WindowSizing::new(Size::new(400.0, 300.0))
            .with_min(Size::new(500.0, 100.0))
            .with_max(Size::new(450.0, 800.0));
        let err = sizing.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("minSize"));
    }

    #[test]
    fn sizing_rejects_extents_beyond_the_track_limit() {
        let err = WindowSizing::new(Size::new(1e12, 100.0)).validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("'size'"));
        let err = WindowSizing::new(Size::new(100.0, 100.0))
            .with_min(Size::new(50.0, 40_000.0))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("minSize"));
        // A large maximum only bounds the size.
        let sizing = WindowSizing::new(Size::new(MAX_LOGICAL_EXTENT, 100.0)).with_max(Size::new(1e12, 1e12));
        assert!(sizing.validate().is_ok());
    }

    #[test]
    fn sizing_rejects_zero_size() {
        let err = WindowSizing::new(Size::new(0.0, 300.0)).validate().unwrap_err();
        assert!(err.to_string().contains("'size'"));
    }

    #[test]
    fn constrained_size_clamps_into_bounds() {
        let sizing = WindowSizing::new(Size::new(1000.0, 50.0))
            .with_min(Size::new(100.0, 100.0))
            .with_max(Size::new(800.0, 600.0));
        assert!(sizing.validate().is_ok());
        assert_eq!(sizing.constrained_size(), Size::new(800.0, 100.0));
    }

    #[test]
    fn archetype_serde_names() {
        let json = serde_json::to_string(&WindowArchetype::Dialog).unwrap();
        assert_eq!(json, "\"dialog\"");
    }
}
