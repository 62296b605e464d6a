//! Window-space geometry for the content area below the tab strip.

use serde::{Deserialize, Serialize};

/// Window content size as reported by the host window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A rectangle in window pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Computes where content surfaces go given a fixed-height chrome strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryResolver {
    chrome_height: u32,
}

impl GeometryResolver {
    pub fn new(chrome_height: u32) -> Self {
        Self { chrome_height }
    }

    pub fn chrome_height(&self) -> u32 {
        self.chrome_height
    }

    pub fn resolve(&self, window: WindowSize) -> Bounds {
        resolve_content_bounds(window.width, window.height, self.chrome_height)
    }
}

/// Content rectangle beneath the chrome. A window shorter than the chrome yields a
/// zero-height rectangle rather than a negative one.
pub fn resolve_content_bounds(width: u32, height: u32, chrome_height: u32) -> Bounds {
    Bounds {
        x: 0,
        y: i32::try_from(chrome_height).unwrap_or(i32::MAX),
        width,
        height: height.saturating_sub(chrome_height),
    }
}
