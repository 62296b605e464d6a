use serde::{Deserialize, Serialize};
use std::fmt;

use crate::geometry::Bounds;

/// Opaque tab identifier. Allocated from a counter and never reused by a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub String);

impl TabId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TabId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identity of one rendering context. Events from surfaces are attributed by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabSummary {
    pub id: TabId,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// Snapshot pushed to the control surface on every registry mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabList {
    pub active_tab_id: Option<TabId>,
    pub list: Vec<TabSummary>,
}

/// Selection rectangle in the content surface's own coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectionRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// What the control surface needs to place the assist bubble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPayload {
    pub tab_id: TabId,
    pub url: String,
    pub selection: String,
    pub rect: SelectionRect,
    pub view_bounds: Bounds,
    pub device_pixel_ratio: f64,
}

impl OverlayPayload {
    /// Window-space anchor: content origin plus the local selection offset.
    pub fn anchor(&self) -> (f64, f64) {
        (
            f64::from(self.view_bounds.x) + self.rect.left,
            f64::from(self.view_bounds.y) + self.rect.top,
        )
    }
}

/// Events delivered to the control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ShellEvent {
    #[serde(rename = "tabs:update")]
    TabsUpdated(TabList),
    #[serde(rename = "overlay:show")]
    OverlayShow(OverlayPayload),
    #[serde(rename = "overlay:hide")]
    OverlayHide,
}
