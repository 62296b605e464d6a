//! Content surface abstraction.
//!
//! A surface is one isolated rendering context. The real engine sits behind
//! [`ContentSurface`]; the view manager only drives it through this trait and
//! hears back from it through the [`SurfacePort`] installed at creation time.

use orb_core::{Bounds, Result, SelectionRect, SurfaceId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// One rendering context bound to one navigation session.
pub trait ContentSurface: Send {
    /// Start navigating to `url`. Returns immediately; the title arrives later as an event.
    fn load_url(&mut self, url: &str);

    fn reload(&mut self);

    /// Committed URL, which may differ from the last requested one after redirects.
    fn url(&self) -> String;

    /// Make the surface visible inside `bounds`.
    fn attach(&mut self, bounds: Bounds);

    /// Resize an attached surface.
    fn set_bounds(&mut self, bounds: Bounds);

    fn detach(&mut self);

    /// Tear down the rendering context. Called exactly once, right before the surface is dropped.
    fn destroy(&mut self) -> Result<()>;
}

/// Creates surfaces for new tabs.
pub trait SurfaceFactory: Send {
    fn create(&mut self, port: SurfacePort) -> Box<dyn ContentSurface>;
}

impl<F> SurfaceFactory for F
where
    F: FnMut(SurfacePort) -> Box<dyn ContentSurface> + Send,
{
    fn create(&mut self, port: SurfacePort) -> Box<dyn ContentSurface> {
        self(port)
    }
}

/// Selection reported by a surface's bridge script on mouse-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionReport {
    pub text: String,
    #[serde(default)]
    pub rect: SelectionRect,
    #[serde(default = "default_device_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_device_pixel_ratio() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEventKind {
    /// `None` or an empty title means the page has no title of its own.
    TitleChanged(Option<String>),
    Selection(SelectionReport),
    WindowOpen(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceEvent {
    pub surface: SurfaceId,
    pub kind: SurfaceEventKind,
}

/// What a surface must do with its own window-open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOpenDisposition {
    /// The request was handed to the host; do not navigate in place.
    Deny,
}

/// Event port handed to a surface when it is created. Every event carries the
/// surface's identity so the host never has to guess which tab spoke.
#[derive(Debug, Clone)]
pub struct SurfacePort {
    surface: SurfaceId,
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl SurfacePort {
    pub fn new(surface: SurfaceId, tx: mpsc::UnboundedSender<SurfaceEvent>) -> Self {
        Self { surface, tx }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface
    }

    pub fn title_changed(&self, title: Option<String>) {
        self.post(SurfaceEventKind::TitleChanged(title));
    }

    pub fn selection(&self, report: SelectionReport) {
        self.post(SurfaceEventKind::Selection(report));
    }

    /// Window-open interceptor: the request always becomes a new tab.
    pub fn request_window_open(&self, url: &str) -> WindowOpenDisposition {
        self.post(SurfaceEventKind::WindowOpen(url.to_string()));
        WindowOpenDisposition::Deny
    }

    fn post(&self, kind: SurfaceEventKind) {
        let event = SurfaceEvent { surface: self.surface, kind };
        if self.tx.send(event).is_err() {
            debug!(surface = %self.surface, "Surface event dropped, host is gone");
        }
    }
}
