use orb_core::{OverlayPayload, ShellEvent, SurfaceId};
use tokio::sync::broadcast;
use tracing::debug;

use crate::manager::ViewManager;
use crate::surface::SelectionReport;

/// Carries selections from content surfaces to the control surface overlay.
///
/// At most one payload is pending; every accepted highlight replaces it.
pub struct HighlightRelay {
    current: Option<OverlayPayload>,
    events_tx: broadcast::Sender<ShellEvent>,
}

impl HighlightRelay {
    pub fn new(events_tx: broadcast::Sender<ShellEvent>) -> Self {
        Self {
            current: None,
            events_tx,
        }
    }

    /// Resolve `surface` to its tab and forward the selection in window space.
    ///
    /// Selections from surfaces no tab owns, blank selections and selections from
    /// tabs embedded in direct mode are dropped.
    pub fn highlight(
        &mut self,
        views: &ViewManager,
        surface: SurfaceId,
        report: SelectionReport,
    ) -> Option<OverlayPayload> {
        let Some(tab) = views.tab_for_surface(surface) else {
            debug!(surface = %surface, "Highlight from unknown surface dropped");
            return None;
        };
        if !tab.mode.captures_selection() {
            debug!(tab_id = %tab.id, "Highlight ignored in direct mode");
            return None;
        }
        let selection = report.text.trim();
        if selection.is_empty() {
            return None;
        }

        let payload = OverlayPayload {
            tab_id: tab.id.clone(),
            url: tab.live_url(),
            selection: selection.to_string(),
            rect: report.rect,
            view_bounds: views.content_bounds(),
            device_pixel_ratio: report.device_pixel_ratio,
        };
        debug!(tab_id = %payload.tab_id, chars = payload.selection.chars().count(), "Overlay shown");

        self.current = Some(payload.clone());
        self.send(ShellEvent::OverlayShow(payload.clone()));
        Some(payload)
    }

    pub fn hide(&mut self) {
        self.current = None;
        self.send(ShellEvent::OverlayHide);
    }

    pub fn current(&self) -> Option<&OverlayPayload> {
        self.current.as_ref()
    }

    fn send(&self, event: ShellEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("No control surface subscribed to overlay events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ViewMode;
    use crate::surface::fake::FakeFactory;
    use orb_core::config::ShellConfig;
    use orb_core::{Bounds, SelectionRect};
    use tokio::sync::mpsc;

    fn setup() -> (ViewManager, HighlightRelay, FakeFactory, broadcast::Receiver<ShellEvent>) {
        let factory = FakeFactory::default();
        let (events_tx, events_rx) = broadcast::channel(64);
        let (surface_tx, _surface_rx) = mpsc::unbounded_channel();
        let views = ViewManager::new(
            &ShellConfig::default(),
            Box::new(factory.clone()),
            events_tx.clone(),
            surface_tx,
        );
        (views, HighlightRelay::new(events_tx), factory, events_rx)
    }

    fn report(text: &str, left: f64, top: f64) -> SelectionReport {
        SelectionReport {
            text: text.to_string(),
            rect: SelectionRect { left, top, width: 50.0, height: 14.0 },
            device_pixel_ratio: 2.0,
        }
    }

    #[test]
    fn test_anchor_in_window_space() {
        let (mut views, mut relay, factory, _rx) = setup();
        let tab = views.create_tab(Some("https://a.test/"));
        let surface = factory.port(0).surface_id();

        let payload = relay.highlight(&views, surface, report("mitochondria", 120.0, 300.0)).unwrap();
        assert_eq!(payload.tab_id, tab);
        assert_eq!(payload.view_bounds, Bounds { x: 0, y: 40, width: 1300, height: 860 });
        assert_eq!(payload.anchor(), (120.0, 340.0));
        assert_eq!(payload.device_pixel_ratio, 2.0);
    }

    #[test]
    fn test_background_tab_resolved_by_identity() {
        let (mut views, mut relay, factory, _rx) = setup();
        let a = views.create_tab(Some("https://a.test/"));
        views.create_tab(Some("https://b.test/"));
        let background = factory.port(0).surface_id();

        let payload = relay.highlight(&views, background, report("alpha", 0.0, 0.0)).unwrap();
        assert_eq!(payload.tab_id, a);
        assert_eq!(payload.url, "https://a.test/");
    }

    #[test]
    fn test_bounds_follow_resize() {
        let (mut views, mut relay, factory, _rx) = setup();
        views.create_tab(None);
        let surface = factory.port(0).surface_id();

        relay.highlight(&views, surface, report("one", 10.0, 10.0));
        views.resize(900, 500);
        let payload = relay.highlight(&views, surface, report("two", 10.0, 10.0)).unwrap();
        assert_eq!(payload.view_bounds.height, 460);
        assert_eq!(relay.current().map(|p| p.selection.as_str()), Some("two"));
    }

    #[test]
    fn test_unknown_surface_and_blank_dropped() {
        let (mut views, mut relay, factory, mut rx) = setup();
        views.create_tab(None);
        let surface = factory.port(0).surface_id();
        while rx.try_recv().is_ok() {}

        assert!(relay.highlight(&views, SurfaceId(404), report("x", 0.0, 0.0)).is_none());
        assert!(relay.highlight(&views, surface, report("   ", 0.0, 0.0)).is_none());
        assert!(relay.current().is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_direct_mode_drops_selection() {
        let (mut views, mut relay, factory, _rx) = setup();
        let tab = views.create_tab(None);
        views.set_view_mode(&tab, ViewMode::Direct);
        let surface = factory.port(0).surface_id();
        assert!(relay.highlight(&views, surface, report("x", 0.0, 0.0)).is_none());
    }

    #[test]
    fn test_hide_clears_and_emits() {
        let (mut views, mut relay, factory, mut rx) = setup();
        views.create_tab(None);
        let surface = factory.port(0).surface_id();
        relay.highlight(&views, surface, report("term", 0.0, 0.0));
        while rx.try_recv().is_ok() {}

        relay.hide();
        assert!(relay.current().is_none());
        assert_eq!(rx.try_recv().unwrap(), ShellEvent::OverlayHide);
    }
}
