use std::sync::Arc;

use orb_core::config::ShellConfig;
use orb_core::{OverlayPayload, ShellEvent, SurfaceId, TabId};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info};

use crate::manager::ViewManager;
use crate::mode::{BridgeMessage, ViewMode};
use crate::relay::HighlightRelay;
use crate::surface::{SelectionReport, SurfaceEvent, SurfaceEventKind, SurfaceFactory};

/// The host side of the shell: view manager plus highlight relay.
///
/// Shared as `Arc<tokio::sync::Mutex<ShellHost>>`; every handler is a short
/// critical section, so host operations are serialized.
pub struct ShellHost {
    views: ViewManager,
    relay: HighlightRelay,
}

pub type SharedHost = Arc<Mutex<ShellHost>>;

impl ShellHost {
    pub fn new(
        config: &ShellConfig,
        factory: Box<dyn SurfaceFactory>,
        events_tx: broadcast::Sender<ShellEvent>,
        surface_tx: mpsc::UnboundedSender<SurfaceEvent>,
    ) -> Self {
        let relay = HighlightRelay::new(events_tx.clone());
        let views = ViewManager::new(config, factory, events_tx, surface_tx);
        Self { views, relay }
    }

    pub fn views(&self) -> &ViewManager {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewManager {
        &mut self.views
    }

    pub fn overlay(&self) -> Option<&OverlayPayload> {
        self.relay.current()
    }

    pub fn dispatch(&mut self, event: SurfaceEvent) {
        let SurfaceEvent { surface, kind } = event;
        match kind {
            SurfaceEventKind::TitleChanged(title) => {
                self.views.handle_title_changed(surface, title);
            }
            SurfaceEventKind::Selection(report) => {
                self.highlight(surface, report);
            }
            SurfaceEventKind::WindowOpen(url) => {
                self.views.handle_window_open(surface, &url);
            }
        }
    }

    pub fn highlight(&mut self, surface: SurfaceId, report: SelectionReport) -> Option<OverlayPayload> {
        self.relay.highlight(&self.views, surface, report)
    }

    pub fn hide_overlay(&mut self) {
        self.relay.hide();
    }

    /// Closing a tab also withdraws an overlay it owns.
    pub fn close_tab(&mut self, id: &TabId) -> bool {
        let closed = self.views.close_tab(id);
        if closed {
            self.hide_overlay_for(id);
        }
        closed
    }

    /// Mode changes clear any pending selection for that tab.
    pub fn set_view_mode(&mut self, id: &TabId, mode: ViewMode) -> bool {
        let changed = self.views.view_mode(id).is_some_and(|m| m != mode);
        let known = self.views.set_view_mode(id, mode);
        if changed {
            self.hide_overlay_for(id);
        }
        known
    }

    pub fn toggle_view_mode(&mut self, id: &TabId) -> Option<ViewMode> {
        let next = self.views.view_mode(id)?.toggled();
        self.set_view_mode(id, next);
        Some(next)
    }

    /// Entry point for messages posted by a surface's bridge script.
    pub fn handle_bridge(&mut self, surface: SurfaceId, message: BridgeMessage) {
        if message == BridgeMessage::SwitchMode {
            let Some(id) = self.views.tab_for_surface(surface).map(|t| t.id.clone()) else {
                return;
            };
            self.toggle_view_mode(&id);
            return;
        }
        match message.into_event_kind() {
            Some(kind) => self.dispatch(SurfaceEvent { surface, kind }),
            None => debug!(surface = %surface, "Empty bridge message dropped"),
        }
    }

    fn hide_overlay_for(&mut self, id: &TabId) {
        if self.relay.current().is_some_and(|p| &p.tab_id == id) {
            self.relay.hide();
        }
    }
}

/// Drain surface events in arrival order until every port is dropped.
pub async fn run_dispatcher(host: SharedHost, mut rx: mpsc::UnboundedReceiver<SurfaceEvent>) {
    info!("Surface event dispatcher started");
    while let Some(event) = rx.recv().await {
        host.lock().await.dispatch(event);
    }
    info!("Surface event dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::fake::FakeFactory;
    use orb_core::SelectionRect;

    fn host() -> (ShellHost, FakeFactory, broadcast::Receiver<ShellEvent>, mpsc::UnboundedReceiver<SurfaceEvent>) {
        let factory = FakeFactory::default();
        let (events_tx, events_rx) = broadcast::channel(64);
        let (surface_tx, surface_rx) = mpsc::unbounded_channel();
        let host = ShellHost::new(&ShellConfig::default(), Box::new(factory.clone()), events_tx, surface_tx);
        (host, factory, events_rx, surface_rx)
    }

    fn selection(text: &str) -> SelectionReport {
        SelectionReport {
            text: text.to_string(),
            rect: SelectionRect { left: 5.0, top: 6.0, width: 10.0, height: 10.0 },
            device_pixel_ratio: 1.0,
        }
    }

    #[test]
    fn test_mode_switch_hides_owned_overlay() {
        let (mut host, factory, _rx, _srx) = host();
        let tab = host.views_mut().create_tab(None);
        let surface = factory.port(0).surface_id();
        host.highlight(surface, selection("term"));
        assert!(host.overlay().is_some());

        assert_eq!(host.toggle_view_mode(&tab), Some(ViewMode::Direct));
        assert!(host.overlay().is_none());
    }

    #[test]
    fn test_close_tab_hides_owned_overlay_only() {
        let (mut host, factory, _rx, _srx) = host();
        let a = host.views_mut().create_tab(None);
        let b = host.views_mut().create_tab(None);
        host.highlight(factory.port(1).surface_id(), selection("term"));

        assert!(host.close_tab(&a));
        assert!(host.overlay().is_some());
        assert!(host.close_tab(&b));
        assert!(host.overlay().is_none());
    }

    #[test]
    fn test_bridge_navigate_opens_tab() {
        let (mut host, factory, _rx, _srx) = host();
        host.views_mut().create_tab(None);
        let surface = factory.port(0).surface_id();

        host.handle_bridge(surface, BridgeMessage::Navigate { url: "https://next.test/".into() });
        let list = host.views().list_tabs();
        assert_eq!(list.list.len(), 2);
        assert_eq!(list.active_tab_id, Some(list.list[1].id.clone()));
    }

    #[test]
    fn test_bridge_switch_mode_toggles() {
        let (mut host, factory, _rx, _srx) = host();
        let tab = host.views_mut().create_tab(None);
        host.handle_bridge(factory.port(0).surface_id(), BridgeMessage::SwitchMode);
        assert_eq!(host.views().view_mode(&tab), Some(ViewMode::Direct));
    }

    #[tokio::test]
    async fn test_dispatcher_applies_port_events() {
        let (mut host, factory, mut events, surface_rx) = host();
        host.views_mut().create_tab(Some("https://a.test/"));
        let port = factory.port(0);
        let shared: SharedHost = Arc::new(Mutex::new(host));
        let task = tokio::spawn(run_dispatcher(shared.clone(), surface_rx));

        while events.try_recv().is_ok() {}
        port.title_changed(Some("Alpha".into()));
        port.selection(selection("word"));

        let mut saw_title = false;
        let mut saw_overlay = false;
        while !(saw_title && saw_overlay) {
            match events.recv().await.unwrap() {
                ShellEvent::TabsUpdated(list) => saw_title |= list.list[0].title == "Alpha",
                ShellEvent::OverlayShow(p) => saw_overlay |= p.selection == "word",
                ShellEvent::OverlayHide => {}
            }
        }
        assert_eq!(shared.lock().await.views().list_tabs().list[0].title, "Alpha");
        task.abort();
    }
}
