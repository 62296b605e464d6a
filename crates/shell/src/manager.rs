use orb_core::config::ShellConfig;
use orb_core::{Bounds, GeometryResolver, ShellEvent, SurfaceId, TabId, TabList, WindowSize};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::mode::ViewMode;
use crate::registry::{Tab, TabRegistry};
use crate::surface::{SurfaceEvent, SurfaceFactory, SurfacePort};

/// Owns every tab and its surface. All mutations go through here and each one
/// that changes the registry pushes a fresh tab list to the control surface.
pub struct ViewManager {
    registry: TabRegistry,
    factory: Box<dyn SurfaceFactory>,
    geometry: GeometryResolver,
    window: WindowSize,
    default_url: String,
    events_tx: broadcast::Sender<ShellEvent>,
    surface_tx: mpsc::UnboundedSender<SurfaceEvent>,
    next_surface: u64,
}

impl ViewManager {
    pub fn new(
        config: &ShellConfig,
        factory: Box<dyn SurfaceFactory>,
        events_tx: broadcast::Sender<ShellEvent>,
        surface_tx: mpsc::UnboundedSender<SurfaceEvent>,
    ) -> Self {
        Self {
            registry: TabRegistry::new(),
            factory,
            geometry: GeometryResolver::new(config.chrome_height),
            window: WindowSize::new(config.window_width, config.window_height),
            default_url: config.default_url.clone(),
            events_tx,
            surface_tx,
            next_surface: 1,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ShellEvent> {
        self.events_tx.subscribe()
    }

    pub fn events_sender(&self) -> broadcast::Sender<ShellEvent> {
        self.events_tx.clone()
    }

    /// Open `url` (or the default page) in a fresh surface and make it active.
    pub fn create_tab(&mut self, url: Option<&str>) -> TabId {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(self.default_url.as_str())
            .to_string();

        let id = self.registry.allocate_id();
        let surface_id = SurfaceId(self.next_surface);
        self.next_surface += 1;

        let port = SurfacePort::new(surface_id, self.surface_tx.clone());
        let mut surface = self.factory.create(port);
        surface.load_url(&url);

        info!(tab_id = %id, surface = %surface_id, url = %url, "Tab created");
        self.registry.insert(Tab::new(id.clone(), url, surface_id, surface));
        self.activate(&id);
        self.emit_tabs();
        id
    }

    pub fn switch_tab(&mut self, id: &TabId) -> bool {
        if !self.registry.contains(id) {
            debug!(tab_id = %id, "Switch to unknown tab ignored");
            return false;
        }
        self.activate(id);
        self.emit_tabs();
        true
    }

    pub fn close_tab(&mut self, id: &TabId) -> bool {
        let was_active = self.registry.active_id() == Some(id);
        let Some(mut tab) = self.registry.remove(id) else {
            debug!(tab_id = %id, "Close of unknown tab ignored");
            return false;
        };

        if was_active {
            tab.surface_mut().detach();
        }
        if let Err(e) = tab.surface_mut().destroy() {
            warn!(tab_id = %id, error = %e, "Failed to destroy surface");
        }
        drop(tab);
        info!(tab_id = %id, remaining = self.registry.len(), "Tab closed");

        if was_active {
            if let Some(next) = self.registry.last_inserted().cloned() {
                self.activate(&next);
            }
        }
        self.emit_tabs();
        true
    }

    pub fn navigate_tab(&mut self, id: &TabId, url: &str) -> bool {
        let Some(tab) = self.registry.get_mut(id) else {
            debug!(tab_id = %id, "Navigate of unknown tab ignored");
            return false;
        };
        tab.url = url.to_string();
        tab.surface_mut().load_url(url);
        debug!(tab_id = %id, url = %url, "Tab navigated");
        self.emit_tabs();
        true
    }

    pub fn reload_tab(&mut self, id: &TabId) -> bool {
        match self.registry.get_mut(id) {
            Some(tab) => {
                tab.surface_mut().reload();
                true
            }
            None => false,
        }
    }

    pub fn list_tabs(&self) -> TabList {
        self.registry.snapshot()
    }

    pub fn active_tab_id(&self) -> Option<&TabId> {
        self.registry.active_id()
    }

    /// Live URL of a tab's surface.
    pub fn tab_url(&self, id: &TabId) -> Option<String> {
        self.registry.get(id).map(Tab::live_url)
    }

    pub fn tab_for_surface(&self, surface: SurfaceId) -> Option<&Tab> {
        self.registry.find_by_surface(surface)
    }

    pub fn surface_for_tab(&self, id: &TabId) -> Option<SurfaceId> {
        self.registry.get(id).map(Tab::surface_id)
    }

    pub fn view_mode(&self, id: &TabId) -> Option<ViewMode> {
        self.registry.get(id).map(|t| t.mode)
    }

    /// Switch the embedding mode. The surface reloads so the new mode takes effect.
    pub fn set_view_mode(&mut self, id: &TabId, mode: ViewMode) -> bool {
        let Some(tab) = self.registry.get_mut(id) else {
            return false;
        };
        if tab.mode != mode {
            tab.mode = mode;
            tab.surface_mut().reload();
            info!(tab_id = %id, mode = ?mode, "View mode changed");
        }
        true
    }

    /// Window content size changed; re-applies geometry to the visible surface.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.window = WindowSize::new(width, height);
        let bounds = self.content_bounds();
        if let Some(tab) = self.registry.active_mut() {
            tab.surface_mut().set_bounds(bounds);
        }
        debug!(width, height, content_height = bounds.height, "Window resized");
    }

    /// Recomputed from the current window size on every call.
    pub fn content_bounds(&self) -> Bounds {
        self.geometry.resolve(self.window)
    }

    pub fn handle_title_changed(&mut self, surface: SurfaceId, title: Option<String>) -> bool {
        let Some(tab) = self.registry.find_by_surface_mut(surface) else {
            debug!(surface = %surface, "Title from unknown surface dropped");
            return false;
        };
        tab.set_title(title);
        self.emit_tabs();
        true
    }

    /// A surface asked for a new window. The request always becomes a new active tab.
    pub fn handle_window_open(&mut self, surface: SurfaceId, url: &str) -> Option<TabId> {
        let opener = match self.registry.find_by_surface(surface) {
            Some(tab) => tab.id.clone(),
            None => {
                debug!(surface = %surface, "Window-open from unknown surface dropped");
                return None;
            }
        };
        let id = self.create_tab(Some(url));
        info!(opener = %opener, tab_id = %id, "Window-open mirrored into new tab");
        Some(id)
    }

    /// Detach whatever is visible, attach `id` at the current bounds and mark it active.
    fn activate(&mut self, id: &TabId) {
        let bounds = self.content_bounds();
        let previous = self.registry.active_id().cloned();
        if let Some(prev) = previous.filter(|p| p != id) {
            if let Some(tab) = self.registry.get_mut(&prev) {
                tab.surface_mut().detach();
            }
        }
        if let Some(tab) = self.registry.get_mut(id) {
            tab.surface_mut().attach(bounds);
        }
        self.registry.set_active(id);
    }

    fn emit_tabs(&self) {
        if self.events_tx.send(ShellEvent::TabsUpdated(self.registry.snapshot())).is_err() {
            debug!("No control surface subscribed to tab updates");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::fake::FakeFactory;

    fn manager_with(factory: FakeFactory) -> (ViewManager, broadcast::Receiver<ShellEvent>) {
        let (events_tx, events_rx) = broadcast::channel(64);
        let (surface_tx, _surface_rx) = mpsc::unbounded_channel();
        let manager = ViewManager::new(&ShellConfig::default(), Box::new(factory), events_tx, surface_tx);
        (manager, events_rx)
    }

    fn drain(rx: &mut broadcast::Receiver<ShellEvent>) -> Vec<ShellEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    fn last_list(rx: &mut broadcast::Receiver<ShellEvent>) -> TabList {
        match drain(rx).pop() {
            Some(ShellEvent::TabsUpdated(list)) => list,
            other => panic!("expected tab update, got {:?}", other),
        }
    }

    #[test]
    fn test_create_tab_becomes_active() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());

        let a = vm.create_tab(None);
        assert_eq!(factory.state(0).loads, vec!["https://example.com".to_string()]);
        let b = vm.create_tab(Some("https://b.test/"));

        let list = last_list(&mut rx);
        assert_eq!(list.active_tab_id, Some(b.clone()));
        assert_eq!(list.list.len(), 2);
        assert!(!list.list[0].active);
        assert!(list.list[1].active);
        assert_ne!(a, b);
        assert_eq!(vm.surface_for_tab(&a), Some(SurfaceId(1)));
        assert_eq!(vm.surface_for_tab(&b), Some(SurfaceId(2)));
        assert_eq!(factory.attached_count(), 1);
        assert!(factory.state(1).attached);
    }

    #[test]
    fn test_switch_unknown_is_noop() {
        let (mut vm, mut rx) = manager_with(FakeFactory::default());
        let a = vm.create_tab(None);
        drain(&mut rx);

        assert!(!vm.switch_tab(&TabId::from("42")));
        assert_eq!(vm.active_tab_id(), Some(&a));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_switch_moves_attachment() {
        let factory = FakeFactory::default();
        let (mut vm, _rx) = manager_with(factory.clone());
        let a = vm.create_tab(Some("https://a.test/"));
        vm.create_tab(Some("https://b.test/"));

        assert!(vm.switch_tab(&a));
        assert!(factory.state(0).attached);
        assert!(!factory.state(1).attached);
        assert_eq!(factory.state(0).bounds, Some(Bounds { x: 0, y: 40, width: 1300, height: 860 }));
        assert_eq!(factory.attached_count(), 1);
    }

    #[test]
    fn test_close_active_promotes_last_inserted() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());
        let a = vm.create_tab(Some("https://a.test/"));
        let b = vm.create_tab(Some("https://b.test/"));
        let c = vm.create_tab(Some("https://c.test/"));
        vm.switch_tab(&b);

        assert!(vm.close_tab(&b));
        assert!(factory.state(1).destroyed);
        assert!(!factory.state(1).attached);
        assert_eq!(vm.active_tab_id(), Some(&c));
        assert!(factory.state(2).attached);

        let list = last_list(&mut rx);
        let ids: Vec<_> = list.list.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids, vec![a, c]);
    }

    #[test]
    fn test_close_background_keeps_active() {
        let (mut vm, _rx) = manager_with(FakeFactory::default());
        let a = vm.create_tab(None);
        let b = vm.create_tab(None);
        assert!(vm.close_tab(&a));
        assert_eq!(vm.active_tab_id(), Some(&b));
    }

    #[test]
    fn test_close_last_tab_clears_active() {
        let (mut vm, mut rx) = manager_with(FakeFactory::default());
        let a = vm.create_tab(None);
        assert!(vm.close_tab(&a));
        let list = last_list(&mut rx);
        assert!(list.active_tab_id.is_none());
        assert!(list.list.is_empty());
        assert!(!vm.close_tab(&a));
    }

    #[test]
    fn test_close_unknown_keeps_active() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());
        vm.create_tab(Some("https://a.test/"));
        let b = vm.create_tab(Some("https://b.test/"));
        drain(&mut rx);

        assert!(!vm.close_tab(&TabId::from("42")));
        assert_eq!(vm.active_tab_id(), Some(&b));
        assert_eq!(vm.list_tabs().list.len(), 2);
        assert!(factory.state(1).attached);
        assert!(!factory.state(1).destroyed);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_ids_not_reused_after_close() {
        let (mut vm, _rx) = manager_with(FakeFactory::default());
        let a = vm.create_tab(None);
        vm.close_tab(&a);
        let b = vm.create_tab(None);
        assert_ne!(a, b);
    }

    #[test]
    fn test_navigate_keeps_active() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());
        let a = vm.create_tab(Some("https://a.test/"));
        let b = vm.create_tab(Some("https://b.test/"));
        drain(&mut rx);

        assert!(vm.navigate_tab(&a, "https://a.test/next"));
        assert_eq!(vm.active_tab_id(), Some(&b));
        assert_eq!(factory.state(0).loads.last().map(String::as_str), Some("https://a.test/next"));
        let list = last_list(&mut rx);
        assert_eq!(list.list[0].url, "https://a.test/next");

        assert!(!vm.navigate_tab(&TabId::from("9"), "https://x.test/"));
    }

    #[test]
    fn test_reload_does_not_emit() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());
        let a = vm.create_tab(None);
        drain(&mut rx);

        assert!(vm.reload_tab(&a));
        assert!(!vm.reload_tab(&TabId::from("9")));
        assert_eq!(factory.state(0).reloads, 1);
        assert_eq!(vm.active_tab_id(), Some(&a));
        assert!(factory.state(0).attached);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_list_uses_live_url_after_redirect() {
        let factory = FakeFactory {
            redirect_to: Some("https://www.a.test/landing".into()),
            ..Default::default()
        };
        let (mut vm, _rx) = manager_with(factory);
        vm.create_tab(Some("https://a.test/"));
        let list = vm.list_tabs();
        assert_eq!(list.list[0].url, "https://www.a.test/landing");
        assert_eq!(list.list[0].title, "https://a.test/");
    }

    #[test]
    fn test_title_event_updates_tab() {
        let factory = FakeFactory::default();
        let (mut vm, mut rx) = manager_with(factory.clone());
        vm.create_tab(Some("https://a.test/"));
        let surface = factory.port(0).surface_id();
        drain(&mut rx);

        assert!(vm.handle_title_changed(surface, Some("Alpha".into())));
        assert_eq!(last_list(&mut rx).list[0].title, "Alpha");

        vm.handle_title_changed(surface, Some(String::new()));
        assert_eq!(last_list(&mut rx).list[0].title, "https://a.test/");

        assert!(!vm.handle_title_changed(SurfaceId(999), Some("x".into())));
    }

    #[test]
    fn test_window_open_creates_and_switches() {
        let factory = FakeFactory::default();
        let (mut vm, _rx) = manager_with(factory.clone());
        let a = vm.create_tab(Some("https://a.test/"));
        let opener = factory.port(0).surface_id();

        let b = vm.handle_window_open(opener, "https://popup.test/").unwrap();
        assert_ne!(a, b);
        assert_eq!(vm.active_tab_id(), Some(&b));
        assert_eq!(factory.state(1).loads, vec!["https://popup.test/".to_string()]);
        // The opener never navigated in place.
        assert_eq!(factory.state(0).loads.len(), 1);

        assert!(vm.handle_window_open(SurfaceId(999), "https://x.test/").is_none());
    }

    #[test]
    fn test_resize_reapplies_bounds() {
        let factory = FakeFactory::default();
        let (mut vm, _rx) = manager_with(factory.clone());
        vm.create_tab(None);

        vm.resize(800, 600);
        assert_eq!(factory.state(0).bounds, Some(Bounds { x: 0, y: 40, width: 800, height: 560 }));

        vm.resize(800, 30);
        assert_eq!(vm.content_bounds().height, 0);
        assert!(!factory.state(0).destroyed);
    }

    #[test]
    fn test_set_view_mode_reloads_once() {
        let factory = FakeFactory::default();
        let (mut vm, _rx) = manager_with(factory.clone());
        let a = vm.create_tab(None);
        assert_eq!(vm.view_mode(&a), Some(ViewMode::Enhanced));

        assert!(vm.set_view_mode(&a, ViewMode::Direct));
        assert!(vm.set_view_mode(&a, ViewMode::Direct));
        assert_eq!(factory.state(0).reloads, 1);
        assert!(!vm.set_view_mode(&TabId::from("7"), ViewMode::Direct));
    }
}
