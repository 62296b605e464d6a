use std::collections::HashMap;

use orb_core::{SurfaceId, TabId, TabList, TabSummary};

use crate::mode::ViewMode;
use crate::surface::ContentSurface;

/// A registry slot: one tab and the surface it exclusively owns.
pub struct Tab {
    pub id: TabId,
    /// Last requested URL. The live URL comes from the surface.
    pub url: String,
    pub title: String,
    pub mode: ViewMode,
    surface_id: SurfaceId,
    surface: Box<dyn ContentSurface>,
}

impl Tab {
    pub fn new(id: TabId, url: String, surface_id: SurfaceId, surface: Box<dyn ContentSurface>) -> Self {
        Self {
            id,
            title: url.clone(),
            url,
            mode: ViewMode::default(),
            surface_id,
            surface,
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface_id
    }

    pub fn surface(&self) -> &dyn ContentSurface {
        self.surface.as_ref()
    }

    pub fn surface_mut(&mut self) -> &mut dyn ContentSurface {
        self.surface.as_mut()
    }

    pub fn live_url(&self) -> String {
        self.surface.url()
    }

    /// Empty titles fall back to the tab's URL.
    pub fn set_title(&mut self, title: Option<String>) {
        self.title = match title {
            Some(t) if !t.trim().is_empty() => t,
            _ => self.url.clone(),
        };
    }
}

/// Tab id → tab, with insertion order and a single active pointer.
pub struct TabRegistry {
    tabs: HashMap<TabId, Tab>,
    order: Vec<TabId>,
    active: Option<TabId>,
    next_id: u64,
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TabRegistry {
    pub fn new() -> Self {
        Self {
            tabs: HashMap::new(),
            order: Vec::new(),
            active: None,
            next_id: 1,
        }
    }

    /// Next id from the process-lifetime counter. Ids are never handed out twice.
    pub fn allocate_id(&mut self) -> TabId {
        let id = self.next_id;
        self.next_id += 1;
        TabId(id.to_string())
    }

    pub fn insert(&mut self, tab: Tab) {
        let id = tab.id.clone();
        if self.tabs.insert(id.clone(), tab).is_none() {
            self.order.push(id);
        }
    }

    /// Remove a tab, clearing the active pointer if it pointed at it.
    pub fn remove(&mut self, id: &TabId) -> Option<Tab> {
        let tab = self.tabs.remove(id)?;
        self.order.retain(|t| t != id);
        if self.active.as_ref() == Some(id) {
            self.active = None;
        }
        Some(tab)
    }

    pub fn contains(&self, id: &TabId) -> bool {
        self.tabs.contains_key(id)
    }

    pub fn get(&self, id: &TabId) -> Option<&Tab> {
        self.tabs.get(id)
    }

    pub fn get_mut(&mut self, id: &TabId) -> Option<&mut Tab> {
        self.tabs.get_mut(id)
    }

    /// Identity lookup from an emitting surface back to its tab.
    pub fn find_by_surface(&self, surface: SurfaceId) -> Option<&Tab> {
        self.tabs.values().find(|t| t.surface_id == surface)
    }

    pub fn find_by_surface_mut(&mut self, surface: SurfaceId) -> Option<&mut Tab> {
        self.tabs.values_mut().find(|t| t.surface_id == surface)
    }

    pub fn active_id(&self) -> Option<&TabId> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Tab> {
        let id = self.active.as_ref()?;
        self.tabs.get_mut(id)
    }

    /// Only ids present in the registry can become active.
    pub fn set_active(&mut self, id: &TabId) -> bool {
        if !self.tabs.contains_key(id) {
            return false;
        }
        self.active = Some(id.clone());
        true
    }

    pub fn last_inserted(&self) -> Option<&TabId> {
        self.order.last()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &TabId> {
        self.order.iter()
    }

    pub fn snapshot(&self) -> TabList {
        let list = self
            .order
            .iter()
            .filter_map(|id| self.tabs.get(id))
            .map(|tab| {
                let url = tab.live_url();
                let title = if tab.title.is_empty() { tab.url.clone() } else { tab.title.clone() };
                TabSummary {
                    id: tab.id.clone(),
                    url,
                    title,
                    active: self.active.as_ref() == Some(&tab.id),
                }
            })
            .collect();

        TabList {
            active_tab_id: self.active.clone(),
            list,
        }
    }
}
