//! Headless content surface backed by the proxy fetcher.
//!
//! The gateway has no rendering engine of its own: a surface loads its page
//! through [`ProxyService`], remembers where redirects landed and reports the
//! page title back through its port. The control surface renders the frame
//! from `GET /v1/tabs/:id/content`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use orb_core::{Bounds, Result};
use orb_proxy::{PageContext, ProxyService};
use orb_shell::{ContentSurface, SurfacePort};
use tracing::{debug, warn};

pub struct ProxiedSurface {
    port: SurfacePort,
    proxy: ProxyService,
    live_url: Arc<Mutex<String>>,
    /// Bumped on every load and on destroy. A fetch only reports while its number is current.
    generation: Arc<AtomicU64>,
    bounds: Option<Bounds>,
}

impl ProxiedSurface {
    pub fn new(port: SurfacePort, proxy: ProxyService) -> Self {
        Self {
            port,
            proxy,
            live_url: Arc::new(Mutex::new(String::new())),
            generation: Arc::new(AtomicU64::new(0)),
            bounds: None,
        }
    }

    fn start_load(&self, url: String) {
        let load = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(surface = %self.port.surface_id(), "No runtime, page load skipped");
            return;
        };

        let port = self.port.clone();
        let proxy = self.proxy.clone();
        let live_url = Arc::clone(&self.live_url);
        let generation = Arc::clone(&self.generation);

        runtime.spawn(async move {
            let result = proxy.fetch_checked(Some(&url)).await;
            if generation.load(Ordering::SeqCst) != load {
                debug!(surface = %port.surface_id(), url = %url, "Superseded load dropped");
                return;
            }
            match result {
                Ok(page) => {
                    let context = PageContext::extract(&page.body, &page.final_url);
                    store_url(&live_url, page.final_url);
                    let title = Some(context.title).filter(|t| !t.trim().is_empty());
                    port.title_changed(title);
                }
                Err(e) => {
                    warn!(surface = %port.surface_id(), url = %url, error = %e, "Page load failed");
                    port.title_changed(None);
                }
            }
        });
    }
}

fn store_url(slot: &Mutex<String>, url: String) {
    match slot.lock() {
        Ok(mut guard) => *guard = url,
        Err(poisoned) => *poisoned.into_inner() = url,
    }
}

impl ContentSurface for ProxiedSurface {
    fn load_url(&mut self, url: &str) {
        store_url(&self.live_url, url.to_string());
        self.start_load(url.to_string());
    }

    fn reload(&mut self) {
        let url = self.url();
        self.start_load(url);
    }

    fn url(&self) -> String {
        match self.live_url.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn attach(&mut self, bounds: Bounds) {
        debug!(surface = %self.port.surface_id(), ?bounds, "Surface attached");
        self.bounds = Some(bounds);
    }

    fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = Some(bounds);
    }

    fn detach(&mut self) {
        self.bounds = None;
    }

    fn destroy(&mut self) -> Result<()> {
        // In-flight fetches run to completion but no longer report.
        self.generation.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
