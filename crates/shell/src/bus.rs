use orb_core::ShellEvent;
use tokio::sync::{broadcast, mpsc};

use crate::surface::SurfaceEvent;

/// Channels joining surfaces, the shell host and the control surface.
pub struct ShellBus {
    /// Fan-out to every connected control surface.
    pub events_tx: broadcast::Sender<ShellEvent>,
    /// Cloned into each surface's port.
    pub surface_tx: mpsc::UnboundedSender<SurfaceEvent>,
    pub surface_rx: mpsc::UnboundedReceiver<SurfaceEvent>,
}

impl ShellBus {
    pub fn new(buffer_size: usize) -> Self {
        let (events_tx, _) = broadcast::channel(buffer_size);
        let (surface_tx, surface_rx) = mpsc::unbounded_channel();
        Self {
            events_tx,
            surface_tx,
            surface_rx,
        }
    }

    pub fn split(
        self,
    ) -> (
        broadcast::Sender<ShellEvent>,
        (mpsc::UnboundedSender<SurfaceEvent>, mpsc::UnboundedReceiver<SurfaceEvent>),
    ) {
        (self.events_tx, (self.surface_tx, self.surface_rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfacePort;
    use orb_core::SurfaceId;

    #[tokio::test]
    async fn test_split_keeps_channels_connected() {
        let bus = ShellBus::new(8);
        let (events_tx, (surface_tx, mut surface_rx)) = bus.split();
        let mut events_rx = events_tx.subscribe();

        SurfacePort::new(SurfaceId(3), surface_tx).title_changed(None);
        assert_eq!(surface_rx.recv().await.map(|e| e.surface), Some(SurfaceId(3)));

        events_tx.send(ShellEvent::OverlayHide).unwrap();
        assert_eq!(events_rx.recv().await.unwrap(), ShellEvent::OverlayHide);
    }
}
