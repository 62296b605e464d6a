pub mod bus;
pub mod host;
pub mod manager;
pub mod mode;
pub mod registry;
pub mod relay;
pub mod surface;

pub use bus::ShellBus;
pub use host::{run_dispatcher, SharedHost, ShellHost};
pub use manager::ViewManager;
pub use mode::{BridgeMessage, ViewMode, MAX_BRIDGE_SELECTION_CHARS};
pub use registry::{Tab, TabRegistry};
pub use relay::HighlightRelay;
pub use surface::{
    ContentSurface, SelectionReport, SurfaceEvent, SurfaceEventKind, SurfaceFactory, SurfacePort,
    WindowOpenDisposition,
};
