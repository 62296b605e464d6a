pub mod config;
pub mod error;
pub mod geometry;
pub mod paths;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use geometry::{resolve_content_bounds, Bounds, GeometryResolver, WindowSize};
pub use paths::Paths;
pub use types::{OverlayPayload, SelectionRect, ShellEvent, SurfaceId, TabId, TabList, TabSummary};
