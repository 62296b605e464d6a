pub mod context;
pub mod embed;
pub mod fetch;
pub mod guard;
pub mod resolve;
pub mod rewrite;
pub mod service;

pub use context::{truncate_chars, PageContext};
pub use embed::{embed, BRIDGE_SCRIPT};
pub use fetch::{FetchedPage, Fetcher};
pub use guard::{check_target, BLOCKED_HOSTS};
pub use resolve::{is_absolute, resolve_reference};
pub use rewrite::rewrite;
pub use service::{EmbeddedPage, ProxyOutcome, ProxyService, CACHE_CONTROL, CONTENT_TYPE_HTML, FRAME_OPTIONS};
