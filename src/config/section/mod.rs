//! Configuration section definitions.

mod ignore;
mod proxy;
mod watcher;

pub use ignore::IgnoreConfig;
pub use proxy::ProxyConfig;
pub use watcher::WatcherConfig;
