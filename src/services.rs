mod aggregate;
mod discovery;
pub mod events;
mod selector;
mod watcher;

pub use aggregate::ExitCodeAggregate;
pub use discovery::{Discovery, classify};
pub use events::{EventSink, SidecarEvent, SkipReason, TracingSink};
pub use selector::{RuntimeConnector, SelectorOptions, select_runtime};
pub use watcher::{SidecarWatcher, WaitMode};
