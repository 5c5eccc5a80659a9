//! The lookup dispatcher that sits between a mail transport agent's
//! routing and ACL engine and its pluggable table back-ends.
//!
//! Call sites parse a decorated lookup type ([`parse_type`]), split their
//! search argument per driver style ([`split_args`]), open a handle
//! ([`Dispatcher::open`]) and run queries through it
//! ([`Dispatcher::find`]). Behind that surface sit two cooperating
//! caches: a handle cache that keeps backend resources open across
//! lookups under an LRU-enforced file budget, and a per-handle item
//! cache that remembers results with driver-controlled TTLs.

mod args;
mod config;
mod dispatcher;
mod error;
mod expansion;
mod handle_cache;
mod item_cache;
mod metadata;
mod registry;
mod taint;
mod traits;
mod type_spec;
mod wildcard;

pub use args::{SplitArgs, split_args};
pub use config::{DispatcherConfig, TaintPolicy};
pub use dispatcher::{Dispatcher, Handle};
pub use error::LookupError;
pub use expansion::{CapturedExpansion, DiscardExpansion, ExpansionSink};
pub use metadata::{DriverCapabilities, DriverMetadata, QueryStyle};
pub use registry::{DriverIndex, KNOWN_DRIVER_NAMES, Registry};
pub use taint::Text;
pub use traits::{CacheTtl, DriverState, FileConstraints, LookupDriver};
pub use type_spec::{PartialSpec, StarFlags, TypeSpec, parse_type};
