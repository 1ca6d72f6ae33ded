//! Cache registry and introspection
//!
//! Every cache is created through a [`CacheRegistry`] and stays listed there
//! until its [`CacheHandle`] is destroyed. Snapshots walk the registry for
//! diagnostics.

pub mod handle;
#[allow(clippy::module_inception)]
pub mod registry;
pub mod snapshot;

pub use handle::CacheHandle;
pub use registry::CacheRegistry;
pub use snapshot::{CacheSnapshot, RegistrySnapshot};
