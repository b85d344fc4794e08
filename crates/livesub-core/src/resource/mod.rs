//! Resource identities and the content store contract.
//!
//! The subscription core only needs to enumerate resources with their
//! versions and to read a single resource back. [`MemoryResourceStore`] is the
//! in-process store used by the server and the tests.

mod memory;
mod store;

pub use memory::{MemoryResourceStore, DEFAULT_URI_PREFIX};
pub use store::{ResourceContents, ResourceId, ResourceStore, ResourceVersion, SharedResourceStore};
