//! Resource store contract.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Opaque identifier of a resource, usually a URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    /// Create a resource identifier.
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceId {
    fn from(uri: &str) -> Self {
        Self(uri.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(uri: String) -> Self {
        Self(uri)
    }
}

/// A resource identity paired with its current version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceVersion {
    pub id: ResourceId,
    pub version: u64,
}

impl ResourceVersion {
    /// Version a resource carries when it is created.
    pub const INITIAL: u64 = 1;
}

/// Text content of a resource at a given version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: ResourceId,
    pub mime_type: String,
    pub text: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

/// Source of resource identities, versions and content.
///
/// Implementations must return promptly; all methods are called from the
/// broadcaster's scan loop or from request handlers. Resources start at
/// [`ResourceVersion::INITIAL`] and every change raises the version.
pub trait ResourceStore: Send + Sync {
    /// Enumerate every known resource with its current version.
    fn list(&self) -> Vec<ResourceVersion>;

    /// Read a resource, failing with [`crate::Error::ResourceNotFound`] when
    /// the store does not recognize it. May create the resource.
    fn read(&self, id: &ResourceId) -> Result<ResourceContents>;

    /// Look up an existing resource without creating it.
    fn get(&self, id: &ResourceId) -> Result<ResourceContents>;
}

/// Shared resource store handle.
pub type SharedResourceStore = Arc<dyn ResourceStore>;
