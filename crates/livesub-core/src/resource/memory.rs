//! In-memory resource store with create-on-first-read semantics.

use chrono::{SecondsFormat, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::store::{ResourceContents, ResourceId, ResourceStore, ResourceVersion};
use crate::error::{Error, Result};

/// URI prefix of resources that are created on first read.
pub const DEFAULT_URI_PREFIX: &str = "test://resource/";

const MIME_TEXT: &str = "text/plain";

/// Resource store backed by a concurrent map.
///
/// Reading an unknown URI of the form `<prefix><numeric id>` creates the
/// resource at version 1. Any other unknown URI is reported as not found.
pub struct MemoryResourceStore {
    resources: DashMap<ResourceId, ResourceContents>,
    uri_prefix: String,
}

impl MemoryResourceStore {
    /// Create an empty store using [`DEFAULT_URI_PREFIX`].
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_URI_PREFIX)
    }

    /// Create an empty store that auto-creates URIs under `prefix`.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            resources: DashMap::new(),
            uri_prefix: prefix.into(),
        }
    }

    /// Whether `id` names a resource this store may create on demand.
    pub fn accepts(&self, id: &ResourceId) -> bool {
        match id.as_str().strip_prefix(self.uri_prefix.as_str()) {
            Some(rest) => {
                !rest.is_empty()
                    && rest.bytes().all(|b| b.is_ascii_digit())
                    && rest.parse::<u64>().is_ok()
            }
            None => false,
        }
    }

    /// Create a resource if it does not already exist.
    ///
    /// Concurrent callers racing on the same URI observe a single creation.
    pub fn create(&self, id: &ResourceId) -> Result<ResourceContents> {
        if !self.accepts(id) {
            return Err(Error::ResourceNotFound(id.clone()));
        }

        let contents = match self.resources.entry(id.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                let now = Utc::now();
                let contents = ResourceContents {
                    uri: id.clone(),
                    mime_type: MIME_TEXT.to_string(),
                    text: format!(
                        "Created at {}",
                        now.to_rfc3339_opts(SecondsFormat::Micros, true)
                    ),
                    version: ResourceVersion::INITIAL,
                    updated_at: now,
                };
                tracing::debug!(uri = %id, "resource created");
                entry.insert(contents).clone()
            }
        };

        Ok(contents)
    }

    /// Bump a resource's version and refresh its content.
    ///
    /// Returns the new version.
    pub fn touch(&self, id: &ResourceId) -> Result<u64> {
        let mut entry = self
            .resources
            .get_mut(id)
            .ok_or_else(|| Error::ResourceNotFound(id.clone()))?;
        let version = Self::bump(entry.value_mut());
        tracing::trace!(uri = %id, version, "resource touched");
        Ok(version)
    }

    /// Bump every resource. Returns the number of resources updated.
    pub fn touch_all(&self) -> usize {
        let mut updated = 0;
        for mut entry in self.resources.iter_mut() {
            Self::bump(entry.value_mut());
            updated += 1;
        }
        updated
    }

    /// Remove a resource. Returns whether it existed.
    pub fn remove(&self, id: &ResourceId) -> bool {
        self.resources.remove(id).is_some()
    }

    /// Number of resources currently held.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether the store holds no resources.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    fn bump(contents: &mut ResourceContents) -> u64 {
        let now = Utc::now();
        contents.version += 1;
        contents.updated_at = now;
        contents.text = format!(
            "Updated at {}",
            now.to_rfc3339_opts(SecondsFormat::Micros, true)
        );
        contents.version
    }
}

impl Default for MemoryResourceStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceStore for MemoryResourceStore {
    fn list(&self) -> Vec<ResourceVersion> {
        let mut listing: Vec<ResourceVersion> = self
            .resources
            .iter()
            .map(|entry| ResourceVersion {
                id: entry.key().clone(),
                version: entry.value().version,
            })
            .collect();
        listing.sort_by(|a, b| a.id.cmp(&b.id));
        listing
    }

    fn read(&self, id: &ResourceId) -> Result<ResourceContents> {
        match self.get(id) {
            Ok(contents) => Ok(contents),
            Err(_) => self.create(id),
        }
    }

    fn get(&self, id: &ResourceId) -> Result<ResourceContents> {
        self.resources
            .get(id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ResourceNotFound(id.clone()))
    }
}
