//! The result of a mirroring run.

use std::collections::BTreeMap;

use archiver_model::{Location, Resource};

/// Resources loaded during a run, keyed by their normalized location.
#[derive(Debug, Default)]
pub struct MirroredSet {
    resources: BTreeMap<Location, Resource>,
}

impl MirroredSet {
    /// An empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource, replacing any previous one for the same location.
    pub fn insert(&mut self, resource: Resource) {
        self.resources
            .insert(resource.location().clone(), resource);
    }

    /// Returns true if a resource for the location has been loaded.
    #[must_use]
    pub fn contains(&self, location: &Location) -> bool {
        self.resources.contains_key(location)
    }

    /// The resource loaded from a location.
    #[must_use]
    pub fn get(&self, location: &Location) -> Option<&Resource> {
        self.resources.get(location)
    }

    /// Mutable access to the resource loaded from a location.
    pub fn get_mut(&mut self, location: &Location) -> Option<&mut Resource> {
        self.resources.get_mut(location)
    }

    /// Number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing was loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources in location order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    /// Mutable resources in location order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Resource> {
        self.resources.values_mut()
    }

    /// Loaded locations in order.
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.resources.keys()
    }

    /// Resources that failed to load or loaded with errors.
    pub fn failures(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .values()
            .filter(|resource| !resource.is_loaded_cleanly())
    }
}
