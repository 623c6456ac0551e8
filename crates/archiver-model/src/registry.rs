//! Extension based resource factory registry.

use std::collections::{BTreeMap, BTreeSet};

use crate::location::Location;
use crate::resource::{Resource, ResourceKind};

/// Extensions loaded as XML models by default.
pub const DEFAULT_MODEL_EXTENSIONS: &[&str] = &["setup", "ecore", "xmi", "genmodel", "xml"];

/// Namespace URI of the Ecore metamodel package.
pub const ECORE_NS_URI: &str = "http://www.eclipse.org/emf/2002/Ecore";

/// Extensions loaded as opaque assets by default.
pub const DEFAULT_BINARY_EXTENSIONS: &[&str] = &["gif", "png", "jpg", "jpeg", "svg", "ico"];

/// Maps file extensions to the kind of resource they are loaded as.
///
/// Locations with an unregistered extension are loaded with the default
/// kind, but only registered extensions count as "loadable" when deciding
/// whether an externally referenced asset is scheduled.
///
/// The registry also knows the namespace URIs of packages that are built
/// in. References into those are never fetched.
#[derive(Debug, Clone)]
pub struct ResourceFactoryRegistry {
    extensions: BTreeMap<String, ResourceKind>,
    packages: BTreeSet<Location>,
    default_kind: ResourceKind,
}

impl Default for ResourceFactoryRegistry {
    fn default() -> Self {
        let mut registry = Self::new(ResourceKind::Model);
        for extension in DEFAULT_MODEL_EXTENSIONS {
            registry.register(extension, ResourceKind::Model);
        }
        for extension in DEFAULT_BINARY_EXTENSIONS {
            registry.register(extension, ResourceKind::Binary);
        }
        if let Ok(ecore) = Location::parse(ECORE_NS_URI) {
            registry.register_package(ecore);
        }
        registry
    }
}

impl ResourceFactoryRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new(default_kind: ResourceKind) -> Self {
        Self {
            extensions: BTreeMap::new(),
            packages: BTreeSet::new(),
            default_kind,
        }
    }

    /// Register an extension (case-insensitive).
    pub fn register(&mut self, extension: &str, kind: ResourceKind) -> &mut Self {
        self.extensions.insert(extension.to_ascii_lowercase(), kind);
        self
    }

    /// Returns true if the extension has been registered explicitly.
    #[must_use]
    pub fn is_registered(&self, extension: &str) -> bool {
        self.extensions
            .contains_key(&extension.to_ascii_lowercase())
    }

    /// Register the namespace URI of a built-in package.
    pub fn register_package(&mut self, namespace: Location) -> &mut Self {
        self.packages.insert(namespace);
        self
    }

    /// Returns true if the location is the namespace of a registered package.
    #[must_use]
    pub fn is_package_namespace(&self, location: &Location) -> bool {
        self.packages.contains(location)
    }

    /// The kind a location is loaded as.
    #[must_use]
    pub fn kind_for(&self, location: &Location) -> ResourceKind {
        location
            .file_extension()
            .and_then(|extension| self.extensions.get(&extension.to_ascii_lowercase()))
            .copied()
            .unwrap_or(self.default_kind)
    }

    /// Create a resource for fetched bytes.
    #[must_use]
    pub fn create(&self, location: Location, bytes: Vec<u8>) -> Resource {
        let kind = self.kind_for(&location);
        Resource::parse(location, kind, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry() {
        let registry = ResourceFactoryRegistry::default();
        let image = Location::parse("https://host/icons/Project.GIF").unwrap();
        let model = Location::parse("https://host/a.setup").unwrap();
        let unknown = Location::parse("https://host/a.unknown").unwrap();

        assert_eq!(registry.kind_for(&image), ResourceKind::Binary);
        assert_eq!(registry.kind_for(&model), ResourceKind::Model);
        assert_eq!(registry.kind_for(&unknown), ResourceKind::Model);
        assert!(registry.is_registered("gif"));
        assert!(!registry.is_registered("unknown"));

        let ecore = Location::parse("http://www.eclipse.org/emf/2002/Ecore#//EString").unwrap();
        assert!(registry.is_package_namespace(&ecore));
        assert!(!registry.is_package_namespace(&model));
    }

    #[test]
    fn test_registered_packages() {
        let mut registry = ResourceFactoryRegistry::new(ResourceKind::Model);
        let namespace = Location::parse("https://setups.test/Setup/1.0").unwrap();
        assert!(!registry.is_package_namespace(&namespace));
        registry.register_package(namespace.clone());
        assert!(registry.is_package_namespace(&namespace));
    }

    #[test]
    fn test_register_overrides() {
        let mut registry = ResourceFactoryRegistry::new(ResourceKind::Binary);
        registry.register("XML", ResourceKind::Model);
        let location = Location::parse("https://host/a.xml").unwrap();
        assert_eq!(registry.kind_for(&location), ResourceKind::Model);
        let other = Location::parse("https://host/a.dat").unwrap();
        assert_eq!(registry.kind_for(&other), ResourceKind::Binary);
    }
}
