//! Loaded resources.

use chrono::{DateTime, Utc};

use crate::diagnostic::Diagnostic;
use crate::location::Location;
use crate::object::{ModelObject, Reference};
use crate::xml::parse_model;

/// How the bytes of a resource are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// XML model parsed into objects and references.
    Model,
    /// Opaque asset such as an image; never traversed.
    Binary,
}

impl ResourceKind {
    /// Get a human-readable label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Binary => "binary",
        }
    }
}

/// Content loaded from one [`Location`] during a mirroring run.
///
/// The bytes are the verified fetch result and are what gets persisted to
/// the archive; the objects are derived from them for model resources.
#[derive(Debug, Clone)]
pub struct Resource {
    location: Location,
    kind: ResourceKind,
    bytes: Vec<u8>,
    objects: Vec<ModelObject>,
    namespaces: Vec<Location>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    time_stamp: Option<DateTime<Utc>>,
}

impl Resource {
    /// Build a resource from fetched bytes.
    pub fn parse(location: Location, kind: ResourceKind, bytes: Vec<u8>) -> Self {
        let (objects, namespaces, errors) = match kind {
            ResourceKind::Model => {
                let parsed = parse_model(&location, &bytes);
                (parsed.objects, parsed.namespaces, parsed.errors)
            }
            ResourceKind::Binary => (Vec::new(), Vec::new(), Vec::new()),
        };
        Self {
            location,
            kind,
            bytes,
            objects,
            namespaces,
            errors,
            warnings: Vec::new(),
            time_stamp: None,
        }
    }

    /// A resource whose content could not be fetched at all.
    pub fn failed(location: Location, kind: ResourceKind, diagnostic: Diagnostic) -> Self {
        Self {
            location,
            kind,
            bytes: Vec::new(),
            objects: Vec::new(),
            namespaces: Vec::new(),
            errors: vec![diagnostic],
            warnings: Vec::new(),
            time_stamp: None,
        }
    }

    /// The location this resource was loaded from.
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The resource kind.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// The fetched bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Contained objects, in document order.
    #[must_use]
    pub fn objects(&self) -> &[ModelObject] {
        &self.objects
    }

    /// Namespace URIs declared by the document.
    #[must_use]
    pub fn namespaces(&self) -> &[Location] {
        &self.namespaces
    }

    /// Returns true if the target names a namespace this document declares.
    ///
    /// Such references address a registered package rather than a document
    /// that could be fetched.
    #[must_use]
    pub fn declares_namespace(&self, target: &Location) -> bool {
        self.namespaces.contains(target)
    }

    /// Structural errors found while loading.
    #[must_use]
    pub fn errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Non-fatal problems such as unresolved proxies.
    #[must_use]
    pub fn warnings(&self) -> &[Diagnostic] {
        &self.warnings
    }

    /// When the resource was last saved with changed content.
    #[must_use]
    pub fn time_stamp(&self) -> Option<DateTime<Utc>> {
        self.time_stamp
    }

    /// Returns true if there is no content to persist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self.kind {
            ResourceKind::Model => self.objects.is_empty(),
            ResourceKind::Binary => self.bytes.is_empty(),
        }
    }

    /// Returns true if the resource has content and no structural errors.
    #[must_use]
    pub fn is_loaded_cleanly(&self) -> bool {
        !self.is_empty() && self.errors.is_empty()
    }

    /// All outgoing references of all objects.
    pub fn references(&self) -> impl Iterator<Item = &Reference> {
        self.objects.iter().flat_map(|object| object.references.iter())
    }

    /// Find the object addressed by a fragment path or id.
    #[must_use]
    pub fn resolve_fragment(&self, fragment: &str) -> Option<&ModelObject> {
        self.objects
            .iter()
            .find(|object| object.path == fragment || object.id.as_deref() == Some(fragment))
    }

    /// Record a non-fatal problem.
    pub fn add_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }

    /// Mark the resource as saved now.
    pub fn touch(&mut self) {
        self.time_stamp = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(path: &str) -> Location {
        Location::parse(&format!("https://host/{path}")).unwrap()
    }

    #[test]
    fn test_model_resource() {
        let bytes = br#"<m:Root xmlns:m="m" name="r"><child name="c" ref="other.setup#//x"/></m:Root>"#;
        let resource = Resource::parse(location("a.setup"), ResourceKind::Model, bytes.to_vec());
        assert!(resource.is_loaded_cleanly());
        assert_eq!(resource.objects().len(), 2);
        assert_eq!(resource.references().count(), 1);
        assert_eq!(resource.resolve_fragment("//c").map(|o| o.path.as_str()), Some("//c"));
        assert!(resource.resolve_fragment("//missing").is_none());
    }

    #[test]
    fn test_declared_namespace_references() {
        let bytes = br#"<ecore:EPackage xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="p">
            <eClassifiers name="C" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
        </ecore:EPackage>"#;
        let resource = Resource::parse(location("p.ecore"), ResourceKind::Model, bytes.to_vec());
        let reference = resource.references().next().unwrap();
        assert!(resource.declares_namespace(&reference.target));
        assert!(!resource.declares_namespace(&location("p.ecore")));
    }

    #[test]
    fn test_binary_resource() {
        let resource = Resource::parse(location("icon.gif"), ResourceKind::Binary, vec![0x47, 0x49]);
        assert!(resource.is_loaded_cleanly());
        assert!(resource.objects().is_empty());
        assert_eq!(resource.bytes(), &[0x47, 0x49]);
    }

    #[test]
    fn test_empty_resources_are_not_clean() {
        let binary = Resource::parse(location("icon.gif"), ResourceKind::Binary, Vec::new());
        assert!(binary.is_empty());
        assert!(!binary.is_loaded_cleanly());

        let model = Resource::parse(location("a.setup"), ResourceKind::Model, Vec::new());
        assert!(model.is_empty());
        assert!(!model.is_loaded_cleanly());
    }

    #[test]
    fn test_failed_resource() {
        let resource = Resource::failed(
            location("a.setup"),
            ResourceKind::Model,
            Diagnostic::new("connection refused"),
        );
        assert!(!resource.is_loaded_cleanly());
        assert_eq!(resource.errors().len(), 1);
    }

    #[test]
    fn test_touch_sets_time_stamp() {
        let mut resource = Resource::parse(location("icon.gif"), ResourceKind::Binary, vec![1]);
        assert!(resource.time_stamp().is_none());
        resource.touch();
        assert!(resource.time_stamp().is_some());
    }
}
