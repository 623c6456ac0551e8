//! Objects contained in a model resource.

use std::collections::BTreeMap;

use crate::location::Location;

/// Type name of class-like objects in Ecore models.
pub const CLASS_TYPE: &str = "ecore:EClass";

/// One object of a parsed model resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelObject {
    /// `xsi:type` of the element, or the element name when untyped.
    pub type_name: String,
    /// Value of the `name` attribute.
    pub name: Option<String>,
    /// Value of the `xmi:id` or `id` attribute.
    pub id: Option<String>,
    /// Fragment path addressing this object within its resource.
    pub path: String,
    /// Whether the object is declared `abstract="true"`.
    pub is_abstract: bool,
    /// Index of the containing object, `None` for roots.
    pub parent: Option<usize>,
    /// Annotations attached to the object.
    pub annotations: Vec<Annotation>,
    /// Outgoing references to other resources.
    pub references: Vec<Reference>,
}

impl ModelObject {
    /// Returns true for class-like objects (`ecore:EClass`).
    #[must_use]
    pub fn is_class(&self) -> bool {
        self.type_name == CLASS_TYPE
    }

    /// The first annotation with the given source.
    #[must_use]
    pub fn annotation(&self, source: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.source == source)
    }
}

/// A keyed annotation (`eAnnotations` element) on a model object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    /// Annotation source URI.
    pub source: String,
    /// Key/value details.
    pub details: BTreeMap<String, String>,
}

impl Annotation {
    /// Look up a detail value.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

/// A cross-resource reference discovered in a model object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Attribute that held the reference.
    pub feature: String,
    /// Resource the reference points into.
    pub target: Location,
    /// Object fragment within the target, when given.
    pub fragment: Option<String>,
}
