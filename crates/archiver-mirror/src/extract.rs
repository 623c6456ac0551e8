//! Out-of-band reference extraction.

use archiver_model::{Location, ModelObject, Resource, ResourceFactoryRegistry};
use tracing::trace;

/// Source of the label provider annotation that carries class icons.
pub const LABEL_PROVIDER_ANNOTATION: &str = "http://www.eclipse.org/oomph/base/LabelProvider";

/// Detail key naming the icon of a class.
pub const IMAGE_URI_DETAIL: &str = "imageURI";

/// Strategy invoked for every object of a traversed resource.
///
/// Returned locations are scheduled as assets: they are loaded and
/// mirrored but their content is never traversed.
pub trait ExtraReferences {
    /// Asset locations named by `object`.
    fn extra_references(&self, resource: &Resource, object: &ModelObject) -> Vec<Location>;
}

impl<F> ExtraReferences for F
where
    F: Fn(&Resource, &ModelObject) -> Vec<Location>,
{
    fn extra_references(&self, resource: &Resource, object: &ModelObject) -> Vec<Location> {
        self(resource, object)
    }
}

/// Schedules the icon images of concrete classes.
///
/// Only images whose extension is registered as loadable are scheduled.
pub struct ClassImageReferences<'r> {
    registry: &'r ResourceFactoryRegistry,
}

impl<'r> ClassImageReferences<'r> {
    /// Create an extractor that consults `registry` for loadable extensions.
    pub fn new(registry: &'r ResourceFactoryRegistry) -> Self {
        Self { registry }
    }
}

impl ExtraReferences for ClassImageReferences<'_> {
    fn extra_references(&self, resource: &Resource, object: &ModelObject) -> Vec<Location> {
        if !object.is_class() || object.is_abstract {
            return Vec::new();
        }
        let Some(image) = object
            .annotation(LABEL_PROVIDER_ANNOTATION)
            .and_then(|annotation| annotation.detail(IMAGE_URI_DETAIL))
        else {
            return Vec::new();
        };
        let Ok(location) = resource.location().resolve(image) else {
            trace!(image, "ignoring unresolvable image reference");
            return Vec::new();
        };
        match location.file_extension() {
            Some(extension) if self.registry.is_registered(extension) => vec![location],
            _ => Vec::new(),
        }
    }
}
