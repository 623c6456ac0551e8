//! Transitive closure traversal.

use std::collections::{BTreeSet, HashSet, VecDeque};

use archiver_fetch::{UriHandler, read_all};
use archiver_model::{
    Diagnostic, Location, Reference, Resource, ResourceFactoryRegistry, ResourceKind,
};
use tracing::{debug, info, info_span, warn};

use crate::extract::{ClassImageReferences, ExtraReferences};
use crate::set::MirroredSet;

struct Scheduled {
    location: Location,
    asset_only: bool,
}

/// Loads seed locations and everything they reference.
///
/// Traversal is breadth first, but only the final set of visited locations
/// is meaningful. Each location is loaded at most once per
/// [`perform`](Self::perform); failures are kept in the result so that
/// later stages can see them. References into package namespaces, whether
/// declared by the referencing document or registered as built in, are
/// never fetched.
pub struct ResourceMirror<'a> {
    handler: &'a dyn UriHandler,
    registry: &'a ResourceFactoryRegistry,
    extractors: Vec<Box<dyn ExtraReferences + 'a>>,
}

impl<'a> ResourceMirror<'a> {
    /// Create a mirror that reads through `handler`.
    pub fn new(handler: &'a dyn UriHandler, registry: &'a ResourceFactoryRegistry) -> Self {
        Self {
            handler,
            registry,
            extractors: Vec::new(),
        }
    }

    /// Add an extra-reference strategy.
    #[must_use]
    pub fn with_extractor(mut self, extractor: impl ExtraReferences + 'a) -> Self {
        self.extractors.push(Box::new(extractor));
        self
    }

    /// Add the class icon strategy.
    #[must_use]
    pub fn with_class_images(self) -> Self {
        let registry = self.registry;
        self.with_extractor(ClassImageReferences::new(registry))
    }

    /// Load the closure of `seeds`.
    pub fn perform(&self, seeds: impl IntoIterator<Item = Location>) -> MirroredSet {
        let span = info_span!("mirror");
        let _guard = span.enter();

        let mut queue: VecDeque<Scheduled> = seeds
            .into_iter()
            .map(|location| Scheduled {
                location,
                asset_only: false,
            })
            .collect();
        let mut visited: HashSet<Location> = HashSet::new();
        let mut set = MirroredSet::new();

        while let Some(next) = queue.pop_front() {
            if !visited.insert(next.location.clone()) {
                continue;
            }
            let resource = self.load(&next.location);
            if !next.asset_only {
                self.schedule_references(&resource, &mut queue);
            }
            set.insert(resource);
        }

        info!(
            resources = set.len(),
            failures = set.failures().count(),
            "traversal complete"
        );
        set
    }

    /// Demand-load every referenced resource that is still missing and check
    /// that fragment references resolve.
    ///
    /// Unresolved proxies are recorded as warnings on the referencing
    /// resource. Returns the number of unresolved proxies.
    pub fn resolve_all(&self, set: &mut MirroredSet) -> usize {
        let span = info_span!("resolve");
        let _guard = span.enter();

        loop {
            let missing: BTreeSet<Location> = set
                .iter()
                .filter(|resource| resource.kind() == ResourceKind::Model)
                .flat_map(|resource| self.document_references(resource))
                .map(|reference| reference.target.clone())
                .filter(|target| !set.contains(target))
                .collect();
            if missing.is_empty() {
                break;
            }
            for location in missing {
                debug!(%location, "demand loading");
                set.insert(self.load(&location));
            }
        }

        let mut unresolved = Vec::new();
        for resource in set.iter() {
            for reference in self.document_references(resource) {
                let Some(fragment) = reference.fragment.as_deref() else {
                    continue;
                };
                let resolved = set.get(&reference.target).is_some_and(|target| {
                    target.kind() == ResourceKind::Model
                        && target.resolve_fragment(fragment).is_some()
                });
                if !resolved {
                    unresolved.push((
                        resource.location().clone(),
                        format!("unresolved proxy {}#{fragment}", reference.target),
                    ));
                }
            }
        }

        let count = unresolved.len();
        for (location, message) in unresolved {
            warn!(%location, "{message}");
            if let Some(resource) = set.get_mut(&location) {
                resource.add_warning(Diagnostic::new(message));
            }
        }
        count
    }

    /// References that address fetchable documents.
    fn document_references<'r>(
        &self,
        resource: &'r Resource,
    ) -> impl Iterator<Item = &'r Reference> + use<'r, 'a> {
        let registry = self.registry;
        resource.references().filter(move |reference| {
            !resource.declares_namespace(&reference.target)
                && !registry.is_package_namespace(&reference.target)
        })
    }

    fn load(&self, location: &Location) -> Resource {
        match read_all(self.handler, location) {
            Ok(bytes) => {
                let resource = self.registry.create(location.clone(), bytes);
                if resource.errors().is_empty() {
                    debug!(
                        %location,
                        kind = resource.kind().label(),
                        objects = resource.objects().len(),
                        "loaded"
                    );
                } else {
                    warn!(%location, errors = resource.errors().len(), "loaded with errors");
                }
                resource
            }
            Err(error) => {
                warn!(
                    %location,
                    %error,
                    transient = error.is_transient(),
                    hint = error.user_message(),
                    "load failed"
                );
                let kind = self.registry.kind_for(location);
                Resource::failed(location.clone(), kind, Diagnostic::new(error.to_string()))
            }
        }
    }

    fn schedule_references(&self, resource: &Resource, queue: &mut VecDeque<Scheduled>) {
        for reference in self.document_references(resource) {
            queue.push_back(Scheduled {
                location: reference.target.clone(),
                asset_only: false,
            });
        }
        for object in resource.objects() {
            for extractor in &self.extractors {
                for location in extractor.extra_references(resource, object) {
                    queue.push_back(Scheduled {
                        location,
                        asset_only: true,
                    });
                }
            }
        }
    }
}
