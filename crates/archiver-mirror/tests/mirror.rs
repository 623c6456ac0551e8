//! Traversal tests against an in-memory server.

use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::Mutex;

use archiver_fetch::{Attributes, ContentDescription, FetchError, Result, UriHandler};
use archiver_mirror::ResourceMirror;
use archiver_model::{Location, ResourceFactoryRegistry, ResourceKind};

#[derive(Default)]
struct MemoryServer {
    content: HashMap<Location, Vec<u8>>,
    opened: Mutex<Vec<Location>>,
}

impl MemoryServer {
    fn with(mut self, path: &str, body: &str) -> Self {
        self.content.insert(location(path), body.as_bytes().to_vec());
        self
    }

    fn open_count(&self, path: &str) -> usize {
        let target = location(path);
        self.opened
            .lock()
            .unwrap()
            .iter()
            .filter(|opened| **opened == target)
            .count()
    }
}

impl UriHandler for MemoryServer {
    fn can_handle(&self, location: &Location) -> bool {
        location.scheme() == "https"
    }

    fn open(&self, location: &Location) -> Result<Box<dyn Read + Send>> {
        self.opened.lock().unwrap().push(location.clone());
        match self.content.get(location) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(FetchError::Status {
                location: location.clone(),
                status: 404,
            }),
        }
    }

    fn exists(&self, location: &Location) -> Result<bool> {
        Ok(self.content.contains_key(location))
    }

    fn delete(&self, location: &Location) -> Result<()> {
        Err(FetchError::Unsupported {
            operation: "delete",
            location: location.clone(),
        })
    }

    fn attributes(&self, _location: &Location) -> Result<Attributes> {
        Ok(Attributes::default())
    }

    fn set_attributes(&self, _location: &Location, _attributes: &Attributes) -> Result<()> {
        Ok(())
    }

    fn content_description(&self, _location: &Location) -> Result<ContentDescription> {
        Ok(ContentDescription::default())
    }
}

fn location(path: &str) -> Location {
    Location::parse(&format!("https://setups.test/{path}")).unwrap()
}

fn setup(name: &str, references: &[&str]) -> String {
    let children: String = references
        .iter()
        .map(|target| format!(r#"<project href="{target}#/"/>"#))
        .collect();
    format!(r#"<setup:Index xmlns:setup="s" name="{name}">{children}</setup:Index>"#)
}

fn paths(set: &archiver_mirror::MirroredSet) -> Vec<String> {
    set.locations()
        .map(|location| location.segments().join("/"))
        .collect()
}

#[test]
fn test_transitive_closure() {
    let server = MemoryServer::default()
        .with("S.setup", &setup("S", &["A.setup", "B.setup"]))
        .with("A.setup", &setup("A", &["C.setup"]))
        .with("B.setup", &setup("B", &[]))
        .with("C.setup", &setup("C", &[]));
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry).perform([location("S.setup")]);

    assert_eq!(paths(&set), vec!["A.setup", "B.setup", "C.setup", "S.setup"]);
    assert_eq!(set.failures().count(), 0);
}

#[test]
fn test_cycle_terminates_and_loads_once() {
    let server = MemoryServer::default()
        .with("S.setup", &setup("S", &["A.setup"]))
        .with("A.setup", &setup("A", &["S.setup", "A.setup"]));
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry).perform([location("S.setup")]);

    assert_eq!(set.len(), 2);
    assert_eq!(server.open_count("S.setup"), 1);
    assert_eq!(server.open_count("A.setup"), 1);
}

#[test]
fn test_duplicate_seeds_are_deduplicated() {
    let server = MemoryServer::default().with("S.setup", &setup("S", &[]));
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry).perform([
        location("S.setup"),
        location("./S.setup"),
        Location::parse("https://setups.test/S.setup#//fragment").unwrap(),
    ]);

    assert_eq!(set.len(), 1);
    assert_eq!(server.open_count("S.setup"), 1);
}

#[test]
fn test_failed_resources_are_kept_and_flagged() {
    let server = MemoryServer::default()
        .with("S.setup", &setup("S", &["missing.setup", "broken.setup"]))
        .with("broken.setup", "<setup:Index xmlns:setup=\"s\"><unclosed>");
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry).perform([location("S.setup")]);

    assert_eq!(set.len(), 3);
    let failed: Vec<String> = set
        .failures()
        .map(|resource| resource.location().segments().join("/"))
        .collect();
    assert_eq!(failed, vec!["broken.setup", "missing.setup"]);

    let missing = set.get(&location("missing.setup")).unwrap();
    assert!(missing.bytes().is_empty());
    assert!(missing.errors()[0].message.contains("404"));
}

#[test]
fn test_class_images_are_loaded_but_not_traversed() {
    let ecore = r#"<ecore:EPackage xmlns:ecore="e" xmlns:xsi="x" name="p">
  <eClassifiers xsi:type="ecore:EClass" name="Project">
    <eAnnotations source="http://www.eclipse.org/oomph/base/LabelProvider">
      <details key="imageURI" value="icons/Project.gif"/>
    </eAnnotations>
  </eClassifiers>
</ecore:EPackage>"#;
    let server = MemoryServer::default()
        .with("model/Setup.ecore", ecore)
        .with("model/icons/Project.gif", "GIF89a #not-a-reference.setup#/");
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry)
        .with_class_images()
        .perform([location("model/Setup.ecore")]);

    assert_eq!(set.len(), 2);
    let image = set.get(&location("model/icons/Project.gif")).unwrap();
    assert_eq!(image.kind(), ResourceKind::Binary);
    assert!(image.is_loaded_cleanly());
}

#[test]
fn test_images_ignored_without_extractor() {
    let ecore = r#"<ecore:EPackage xmlns:ecore="e" xmlns:xsi="x" name="p">
  <eClassifiers xsi:type="ecore:EClass" name="Project">
    <eAnnotations source="http://www.eclipse.org/oomph/base/LabelProvider">
      <details key="imageURI" value="Project.gif"/>
    </eAnnotations>
  </eClassifiers>
</ecore:EPackage>"#;
    let server = MemoryServer::default().with("Setup.ecore", ecore);
    let registry = ResourceFactoryRegistry::default();

    let set = ResourceMirror::new(&server, &registry).perform([location("Setup.ecore")]);

    assert_eq!(set.len(), 1);
    assert_eq!(server.open_count("Project.gif"), 0);
}

#[test]
fn test_resolve_all_reports_unresolved_proxies() {
    let server = MemoryServer::default()
        .with(
            "S.setup",
            r#"<setup:Index xmlns:setup="s" name="S">
  <project href="A.setup#//Known"/>
  <project href="A.setup#//Unknown"/>
  <project href="A.setup#a-id"/>
</setup:Index>"#,
        )
        .with(
            "A.setup",
            r#"<setup:Project xmlns:setup="s" name="A"><stream name="Known"/><stream xmi:id="a-id"/></setup:Project>"#,
        );
    let registry = ResourceFactoryRegistry::default();
    let mirror = ResourceMirror::new(&server, &registry);

    let mut set = mirror.perform([location("S.setup")]);
    let unresolved = mirror.resolve_all(&mut set);

    assert_eq!(unresolved, 1);
    let seed = set.get(&location("S.setup")).unwrap();
    assert_eq!(seed.warnings().len(), 1);
    assert!(seed.warnings()[0].message.contains("//Unknown"));
    assert!(seed.is_loaded_cleanly());
}

#[test]
fn test_resolve_all_demand_loads_missing_targets() {
    let server = MemoryServer::default()
        .with("S.setup", &setup("S", &[]))
        .with("late.setup", &setup("late", &["later.setup"]))
        .with("later.setup", &setup("later", &[]));
    let registry = ResourceFactoryRegistry::default();
    let mirror = ResourceMirror::new(&server, &registry);

    // Simulate a reference that only became visible after traversal.
    let mut set = mirror.perform([location("S.setup")]);
    let late = archiver_model::Resource::parse(
        location("extra.setup"),
        ResourceKind::Model,
        setup("extra", &["late.setup"]).into_bytes(),
    );
    set.insert(late);

    let unresolved = mirror.resolve_all(&mut set);

    assert_eq!(unresolved, 0);
    assert!(set.contains(&location("late.setup")));
    assert!(set.contains(&location("later.setup")));
}

#[test]
fn test_declared_namespaces_are_not_fetched() {
    let server = MemoryServer::default().with(
        "Model.ecore",
        r#"<ecore:EPackage xmlns:ecore="http://www.eclipse.org/emf/2002/Ecore" name="m">
  <eClassifiers name="Named">
    <eStructuralFeatures name="label" eType="ecore:EDataType http://www.eclipse.org/emf/2002/Ecore#//EString"/>
  </eClassifiers>
</ecore:EPackage>"#,
    );
    let registry = ResourceFactoryRegistry::new(ResourceKind::Model);
    let mirror = ResourceMirror::new(&server, &registry);

    let mut set = mirror.perform([location("Model.ecore")]);
    let unresolved = mirror.resolve_all(&mut set);

    assert_eq!(set.len(), 1);
    assert_eq!(set.failures().count(), 0);
    assert_eq!(unresolved, 0);
    assert!(set.get(&location("Model.ecore")).unwrap().warnings().is_empty());
}

#[test]
fn test_registered_packages_are_not_fetched() {
    let server = MemoryServer::default()
        .with(
            "S.setup",
            r#"<setup:Index xmlns:setup="s" name="S">
  <project href="A.setup#/"/>
  <annotation kind="https://setups.test/Setup/1.0#//Annotation"/>
</setup:Index>"#,
        )
        .with("A.setup", &setup("A", &[]));
    let mut registry = ResourceFactoryRegistry::default();
    registry.register_package(location("Setup/1.0"));
    let mirror = ResourceMirror::new(&server, &registry);

    let mut set = mirror.perform([location("S.setup")]);
    let unresolved = mirror.resolve_all(&mut set);

    assert_eq!(paths(&set), vec!["A.setup", "S.setup"]);
    assert_eq!(server.open_count("Setup/1.0"), 0);
    assert_eq!(set.failures().count(), 0);
    assert_eq!(unresolved, 0);
}
