//! Reconciliation and finalize scenarios on real zip files.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use archiver_model::{Diagnostic, Location, Resource, ResourceKind};
use archiver_store::{
    ArchiveWorkspace, EntryArchive, FailureKind, PendingEntries, Reconciler, ReplaceStrategy,
    RunOutcome, entry_name,
};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

fn location(path: &str) -> Location {
    Location::parse(&format!("https://setups.test/{path}")).unwrap()
}

fn model(path: &str, body: &str) -> Resource {
    let xml = format!(r#"<setup:Project xmlns:setup="s" name="{body}"/>"#);
    Resource::parse(location(path), ResourceKind::Model, xml.into_bytes())
}

fn broken(path: &str) -> Resource {
    Resource::parse(
        location(path),
        ResourceKind::Model,
        b"<setup:Project xmlns:setup=\"s\"><oops>".to_vec(),
    )
}

/// Build an archive at `target` holding `resources` plus a stale entry.
fn seed_archive(target: &Path, resources: &mut [Resource]) {
    let mut archive = EntryArchive::open(target).unwrap();
    let mut pending = PendingEntries::new();
    Reconciler::default().reconcile(resources.iter_mut(), &mut archive, &mut pending);
    archive
        .save_if_changed("https/setups.test/X.setup", b"stale")
        .unwrap();
    archive.commit().unwrap();
}

fn entries(path: &Path) -> Vec<String> {
    EntryArchive::open(path).unwrap().entry_names()
}

#[test]
fn test_stale_entry_is_deleted_and_archive_updated() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    seed_archive(&target, &mut [model("S.setup", "old")]);
    let prior = fs::read(&target).unwrap();

    let mut workspace = ArchiveWorkspace::prepare(&target).unwrap();
    let mut archive = workspace.open_archive().unwrap();
    let mut resources = vec![
        model("S.setup", "S"),
        model("A.setup", "A"),
        model("B.setup", "B"),
        model("C.setup", "C"),
    ];
    let summary =
        Reconciler::default().reconcile(resources.iter_mut(), &mut archive, workspace.pending_mut());

    assert!(!summary.has_failures());
    assert_eq!(summary.saved.len(), 4);
    assert_eq!(summary.deleted, vec!["https/setups.test/X.setup".to_string()]);
    assert!(resources.iter().all(|resource| resource.time_stamp().is_some()));

    let committed = archive.commit().unwrap();
    drop(archive);
    let outcome = workspace.finalize(committed, ReplaceStrategy::RenameOver);

    assert_eq!(outcome, RunOutcome::Updated);
    assert_eq!(
        entries(&target),
        vec![
            "https/setups.test/A.setup",
            "https/setups.test/B.setup",
            "https/setups.test/C.setup",
            "https/setups.test/S.setup",
        ]
    );
    assert_eq!(fs::read(dir.path().join("setups.zip.bak")).unwrap(), prior);
    assert!(!dir.path().join("setups.zip.tmp").exists());
}

#[test]
fn test_failures_suppress_deletion() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    seed_archive(&target, &mut [model("A.setup", "A")]);

    let mut workspace = ArchiveWorkspace::prepare(&target).unwrap();
    let mut archive = workspace.open_archive().unwrap();
    let mut resources = vec![model("S.setup", "S"), broken("A.setup"), model("B.setup", "B")];
    let summary =
        Reconciler::default().reconcile(resources.iter_mut(), &mut archive, workspace.pending_mut());

    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].kind, FailureKind::Load);
    assert_eq!(summary.failures[0].location, location("A.setup"));
    assert!(summary.deleted.is_empty());
    assert_eq!(summary.retained, vec!["https/setups.test/X.setup".to_string()]);

    let committed = archive.commit().unwrap();
    drop(archive);
    assert_eq!(
        workspace.finalize(committed, ReplaceStrategy::RenameOver),
        RunOutcome::Updated
    );

    let mut archive = EntryArchive::open(&target).unwrap();
    assert!(archive.contains("https/setups.test/X.setup"));
    assert!(archive.contains("https/setups.test/S.setup"));
    assert!(archive.contains("https/setups.test/B.setup"));
    // The previously stored A is kept as it was.
    let stored_a = archive.read("https/setups.test/A.setup").unwrap().unwrap();
    assert_eq!(stored_a, model("A.setup", "A").bytes());
}

#[test]
fn test_failed_schema_aborts_everything() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    seed_archive(&target, &mut [model("S.setup", "S")]);
    let before = fs::read(&target).unwrap();

    let mut workspace = ArchiveWorkspace::prepare(&target).unwrap();
    let mut archive = workspace.open_archive().unwrap();
    let mut resources = vec![
        model("S.setup", "changed"),
        Resource::failed(
            location("models/Setup.ecore"),
            ResourceKind::Model,
            Diagnostic::new("the server is delivering inconsistent results"),
        ),
    ];
    let summary =
        Reconciler::default().reconcile(resources.iter_mut(), &mut archive, workspace.pending_mut());

    assert_eq!(summary.aborted, Some(location("models/Setup.ecore")));
    assert!(summary.saved.is_empty());
    assert!(summary.deleted.is_empty());
    assert!(!archive.is_dirty());

    let committed = archive.commit().unwrap();
    drop(archive);
    assert_eq!(
        workspace.finalize(committed, ReplaceStrategy::RenameOver),
        RunOutcome::Unchanged
    );
    assert_eq!(fs::read(&target).unwrap(), before);
}

#[test]
fn test_ignored_locations_are_not_saved() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    let mut archive = EntryArchive::open(&target).unwrap();
    let mut pending = PendingEntries::new();

    let query = Location::parse("https://setups.test/S.setup?version=2").unwrap();
    let local = Location::parse("file:///tmp/local.setup").unwrap();
    let xml = br#"<setup:Project xmlns:setup="s" name="x"/>"#.to_vec();
    let mut resources = vec![
        Resource::parse(query.clone(), ResourceKind::Model, xml.clone()),
        Resource::parse(local.clone(), ResourceKind::Model, xml),
    ];
    let summary = Reconciler::default().reconcile(resources.iter_mut(), &mut archive, &mut pending);

    assert_eq!(summary.ignored, vec![query, local]);
    assert!(!archive.is_dirty());
}

#[test]
fn test_identical_content_is_not_rewritten() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    let mut resources = vec![model("S.setup", "S")];
    {
        let mut archive = EntryArchive::open(&target).unwrap();
        Reconciler::default().reconcile(resources.iter_mut(), &mut archive, &mut PendingEntries::new());
        archive.commit().unwrap();
    }
    let before = fs::read(&target).unwrap();

    let mut workspace = ArchiveWorkspace::prepare(&target).unwrap();
    let mut archive = workspace.open_archive().unwrap();
    let mut again = vec![model("S.setup", "S")];
    let summary =
        Reconciler::default().reconcile(again.iter_mut(), &mut archive, workspace.pending_mut());

    assert_eq!(summary.unchanged, vec![location("S.setup")]);
    assert!(summary.saved.is_empty());
    assert!(again[0].time_stamp().is_none());

    let committed = archive.commit().unwrap();
    drop(archive);
    assert_eq!(
        workspace.finalize(committed, ReplaceStrategy::RenameOver),
        RunOutcome::Unchanged
    );
    assert_eq!(fs::read(&target).unwrap(), before);
    assert!(!dir.path().join("setups.zip.bak").exists());
}

#[test]
fn test_entry_names_follow_locations() {
    assert_eq!(
        entry_name(&location("nested/dir/S.setup")),
        "https/setups.test/nested/dir/S.setup"
    );
}

#[test]
fn test_unreadable_entry_is_a_save_failure() {
    const OLD: &[u8] = b"<setup:Project xmlns:setup=\"s\" name=\"old\"/>";
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("setups.zip");
    let mut writer = ZipWriter::new(File::create(&target).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    writer.start_file("https/setups.test/S.setup", options).unwrap();
    writer.write_all(OLD).unwrap();
    writer.start_file("https/setups.test/X.setup", options).unwrap();
    writer.write_all(b"stale").unwrap();
    writer.finish().unwrap();

    // Damage the stored bytes of S so reading the entry fails its CRC check.
    let mut bytes = fs::read(&target).unwrap();
    let start = bytes.windows(OLD.len()).position(|window| window == OLD).unwrap();
    bytes[start + 5] ^= 0xff;
    fs::write(&target, bytes).unwrap();

    let mut workspace = ArchiveWorkspace::prepare(&target).unwrap();
    let mut archive = workspace.open_archive().unwrap();
    let mut resources = vec![model("S.setup", "new")];
    let summary =
        Reconciler::default().reconcile(resources.iter_mut(), &mut archive, workspace.pending_mut());

    assert!(summary.has_failures());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].location, location("S.setup"));
    assert_eq!(summary.failures[0].kind, FailureKind::Save);
    assert!(!summary.failures[0].messages.is_empty());
    assert!(summary.saved.is_empty());
    assert!(summary.deleted.is_empty());
    assert_eq!(summary.retained, vec!["https/setups.test/X.setup".to_string()]);
    assert!(resources[0].time_stamp().is_none());
}
