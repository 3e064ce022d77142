mod common;

use std::io::Cursor;
use std::path::Path;

use assert_matches::assert_matches;
use charm_archive::{
    write::WriteOptions, ArchiveError, EntryKind, PackageArchive, PackageDir, PackageSource,
};
use common::{craft_archive, dummy_dir, Member, DUMMY_MANIFEST};

fn pack(dir: &Path) -> Vec<u8> {
    PackageDir::open(dir)
        .unwrap()
        .archive_to(Cursor::new(Vec::new()), &WriteOptions::default())
        .unwrap()
        .into_inner()
}

fn check_dummy(package: &dyn PackageSource) {
    assert_eq!(package.revision(), 1);
    assert_eq!(package.meta().name, "dummy");
    assert_eq!(package.meta().summary, "That's a dummy charm.");
    assert_eq!(
        package.config().options["title"].description.as_deref(),
        Some("A descriptive title used for the service.")
    );
    assert_eq!(
        package.actions().action_specs["snapshot"].description,
        "Take a snapshot of the database."
    );
    assert!(package.meta().hooks().contains("website-relation-joined"));
}

#[test]
fn test_read_archive() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_path = tmp.path().join("dummy.charm");
    fs_err::write(&archive_path, pack(&dummy_dir(tmp.path()))).unwrap();

    let archive = PackageArchive::open(&archive_path).unwrap();
    check_dummy(&archive);
}

#[test]
fn test_read_archive_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = PackageArchive::from_bytes(pack(&dummy_dir(tmp.path()))).unwrap();
    check_dummy(&archive);
}

#[test]
fn test_read_archive_from_reader() {
    let tmp = tempfile::tempdir().unwrap();
    let bytes = pack(&dummy_dir(tmp.path()));
    let archive = PackageArchive::from_reader(Cursor::new(bytes)).unwrap();
    check_dummy(&archive);
}

#[test]
fn test_open_missing_file() {
    let tmp = tempfile::tempdir().unwrap();
    assert_matches!(
        PackageArchive::open(tmp.path().join("missing.charm")),
        Err(ArchiveError::Io { operation: "open", .. })
    );
}

#[test]
fn test_manifest() {
    let tmp = tempfile::tempdir().unwrap();
    let archive = PackageArchive::from_bytes(pack(&dummy_dir(tmp.path()))).unwrap();
    let manifest = archive.manifest().unwrap();
    assert_eq!(manifest.iter().collect::<Vec<_>>(), DUMMY_MANIFEST);
    assert!(!manifest.contains("revision"));
}

#[test]
fn test_manifest_without_revision() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = dummy_dir(tmp.path());
    fs_err::remove_file(dir.join("revision")).unwrap();

    let archive = PackageArchive::from_bytes(pack(&dir)).unwrap();
    assert_eq!(archive.manifest().unwrap().iter().collect::<Vec<_>>(), DUMMY_MANIFEST);
}

#[cfg(unix)]
#[test]
fn test_manifest_symlink() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = dummy_dir(tmp.path());
    fs_err::os::unix::fs::symlink("../target", dir.join("hooks/symlink")).unwrap();

    let archive = PackageArchive::from_bytes(pack(&dir)).unwrap();
    let manifest = archive.manifest().unwrap();
    assert!(manifest.contains("hooks/symlink"));
    assert_eq!(manifest.len(), DUMMY_MANIFEST.len() + 1);

    let link = archive
        .entries()
        .iter()
        .find(|e| e.name() == "hooks/symlink")
        .unwrap();
    assert_eq!(
        link.kind(),
        &EntryKind::Symlink {
            target: String::from("../target")
        }
    );
}

#[test]
fn test_manifest_of_implicit_directories() {
    let archive = PackageArchive::from_bytes(craft_archive(&[
        Member::File("metadata.yaml", "name: implicit\n", 0o644),
        Member::File("hooks/install", "#!/bin/sh\n", 0o644),
        Member::File("lib/deep/nested/file.py", "", 0o644),
        Member::File("revision", "3", 0o644),
    ]))
    .unwrap();

    assert_eq!(archive.revision(), 3);
    assert_eq!(
        archive.manifest().unwrap().iter().collect::<Vec<_>>(),
        [
            "hooks",
            "hooks/install",
            "lib",
            "lib/deep",
            "lib/deep/nested",
            "lib/deep/nested/file.py",
            "metadata.yaml",
        ]
    );
}

#[test]
fn test_revision_priority() {
    let with_both = craft_archive(&[
        Member::File("metadata.yaml", "name: dummy\nrevision: 99\n", 0o644),
        Member::File("revision", "42\n", 0o644),
    ]);
    assert_eq!(PackageArchive::from_bytes(with_both).unwrap().revision(), 42);

    let metadata_only = craft_archive(&[Member::File(
        "metadata.yaml",
        "name: dummy\nrevision: 99\n",
        0o644,
    )]);
    assert_eq!(PackageArchive::from_bytes(metadata_only).unwrap().revision(), 99);

    let neither = craft_archive(&[Member::File("metadata.yaml", "name: dummy\n", 0o644)]);
    assert_eq!(PackageArchive::from_bytes(neither).unwrap().revision(), 0);
}

#[test]
fn test_garbage_revision() {
    let bytes = craft_archive(&[
        Member::File("metadata.yaml", "name: dummy\n", 0o644),
        Member::File("revision", "garbage", 0o644),
    ]);
    let err = PackageArchive::from_bytes(bytes).unwrap_err();
    assert_matches!(err, ArchiveError::InvalidRevision(_));
    assert_eq!(err.to_string(), "invalid revision file");
}

#[test]
fn test_missing_config_and_actions() {
    let archive = PackageArchive::from_bytes(craft_archive(&[Member::File(
        "metadata.yaml",
        "name: varnish\n",
        0o644,
    )]))
    .unwrap();
    assert!(archive.config().options.is_empty());
    assert!(archive.actions().action_specs.is_empty());
}

#[test]
fn test_set_revision() {
    let tmp = tempfile::tempdir().unwrap();
    let mut archive = PackageArchive::from_bytes(pack(&dummy_dir(tmp.path()))).unwrap();
    assert_eq!(archive.revision(), 1);

    archive.set_revision(42);
    assert_eq!(archive.revision(), 42);

    let destination = tmp.path().join("charm");
    archive.expand_to(&destination).unwrap();
    let dir = PackageDir::open(&destination).unwrap();
    assert_eq!(dir.revision(), 42);
}

#[test]
fn test_duplicate_entries_are_corrupt() {
    let bytes = craft_archive(&[
        Member::File("metadata.yaml", "name: dummy\n", 0o644),
        Member::Dir("hooks/"),
        Member::File("hooks", "not a directory", 0o644),
    ]);
    assert_matches!(
        PackageArchive::from_bytes(bytes),
        Err(ArchiveError::CorruptArchive(_))
    );
}
