use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use glimpse_core::{
    ArchiveError, ArchiveSession, Extension, HandlerConfig, PreviewContent, TypeKey, ValidationError,
};
use glimpse_handlers::{TarHandler, ZipHandler, builtin_catalog};
use glimpse_registry::{DebugObjectHandler, HandlerRegistry};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

fn make_zip(dir: &Path) -> PathBuf {
    let path = dir.join("bundle.zip");
    let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
    zip.add_directory("docs/", SimpleFileOptions::default()).unwrap();
    zip.start_file("docs/readme.txt", SimpleFileOptions::default()).unwrap();
    zip.write_all(b"hello from zip\n").unwrap();
    zip.start_file("data.json", SimpleFileOptions::default()).unwrap();
    zip.write_all(br#"{"a": 1}"#).unwrap();
    zip.finish().unwrap();
    path
}

fn make_tgz(dir: &Path) -> PathBuf {
    let path = dir.join("bundle.tgz");
    let encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, data) in [("notes/a.txt", &b"first"[..]), ("b.log", &b"second line"[..])] {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
    path
}

#[test]
fn test_builtin_discovery_order() {
    let registry = HandlerRegistry::new(builtin_catalog());
    let ids: Vec<String> = registry
        .files()
        .resolve(&Extension::new("json"))
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(ids, vec!["json-tree", "plain-text", "hex", "file-info"]);

    let ids = registry.files().resolve(&Extension::new("png"));
    assert_eq!(ids.len(), 2);

    let archives = registry.archives().resolve(&Extension::new("jar"));
    assert_eq!(archives.len(), 1);
    assert_eq!(archives[0], "zip");
}

#[test]
fn test_builtin_object_handlers() {
    let registry = HandlerRegistry::new(builtin_catalog());
    let objects = registry.objects();

    let for_value = objects.resolve_for_type(TypeKey::of::<serde_json::Value>());
    assert_eq!(for_value[0], "json-value");
    assert_eq!(for_value[for_value.len() - 1], DebugObjectHandler::ID);

    let for_string = objects.resolve_for_type(TypeKey::of::<String>());
    assert_eq!(for_string[0], "text-object");

    let for_other = objects.resolve_for_type(TypeKey::of::<Vec<u8>>());
    assert_eq!(for_other.len(), 1);
}

#[test]
fn test_instantiate_with_options() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.bin");
    std::fs::write(&path, [0xffu8; 40]).unwrap();

    let registry = HandlerRegistry::new(builtin_catalog());
    let config = HandlerConfig::parse("hex -bytes-per-line 8 -max-bytes 16").unwrap();
    let handler = registry.files().instantiate(&config).unwrap();
    let preview = handler.create(&path).unwrap();

    match preview.content() {
        PreviewContent::Hex { lines, total_bytes } => {
            assert_eq!(*total_bytes, 40);
            assert_eq!(lines.len(), 2);
        }
        other => panic!("unexpected content {other:?}"),
    }
}

#[test]
fn test_zip_listing_and_extraction() {
    let dir = TempDir::new().unwrap();
    let archive = make_zip(dir.path());
    let session = ArchiveSession::new(Box::new(ZipHandler), &archive);

    let entries = session.list_files().unwrap();
    assert_eq!(entries, vec!["docs/readme.txt", "data.json"]);

    let dest = dir.path().join("out").join("readme.txt");
    assert!(session.extract("docs/readme.txt", &dest).unwrap());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "hello from zip\n");

    let missing = session.extract("nope.txt", &dest).unwrap_err();
    assert!(matches!(missing, ArchiveError::EntryNotFound { .. }));
}

#[test]
fn test_tar_gz_listing_and_extraction() {
    let dir = TempDir::new().unwrap();
    let archive = make_tgz(dir.path());
    let session = ArchiveSession::new(Box::new(TarHandler), &archive);

    assert_eq!(session.list_files().unwrap(), vec!["notes/a.txt", "b.log"]);

    let dest = dir.path().join("b.log");
    assert!(session.extract("b.log", &dest).unwrap());
    assert_eq!(std::fs::read_to_string(&dest).unwrap(), "second line");
}

#[test]
fn test_archive_directory_fails_validation_first() {
    let dir = TempDir::new().unwrap();
    let session = ArchiveSession::new(Box::new(ZipHandler), dir.path());

    let err = session.list_files().unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Validation(ValidationError::IsDirectory { .. })
    ));
    let err = session.extract("x", &dir.path().join("x")).unwrap_err();
    assert!(matches!(err, ArchiveError::Validation(_)));
}

#[test]
fn test_corrupt_archive_is_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.zip");
    std::fs::write(&path, b"not a zip").unwrap();

    let session = ArchiveSession::new(Box::new(ZipHandler), &path);
    assert!(matches!(session.list_files(), Err(ArchiveError::Format { .. })));
}
