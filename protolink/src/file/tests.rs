use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::{error::ErrorKind, Error};

use super::{
    check_shadow, path_to_file_name, ChainFileResolver, File, FileResolver, IncludeFileResolver,
};

struct EmptyFileResolver;

impl FileResolver for EmptyFileResolver {
    fn open_file(&self, name: &str) -> Result<File, Error> {
        Err(Error::file_not_found(name))
    }
}

struct SingleFileResolver(File);

impl FileResolver for SingleFileResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        if self.0.path() == Some(path) {
            Some(self.0.name().to_owned())
        } else {
            None
        }
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        if name == self.0.name() {
            Ok(self.0.clone())
        } else {
            Err(Error::file_not_found(name))
        }
    }
}

struct BrokenFileResolver;

impl FileResolver for BrokenFileResolver {
    fn open_file(&self, _: &str) -> Result<File, Error> {
        Err(Error::new("resolver is broken"))
    }
}

#[test]
fn chain_file_resolver() {
    let source = "syntax = 'proto3';";

    let mut resolver = ChainFileResolver::new();
    assert!(resolver.is_empty());
    resolver.add(EmptyFileResolver);
    resolver.extend([
        SingleFileResolver(File::from_source("foo.proto", source).unwrap()),
        SingleFileResolver(File {
            path: Some(PathBuf::from("./bar.proto")),
            ..File::from_source("bar.proto", source).unwrap()
        }),
    ]);
    assert_eq!(resolver.len(), 3);

    assert_eq!(resolver.resolve_path("./notfound.proto".as_ref()), None);
    assert_eq!(
        resolver.resolve_path("./bar.proto".as_ref()).as_deref(),
        Some("bar.proto")
    );

    assert!(resolver
        .open_file("notfound.proto")
        .unwrap_err()
        .is_file_not_found());
    assert_eq!(resolver.open_file("foo.proto").unwrap().name(), "foo.proto");
    assert_eq!(resolver.open_file("bar.proto").unwrap().name(), "bar.proto");
}

#[test]
fn chain_file_resolver_stops_at_other_errors() {
    let mut resolver = ChainFileResolver::new();
    resolver.add(BrokenFileResolver);
    resolver.add(SingleFileResolver(
        File::from_source("foo.proto", "").unwrap(),
    ));

    let err = resolver.open_file("foo.proto").unwrap_err();
    assert!(!err.is_file_not_found());
    assert_eq!(err.to_string(), "resolver is broken");
}

#[test]
fn chain_of_include_paths() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("first")).unwrap();
    fs::create_dir_all(dir.path().join("second")).unwrap();
    fs::write(dir.path().join("second/foo.proto"), "message Foo {}").unwrap();

    let resolver: ChainFileResolver = ["first", "second"]
        .iter()
        .map(|include| IncludeFileResolver::new(dir.path().join(include)))
        .collect();
    assert_eq!(resolver.len(), 2);

    assert_eq!(
        resolver.resolve_path(&dir.path().join("second/foo.proto")),
        Some("foo.proto".to_owned())
    );
    let file = resolver.open_file("foo.proto").unwrap();
    assert_eq!(file.path(), Some(dir.path().join("second/foo.proto").as_path()));
}

#[test]
fn include_file_resolver() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("pkg")).unwrap();
    fs::write(dir.path().join("pkg/foo.proto"), "message Foo {}").unwrap();
    fs::write(dir.path().join("bad.proto"), [0xff, 0xfe]).unwrap();
    fs::write(dir.path().join("invalid.proto"), "message {").unwrap();

    let resolver = IncludeFileResolver::new(dir.path());
    assert_eq!(resolver.include(), dir.path());

    let file = resolver.open_file("pkg/foo.proto").unwrap();
    assert_eq!(file.name(), "pkg/foo.proto");
    assert_eq!(file.path(), Some(dir.path().join("pkg/foo.proto").as_path()));
    assert_eq!(file.source(), "message Foo {}");

    assert_eq!(
        resolver.resolve_path(&dir.path().join("pkg/foo.proto")),
        Some("pkg/foo.proto".to_owned())
    );
    assert_eq!(resolver.resolve_path("pkg/foo.proto".as_ref()), None);

    assert!(resolver
        .open_file("missing.proto")
        .unwrap_err()
        .is_file_not_found());

    let err = resolver.open_file("bad.proto").unwrap_err();
    assert!(err.is_parse());
    assert_eq!(err.to_string(), "file 'bad.proto' is not valid utf-8");

    let err = resolver.open_file("invalid.proto").unwrap_err();
    assert!(err.is_parse());
    assert_eq!(err.file(), Some("invalid.proto"));

    let err = resolver.open_file("pkg").unwrap_err();
    assert!(err.is_io());
    assert_eq!(err.file(), Some("pkg"));
}

#[test]
fn file_names() {
    assert_eq!(
        path_to_file_name("foo/bar.proto".as_ref()).as_deref(),
        Some("foo/bar.proto")
    );
    assert_eq!(path_to_file_name("./foo/bar.proto".as_ref()), None);
    assert_eq!(path_to_file_name("../bar.proto".as_ref()), None);
    assert_eq!(path_to_file_name("/bar.proto".as_ref()), None);
    assert_eq!(path_to_file_name("".as_ref()), None);
}

#[test]
fn shadowed_paths() {
    assert!(check_shadow("foo.proto", None, "foo.proto".as_ref()).is_ok());
    assert!(check_shadow(
        "foo.proto",
        Some("include/foo.proto".as_ref()),
        "./include/foo.proto".as_ref()
    )
    .is_ok());
    assert!(check_shadow(
        "dir/foo.proto",
        Some("./include/../include/dir/foo.proto".as_ref()),
        "include/../include/dir/foo.proto".as_ref()
    )
    .is_ok());

    // a shared suffix is not enough
    let err = check_shadow(
        "foo.proto",
        Some("include/foo.proto".as_ref()),
        "./foo.proto".as_ref(),
    )
    .unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::FileShadowed { .. }));

    let err = check_shadow(
        "foo.proto",
        Some("first/foo.proto".as_ref()),
        "second/foo.proto".as_ref(),
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "path 'second/foo.proto' is shadowed by 'first/foo.proto' in the include paths"
    );
}
