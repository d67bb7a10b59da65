use std::path::{Component, Path, PathBuf};

use crate::{error::ErrorKind, Error};

use super::{File, FileResolver};

/// A [`FileResolver`] which searches one include directory on the file system.
#[derive(Debug, Clone)]
pub struct IncludeFileResolver {
    include: PathBuf,
}

impl IncludeFileResolver {
    /// Creates a resolver for files under `include`.
    pub fn new(include: impl Into<PathBuf>) -> Self {
        IncludeFileResolver {
            include: include.into(),
        }
    }

    /// The include directory.
    pub fn include(&self) -> &Path {
        &self.include
    }
}

impl FileResolver for IncludeFileResolver {
    /// Converts a path under the include directory to an import name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::path::Path;
    /// # use protolink::file::{IncludeFileResolver, FileResolver};
    /// let resolver = IncludeFileResolver::new("/path/to/include");
    /// assert_eq!(resolver.resolve_path(Path::new("/path/to/include/dir/foo.proto")), Some("dir/foo.proto".to_owned()));
    /// assert_eq!(resolver.resolve_path(Path::new("notincluded.proto")), None);
    /// ```
    fn resolve_path(&self, path: &Path) -> Option<String> {
        path_to_file_name(&strip_prefix(path, &self.include)?)
    }

    /// Opens the file `name` relative to the include directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::file_not_found()`] if the include directory has no such file.
    fn open_file(&self, name: &str) -> Result<File, Error> {
        File::open(name, &self.include.join(name))
    }
}

/// Converts a relative path to an import name, joining its components with `/`.
///
/// Returns `None` unless every component is a plain UTF-8 name.
pub(crate) fn path_to_file_name(path: &Path) -> Option<String> {
    let parts = path
        .components()
        .map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Option<Vec<&str>>>()?;

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Fails if the file opened for `name` is not the one at `requested`.
///
/// `opened` is the path of the file the resolvers returned for `name`. When an earlier include
/// directory also has a file called `name`, it is opened instead of `requested`.
pub(crate) fn check_shadow(
    name: &str,
    opened: Option<&Path>,
    requested: &Path,
) -> Result<(), Error> {
    match opened {
        Some(opened) if !same_path(opened, requested) => {
            Err(Error::from_kind(ErrorKind::FileShadowed {
                name: name.to_owned(),
                path: requested.to_owned(),
                shadow: opened.to_owned(),
            }))
        }
        _ => Ok(()),
    }
}

/// The components of `path`, without `.`.
fn components(path: &Path) -> impl Iterator<Item = Component<'_>> + Clone {
    path.components()
        .filter(|component| *component != Component::CurDir)
}

fn strip_prefix(path: &Path, prefix: &Path) -> Option<PathBuf> {
    let mut rest = components(path);
    for expected in components(prefix) {
        match rest.next() {
            Some(component) if component_eq(component, expected) => {}
            _ => return None,
        }
    }
    Some(rest.collect())
}

fn same_path(left: &Path, right: &Path) -> bool {
    let mut left = components(left);
    let mut right = components(right);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(l), Some(r)) if component_eq(l, r) => continue,
            _ => return false,
        }
    }
}

/// Paths are case-insensitive on windows.
#[cfg(windows)]
fn component_eq(left: Component, right: Component) -> bool {
    left.as_os_str().eq_ignore_ascii_case(right.as_os_str())
}

#[cfg(not(windows))]
fn component_eq(left: Component, right: Component) -> bool {
    left == right
}
