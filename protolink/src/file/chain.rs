use std::{fmt, path::Path};

use super::{File, FileResolver};
use crate::Error;

/// A [`FileResolver`] which tries several other resolvers in order.
///
/// A file is taken from the first resolver that has it. Any error other than
/// [`Error::file_not_found`] ends the search.
#[derive(Default)]
pub struct ChainFileResolver {
    resolvers: Vec<Box<dyn FileResolver>>,
}

impl ChainFileResolver {
    /// Creates an empty [`ChainFileResolver`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a resolver to the end of the chain.
    pub fn add<F>(&mut self, resolver: F)
    where
        F: FileResolver + 'static,
    {
        self.resolvers.push(Box::new(resolver))
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl<F> Extend<F> for ChainFileResolver
where
    F: FileResolver + 'static,
{
    fn extend<I: IntoIterator<Item = F>>(&mut self, iter: I) {
        for resolver in iter {
            self.add(resolver);
        }
    }
}

impl<F> FromIterator<F> for ChainFileResolver
where
    F: FileResolver + 'static,
{
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut chain = ChainFileResolver::new();
        chain.extend(iter);
        chain
    }
}

impl FileResolver for ChainFileResolver {
    fn resolve_path(&self, path: &Path) -> Option<String> {
        self.resolvers
            .iter()
            .find_map(|resolver| resolver.resolve_path(path))
    }

    fn open_file(&self, name: &str) -> Result<File, Error> {
        self.resolvers
            .iter()
            .map(|resolver| resolver.open_file(name))
            .find(|result| !matches!(result, Err(err) if err.is_file_not_found()))
            .unwrap_or_else(|| Err(Error::file_not_found(name)))
    }
}

impl fmt::Debug for ChainFileResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainFileResolver")
            .field("resolvers", &self.resolvers.len())
            .finish_non_exhaustive()
    }
}
